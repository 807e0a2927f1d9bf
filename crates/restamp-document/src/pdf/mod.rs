// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — reading, glyph extraction, in-place rewriting, and creating PDFs.

pub mod cmap;
pub mod extract;
pub mod fonts;
pub mod metrics;
pub mod reader;
pub mod rewrite;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;

pub use reader::PdfReader;
pub use writer::PdfWriter;

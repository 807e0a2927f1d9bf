// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// restamp-document — layout-preserving text replacement for PDF documents.
//
// Extracts positioned glyph runs, groups them into visual lines, maps
// replacement text onto those lines, and paints the new text over the old in
// the original fonts. Documents without extractable text get a freshly
// paginated PDF instead.

pub mod engine;
pub mod geometry;
pub mod layout;
pub mod pdf;
pub mod sanitize;

// Re-export the primary types so callers can use `restamp_document::RewriteEngine` etc.
pub use engine::{RewriteEngine, RewriteOutput};
pub use layout::lines::VisualLine;
pub use pdf::reader::PdfReader;
pub use pdf::writer::PdfWriter;

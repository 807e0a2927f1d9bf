// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// restamp-history — a local record of every document Restamp produced.
//
// Each rewrite or report is logged with who asked for it, the job description
// it targeted, and SHA-256 fingerprints of the input and output documents.

pub mod history;
pub mod integrity;

pub use history::{NewRecord, ProcessHistory, ProcessRecord};
pub use integrity::hash_bytes;

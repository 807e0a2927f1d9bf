// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text generation seam.
//
// Restamp never talks to a language model itself. A generator turns a prompt
// into a response; the CLI's generator reads a response that was produced
// elsewhere, either from a file or from stdin.

use std::io::Read;
use std::path::PathBuf;

use restamp_core::error::{RestampError, Result};
use tracing::{debug, instrument};

/// Produces the text that answers a prompt.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Reads a prepared response from a file, or from stdin when no file is set.
#[derive(Debug, Clone, Default)]
pub struct ResponseReader {
    path: Option<PathBuf>,
}

impl ResponseReader {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn stdin() -> Self {
        Self { path: None }
    }
}

impl TextGenerator for ResponseReader {
    #[instrument(skip_all, fields(prompt_len = prompt.len()))]
    fn generate(&self, prompt: &str) -> Result<String> {
        let response = match &self.path {
            Some(path) => std::fs::read_to_string(path)?,
            None => {
                // The prompt goes to stderr so stdout stays free for piping.
                eprintln!("{prompt}\n\n--- paste the response, then end input (Ctrl-D) ---");
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            }
        };
        check_response(response)
    }
}

/// Reject empty responses. Non-empty responses pass through untouched.
pub fn check_response(response: String) -> Result<String> {
    if response.trim().is_empty() {
        return Err(RestampError::Generation("empty response".into()));
    }
    debug!(response_len = response.len(), "response received");
    Ok(response)
}

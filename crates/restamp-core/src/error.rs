// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Restamp.

use thiserror::Error;

/// Top-level error type for all Restamp operations.
#[derive(Debug, Error)]
pub enum RestampError {
    // -- Document errors --
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("corrupt document: {0}")]
    CorruptInput(String),

    #[error("rendering failed: {0}")]
    RenderFailure(String),

    /// Raised while encoding text for a font. Recovered inside the engine by
    /// dropping or substituting the character; never returned to callers.
    #[error("font {font} cannot render {character:?}")]
    UnrenderableCharacter { font: String, character: char },

    // -- Collaborators --
    #[error("text generation failed: {0}")]
    Generation(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RestampError>;

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for people uploading their documents.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity drives how a front end presents the failure.

use crate::error::RestampError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Quota, timeout, busy disk: trying again later may work.
    Transient,
    /// The user has to supply something different.
    ActionRequired,
    /// Cannot be fixed by retrying.
    Permanent,
}

/// A human-readable error with a plain English message and a suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether trying again unchanged can succeed.
    pub retriable: bool,
    /// Severity level.
    pub severity: Severity,
}

/// Convert a `RestampError` into a `HumanError`.
pub fn humanize_error(err: &RestampError) -> HumanError {
    match err {
        RestampError::UnsupportedFormat(_) => HumanError {
            message: "Only PDF files are supported.".into(),
            suggestion: "Export or print your document to PDF, then upload the PDF.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        RestampError::CorruptInput(_) => HumanError {
            message: "Failed to read PDF content.".into(),
            suggestion: "The file looks damaged. Try re-saving it from the original program."
                .into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        RestampError::RenderFailure(_) | RestampError::UnrenderableCharacter { .. } => {
            HumanError {
                message: "Failed to generate PDF with preserved layout.".into(),
                suggestion: "Try again. If it keeps failing, download your original file.".into(),
                retriable: true,
                severity: Severity::Transient,
            }
        }

        RestampError::Generation(detail) => humanize_generation_error(detail),

        RestampError::Database(_) => HumanError {
            message: "We couldn't save your processing history.".into(),
            suggestion: "Your document was still processed. History will resume once storage is available.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        RestampError::Io(io) => HumanError {
            message: "A file could not be read or written.".into(),
            suggestion: format!("Check the file path and permissions. ({io})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        RestampError::Serialization(_) => HumanError {
            message: "The settings file could not be understood.".into(),
            suggestion: "Fix or delete config.json; defaults will be used.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

/// Text-generation failures: quota exhaustion gets its own wording.
fn humanize_generation_error(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();
    if lower.contains("quota") || lower.contains("429") || lower.contains("rate limit") {
        HumanError {
            message: "We are currently out of quota.".into(),
            suggestion: "You can download your original CV or try again later.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else {
        HumanError {
            message: "The rewrite service did not answer.".into(),
            suggestion: "Try again in a moment.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_needs_action() {
        let human = humanize_error(&RestampError::UnsupportedFormat("text/plain".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
        assert!(human.message.contains("Only PDF files"));
    }

    #[test]
    fn quota_error_is_transient() {
        let err = RestampError::Generation("HTTP 429: insufficient_quota".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.message.contains("out of quota"));
    }

    #[test]
    fn render_failure_is_retriable() {
        let human = humanize_error(&RestampError::RenderFailure("disk full".into()));
        assert!(human.retriable);
        assert!(human.message.contains("preserved layout"));
    }
}

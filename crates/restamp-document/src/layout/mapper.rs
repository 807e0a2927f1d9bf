// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text mapping — pair each visual line with one line of replacement text.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use super::lines::VisualLine;

/// A visual line and the text that replaces it.
#[derive(Debug, Clone)]
pub struct LineRewrite {
    pub line: VisualLine,
    pub text: String,
}

/// Rewrites grouped by page index, in visual order within each page.
pub type RewritePlan = BTreeMap<usize, Vec<LineRewrite>>;

/// Assign replacement lines to visual lines in order.
///
/// Visual lines beyond the replacement get empty text (they are still
/// erased). Replacement lines beyond the visual lines are appended to the
/// last rewrite, each preceded by a space unless the text so far is empty.
/// Returns `None` when there are no visual lines to map onto.
#[instrument(skip_all, fields(lines = lines.len(), text_len = replacement.len()))]
pub fn map_text(lines: Vec<VisualLine>, replacement: &str) -> Option<RewritePlan> {
    if lines.is_empty() {
        return None;
    }

    let normalized = replacement.replace('\r', "");
    let mut source = normalized.split('\n');
    let mut rewrites: Vec<LineRewrite> = lines
        .into_iter()
        .map(|line| LineRewrite {
            text: source.next().unwrap_or_default().to_string(),
            line,
        })
        .collect();

    let mut surplus = 0usize;
    if let Some(last) = rewrites.last_mut() {
        for extra in source {
            if !last.text.is_empty() {
                last.text.push(' ');
            }
            last.text.push_str(extra);
            surplus += 1;
        }
    }

    let mut plan = RewritePlan::new();
    for rewrite in rewrites {
        plan.entry(rewrite.line.page_index).or_default().push(rewrite);
    }

    debug!(pages = plan.len(), surplus, "Replacement text mapped onto lines");
    Some(plan)
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line aggregation — group glyph runs that share a baseline into visual lines.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::geometry::Rect;
use crate::pdf::extract::GlyphRun;
use crate::pdf::fonts::FontRef;

/// A row of text as a reader sees it: runs sharing one baseline.
#[derive(Debug, Clone)]
pub struct VisualLine {
    pub page_index: usize,
    /// Union of the member runs' boxes.
    pub bbox: Rect,
    /// Running average of the member baselines.
    pub baseline: f32,
    /// Font of the first member that had one.
    pub font: Option<FontRef>,
    pub font_size: f32,
    /// Member runs, left to right.
    pub runs: Vec<GlyphRun>,
}

impl VisualLine {
    fn open(run: GlyphRun) -> Self {
        Self {
            page_index: run.page_index,
            bbox: run.bbox,
            baseline: run.baseline,
            font: run.font.clone(),
            font_size: run.font_size,
            runs: vec![run],
        }
    }

    fn attach(&mut self, run: GlyphRun) {
        let count = self.runs.len() as f32;
        self.baseline += (run.baseline - self.baseline) / (count + 1.0);
        self.bbox = self.bbox.union(&run.bbox);
        if self.font.is_none() && run.font.is_some() {
            self.font = run.font.clone();
            self.font_size = run.font_size;
        }
        self.runs.push(run);
    }

    /// Text of the line, runs joined by a space where they are visibly apart.
    pub fn text(&self) -> String {
        let mut text = String::new();
        let mut previous: Option<&GlyphRun> = None;
        for run in &self.runs {
            if let Some(prev) = previous {
                let gap = run.bbox.min_x - prev.bbox.max_x;
                let spaced = text.ends_with(char::is_whitespace)
                    || run.text.starts_with(char::is_whitespace);
                if !spaced && gap > word_gap(prev.font_size.max(run.font_size)) {
                    text.push(' ');
                }
            }
            text.push_str(&run.text);
            previous = Some(run);
        }
        text
    }
}

/// Horizontal distance that separates two runs into different words.
fn word_gap(font_size: f32) -> f32 {
    font_size * 0.15
}

/// Group runs into visual lines.
///
/// Within a page a run joins the first open line whose running baseline is
/// within `tolerance`, otherwise it starts a new line. Pages come out in
/// ascending order; lines top to bottom, ties broken left to right.
#[instrument(skip_all, fields(runs = runs.len(), tolerance = tolerance))]
pub fn aggregate(runs: Vec<GlyphRun>, tolerance: f32) -> Vec<VisualLine> {
    let mut pages: BTreeMap<usize, Vec<VisualLine>> = BTreeMap::new();

    for run in runs {
        let lines = pages.entry(run.page_index).or_default();
        match lines
            .iter_mut()
            .find(|line| (line.baseline - run.baseline).abs() <= tolerance)
        {
            Some(line) => line.attach(run),
            None => lines.push(VisualLine::open(run)),
        }
    }

    let mut result = Vec::new();
    for (_, mut lines) in pages {
        for line in &mut lines {
            line.runs
                .sort_by(|a, b| a.bbox.min_x.partial_cmp(&b.bbox.min_x).unwrap_or(Ordering::Equal));
        }
        lines.sort_by(|a, b| {
            b.baseline
                .partial_cmp(&a.baseline)
                .unwrap_or(Ordering::Equal)
                .then(a.bbox.min_x.partial_cmp(&b.bbox.min_x).unwrap_or(Ordering::Equal))
        });
        result.extend(lines);
    }

    debug!(lines = result.len(), "Runs aggregated into lines");
    result
}

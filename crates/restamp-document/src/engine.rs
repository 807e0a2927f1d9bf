// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rewrite engine — the entry points: extract plain text, rewrite a PDF with
// its layout preserved, and render free text (reports) as a fresh PDF.

use restamp_core::config::EngineConfig;
use restamp_core::error::{RestampError, Result};
use restamp_core::types::{OutputKind, PaperSize};
use tracing::{info, instrument, warn};

use crate::layout::lines::{VisualLine, aggregate};
use crate::layout::mapper::map_text;
use crate::pdf::extract::extract_runs;
use crate::pdf::reader::PdfReader;
use crate::pdf::rewrite::{ApplyStats, apply_plan};
use crate::pdf::writer::PdfWriter;

/// A rewritten document and how it was produced.
#[derive(Debug, Clone)]
pub struct RewriteOutput {
    pub bytes: Vec<u8>,
    pub kind: OutputKind,
    /// Present when the text was replaced in place.
    pub stats: Option<ApplyStats>,
}

/// Stateless facade over extraction, mapping, rewriting, and pagination.
///
/// Holds only configuration, so one engine can serve any number of threads.
#[derive(Debug, Clone, Default)]
pub struct RewriteEngine {
    config: EngineConfig,
}

impl RewriteEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Visual lines of every page, pages in order, lines top to bottom.
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    pub fn extract_lines(&self, bytes: &[u8]) -> Result<Vec<VisualLine>> {
        let reader = PdfReader::from_bytes(bytes)?;
        let runs = extract_runs(reader.document())?;
        Ok(aggregate(runs, self.config.baseline_tolerance))
    }

    /// Plain text of the document, one visual line per output line.
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    pub fn extract_plain_text(&self, bytes: &[u8]) -> Result<String> {
        let lines = self.extract_lines(bytes)?;
        let text = lines
            .iter()
            .map(VisualLine::text)
            .collect::<Vec<_>>()
            .join("\n");
        info!(lines = lines.len(), chars = text.len(), "Text extracted");
        Ok(text)
    }

    /// Replace the document's text with `replacement`, keeping the layout.
    pub fn rewrite_with_layout(&self, bytes: &[u8], replacement: &str) -> Result<Vec<u8>> {
        self.rewrite(bytes, replacement).map(|output| output.bytes)
    }

    /// Like [`RewriteEngine::rewrite_with_layout`], also reporting whether
    /// the text was replaced in place or the fallback paginator was used.
    #[instrument(skip_all, fields(bytes_len = bytes.len(), text_len = replacement.len()))]
    pub fn rewrite(&self, bytes: &[u8], replacement: &str) -> Result<RewriteOutput> {
        let mut reader = PdfReader::from_bytes(bytes)?;
        let runs = extract_runs(reader.document())?;
        let lines = aggregate(runs, self.config.baseline_tolerance);

        let Some(plan) = map_text(lines, replacement) else {
            warn!("No text lines found, paginating replacement onto fresh pages");
            let writer = match reader.media_box(0) {
                Some(media_box) => PdfWriter::new(media_box.width(), media_box.height(), &self.config),
                None => PdfWriter::for_paper(self.config.fallback_paper_size, &self.config),
            };
            return Ok(RewriteOutput {
                bytes: writer.create_from_text(replacement)?,
                kind: OutputKind::Fallback,
                stats: None,
            });
        };

        let stats = apply_plan(reader.document_mut(), &plan, &self.config)?;
        let bytes = reader.save_to_bytes()?;
        info!(output_bytes = bytes.len(), "Document rewritten in place");

        Ok(RewriteOutput {
            bytes,
            kind: OutputKind::LayoutPreserved,
            stats: Some(stats),
        })
    }

    /// Render free text, such as a feedback report, on fresh Letter pages.
    #[instrument(skip_all, fields(text_len = text.len()))]
    pub fn render_report(&self, text: &str) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(RestampError::RenderFailure(
                "no report content to render".into(),
            ));
        }
        let mut writer = PdfWriter::for_paper(PaperSize::Letter, &self.config);
        writer.set_title("Feedback Report");
        writer.create_from_text(text)
    }
}

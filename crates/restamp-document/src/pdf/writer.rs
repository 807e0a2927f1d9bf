// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — lay plain text out on fresh pages using `printpdf` 0.8.
//
// Used when a source document has no text to rewrite in place, and for
// rendering feedback reports. Layout is computed first as a list of placed
// lines (which is what the tests look at) and then turned into `printpdf`
// operation lists, one `PdfPage` per laid-out page.

use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, TextItem,
};
use restamp_core::config::EngineConfig;
use restamp_core::error::Result;
use restamp_core::types::PaperSize;
use tracing::{debug, info, instrument};

use super::metrics::helvetica_string_width;
use crate::sanitize::sanitize_ascii;

/// Bullet markers recognised at the start of a line (after indentation).
const BULLETS: [&str; 3] = ["- ", "* ", "\u{2022} "];

/// One line of text at its final position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    /// 0-based page number.
    pub page: usize,
    pub x: f32,
    /// Baseline y in points from the bottom of the page.
    pub y: f32,
    /// Sanitised text, never empty.
    pub text: String,
}

/// The result of flowing text onto pages.
#[derive(Debug, Clone)]
pub struct TextLayout {
    pub page_count: usize,
    pub lines: Vec<PlacedLine>,
}

/// Creates new PDF documents from plain text.
pub struct PdfWriter {
    width_pt: f32,
    height_pt: f32,
    margin: f32,
    font_size: f32,
    leading: f32,
    title: Option<String>,
}

impl PdfWriter {
    /// A writer for pages of `width_pt` × `height_pt` points.
    pub fn new(width_pt: f32, height_pt: f32, config: &EngineConfig) -> Self {
        Self {
            width_pt,
            height_pt,
            margin: config.page_margin,
            font_size: config.fallback_font_size,
            leading: config.fallback_font_size * config.leading_multiplier,
            title: None,
        }
    }

    pub fn for_paper(paper_size: PaperSize, config: &EngineConfig) -> Self {
        let (width_pt, height_pt) = paper_size.dimensions_pt();
        Self::new(width_pt, height_pt, config)
    }

    /// Set a title for the PDF metadata.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    fn max_line_width(&self) -> f32 {
        self.width_pt - 2.0 * self.margin
    }

    // -- Layout ---------------------------------------------------------------

    /// Flow `text` onto pages.
    ///
    /// Every source line (after `\r` removal) is wrapped to the usable width;
    /// blank lines still take up one line of leading. A new page starts when
    /// the cursor reaches the bottom margin.
    pub fn layout(&self, text: &str) -> TextLayout {
        let top = self.height_pt - self.margin;
        let mut page = 0;
        let mut y = top;
        let mut lines = Vec::new();

        for source in text.replace('\r', "").split('\n') {
            for wrapped in wrap_line(source, self.max_line_width(), self.font_size) {
                if y <= self.margin {
                    page += 1;
                    y = top;
                }
                let sanitized = sanitize_ascii(&wrapped);
                if !sanitized.is_empty() {
                    lines.push(PlacedLine {
                        page,
                        x: self.margin,
                        y,
                        text: sanitized,
                    });
                }
                y -= self.leading;
            }
        }

        TextLayout {
            page_count: page + 1,
            lines,
        }
    }

    // -- Text to PDF ----------------------------------------------------------

    /// Create a PDF from plain text content.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub fn create_from_text(&self, text: &str) -> Result<Vec<u8>> {
        let title = self.title.as_deref().unwrap_or("Restamp Document");
        info!(
            width_pt = self.width_pt,
            height_pt = self.height_pt,
            title,
            "Creating text PDF"
        );

        let layout = self.layout(text);
        let page_w = Mm(pt_to_mm(self.width_pt));
        let page_h = Mm(pt_to_mm(self.height_pt));

        let mut page_ops: Vec<Vec<Op>> = (0..layout.page_count).map(|_| Vec::new()).collect();
        for line in &layout.lines {
            let ops = &mut page_ops[line.page];
            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(line.x),
                    y: Pt(line.y),
                },
            });
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(self.font_size),
                font: BuiltinFont::Helvetica,
            });
            ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(line.text.clone())],
                font: BuiltinFont::Helvetica,
            });
            ops.push(Op::EndTextSection);
        }

        let pages: Vec<PdfPage> = page_ops
            .into_iter()
            .map(|ops| PdfPage::new(page_w, page_h, ops))
            .collect();

        let mut doc = PdfDocument::new(title);
        doc.with_pages(pages);

        debug!(
            lines = layout.lines.len(),
            pages = layout.page_count,
            "Text layout complete"
        );

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        Ok(output)
    }
}

fn pt_to_mm(pt: f32) -> f32 {
    pt * 25.4 / 72.0
}

// -- Line wrapping ---------------------------------------------------------------

/// Indentation and bullet split off the front of a line.
#[derive(Debug, PartialEq)]
struct PrefixParts<'a> {
    first: String,
    continuation: String,
    body: &'a str,
}

fn detect_prefix(line: &str) -> PrefixParts<'_> {
    let content_start = line
        .char_indices()
        .find(|(_, ch)| !ch.is_whitespace())
        .map_or(line.len(), |(i, _)| i);
    let (indent, body) = line.split_at(content_start);

    match BULLETS.iter().find(|bullet| body.starts_with(**bullet)) {
        Some(bullet) => PrefixParts {
            first: format!("{}{}", indent, bullet),
            continuation: format!("{}  ", indent),
            body: body[bullet.len()..].trim_start(),
        },
        None => PrefixParts {
            first: indent.to_string(),
            continuation: indent.to_string(),
            body,
        },
    }
}

/// Wrap one source line to `max_width` points of Helvetica at `font_size`.
///
/// A blank line yields a single empty line. Bulleted lines continue under
/// the bullet text. Words too wide for a line on their own are broken
/// between characters.
pub fn wrap_line(line: &str, max_width: f32, font_size: f32) -> Vec<String> {
    if line.trim().is_empty() {
        return vec![String::new()];
    }

    let fits = |candidate: &str| helvetica_string_width(&sanitize_ascii(candidate), font_size) <= max_width;
    let parts = detect_prefix(line.trim_end());
    let mut lines = Vec::new();
    let mut current = parts.first.clone();
    let mut has_words = false;

    for word in parts.body.split_whitespace() {
        if has_words {
            let candidate = format!("{} {}", current, word);
            if fits(&candidate) {
                current = candidate;
                continue;
            }
            lines.push(std::mem::replace(&mut current, parts.continuation.clone()));
            has_words = false;
        }

        let mut rest = word;
        loop {
            let candidate = format!("{}{}", current, rest);
            if fits(&candidate) {
                current = candidate;
                has_words = true;
                break;
            }

            let split = break_point(&current, rest, &fits);
            current.push_str(&rest[..split]);
            lines.push(std::mem::replace(&mut current, parts.continuation.clone()));
            rest = &rest[split..];
            if rest.is_empty() {
                break;
            }
        }
    }

    if has_words {
        lines.push(current);
    } else if lines.is_empty() {
        lines.push(parts.first.trim_end().to_string());
    }
    lines
}

/// Byte offset into `word` of the longest prefix that fits after `current`.
/// Always at least one character so wrapping makes progress.
fn break_point(current: &str, word: &str, fits: &dyn Fn(&str) -> bool) -> usize {
    let mut boundaries = word.char_indices().map(|(i, ch)| i + ch.len_utf8());
    let first = boundaries.next().unwrap_or(word.len());
    let mut best = first;
    for end in boundaries {
        if fits(&format!("{}{}", current, &word[..end])) {
            best = end;
        } else {
            break;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::reader::PdfReader;

    fn writer() -> PdfWriter {
        PdfWriter::for_paper(PaperSize::Letter, &EngineConfig::default())
    }

    #[test]
    fn detects_indent_and_bullets() {
        let parts = detect_prefix("  - Led the team");
        assert_eq!(parts.first, "  - ");
        assert_eq!(parts.continuation, "    ");
        assert_eq!(parts.body, "Led the team");

        let parts = detect_prefix("\u{2022}   Shipped");
        assert_eq!(parts.first, "\u{2022} ");
        assert_eq!(parts.body, "Shipped");

        let parts = detect_prefix("-no space");
        assert_eq!(parts.first, "");
        assert_eq!(parts.body, "-no space");
    }

    #[test]
    fn wrapped_lines_respect_the_width() {
        let text = "Experienced engineer ".repeat(20);
        let max = 200.0;
        let lines = wrap_line(&text, max, 12.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(helvetica_string_width(line, 12.0) <= max, "too wide: {line}");
        }
        let rejoined: Vec<&str> = lines.iter().flat_map(|l| l.split_whitespace()).collect();
        assert_eq!(rejoined.len(), 40);
    }

    #[test]
    fn bullet_continuations_hang_under_the_text() {
        let lines = wrap_line("* one two three four five six seven eight", 80.0, 12.0);
        assert!(lines.len() > 1);
        assert!(lines[0].starts_with("* one"));
        for line in &lines[1..] {
            assert!(line.starts_with("  "));
            assert!(!line.starts_with("   "));
        }
    }

    #[test]
    fn overlong_words_are_broken() {
        let word = "x".repeat(200);
        let lines = wrap_line(&word, 100.0, 12.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
        for line in &lines {
            assert!(helvetica_string_width(line, 12.0) <= 100.0);
        }
    }

    #[test]
    fn blank_and_bullet_only_lines() {
        assert_eq!(wrap_line("   ", 100.0, 12.0), vec![String::new()]);
        assert_eq!(wrap_line("- ", 100.0, 12.0), vec!["-".to_string()]);
    }

    #[test]
    fn layout_starts_at_the_top_margin_and_breaks_pages() {
        let w = writer();
        let text = (0..60).map(|i| format!("Line {i}")).collect::<Vec<_>>().join("\n");
        let layout = w.layout(&text);

        assert_eq!(layout.lines[0].y, 742.0);
        assert_eq!(layout.lines[0].x, 50.0);
        // 692 points of usable height at 16.8 leading: 42 lines per page.
        assert_eq!(layout.page_count, 2);
        assert_eq!(layout.lines.iter().filter(|l| l.page == 0).count(), 42);
        assert_eq!(layout.lines[42].y, 742.0);
        assert!(layout.lines.iter().all(|l| l.y > 50.0));
    }

    #[test]
    fn blank_lines_consume_leading() {
        let layout = writer().layout("first\n\nthird");
        assert_eq!(layout.lines.len(), 2);
        assert!((layout.lines[0].y - layout.lines[1].y - 2.0 * 16.8).abs() < 1e-3);
    }

    #[test]
    fn empty_text_renders_one_blank_page() {
        let w = writer();
        let layout = w.layout("");
        assert_eq!(layout.page_count, 1);
        assert!(layout.lines.is_empty());

        let bytes = w.create_from_text("").unwrap();
        let reader = PdfReader::from_bytes(&bytes).unwrap();
        assert_eq!(reader.page_count(), 1);
    }

    #[test]
    fn created_pdf_uses_the_requested_page_size() {
        let w = PdfWriter::for_paper(PaperSize::A4, &EngineConfig::default());
        let bytes = w.create_from_text("Hello").unwrap();
        let reader = PdfReader::from_bytes(&bytes).unwrap();
        let media_box = reader.media_box(0).unwrap();
        assert!((media_box.width() - 595.28).abs() < 0.5);
        assert!((media_box.height() - 841.89).abs() < 0.5);
    }
}

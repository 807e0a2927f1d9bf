// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Glyph-run extraction — interpret page content streams and report every
// text-showing operation as a positioned run of decoded text.
//
// Only the parts of the graphics state that move glyphs are tracked: the CTM,
// the text matrices, and the text state parameters. Filled rectangles are
// tracked too, so text painted over by an opaque box drops out of the result.

use std::borrow::Cow;

use euclid::point2;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object};
use restamp_core::error::Result;
use tracing::{debug, instrument, warn};

use super::fonts::{CodeWidth, DEFAULT_ASCENT, DEFAULT_DESCENT, FontCache, FontRef, win_ansi_char};
use super::reader::{dict_get, name, number, page_content, page_resources, resolve, resolve_dict};
use crate::geometry::{Matrix, Rect, transform_rect, vertical_scale};

/// Nesting limit for form XObjects drawing other forms.
const MAX_FORM_DEPTH: usize = 8;

/// Glyph width assumed when the font cannot be resolved (1/1000 em).
const UNKNOWN_FONT_GLYPH_WIDTH: f32 = 500.0;

/// A `TJ` adjustment at least this wide (1/1000 em) reads as a word gap.
const TJ_SPACE_THRESHOLD: f32 = 250.0;

/// Overhang allowed when deciding whether a fill covers a run.
const OCCLUSION_TOLERANCE: f32 = 0.5;

/// One text-showing operation as it lands on the page.
#[derive(Debug, Clone)]
pub struct GlyphRun {
    /// 0-based page index.
    pub page_index: usize,
    /// Union of the glyph boxes in default user space.
    pub bbox: Rect,
    /// Baseline y of the first glyph.
    pub baseline: f32,
    /// Font of the first glyph, when it resolved.
    pub font: Option<FontRef>,
    /// Point size after text and CTM scaling.
    pub font_size: f32,
    /// Decoded Unicode text.
    pub text: String,
}

/// Extract glyph runs from every page, in page order and content order.
#[instrument(skip_all, fields(pages = doc.get_pages().len()))]
pub fn extract_runs(doc: &Document) -> Result<Vec<GlyphRun>> {
    let mut fonts = FontCache::new();
    let mut runs = Vec::new();

    for (number, page_id) in doc.get_pages() {
        let data = page_content(doc, page_id);
        let content = match Content::decode(&strip_inline_images(&data)) {
            Ok(content) => content,
            Err(err) => {
                warn!(page = number, %err, "Cannot decode page content, page has no text runs");
                continue;
            }
        };

        let mut scanner = PageScanner {
            doc,
            fonts: &mut fonts,
            page_index: number as usize - 1,
            runs: Vec::new(),
            pending_rects: Vec::new(),
        };
        scanner.scan(
            &content.operations,
            page_resources(doc, page_id),
            GraphicsState::default(),
            0,
        );
        debug!(page = number, runs = scanner.runs.len(), "Page scanned");
        runs.append(&mut scanner.runs);
    }

    debug!(runs = runs.len(), "Glyph runs extracted");
    Ok(runs)
}

// -- State ----------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TextState {
    font: Option<FontRef>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    /// `Tz / 100`.
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

/// Text matrix and text line matrix of the current `BT`/`ET` object.
#[derive(Debug, Clone, Copy, Default)]
struct TextCursor {
    tm: Matrix,
    tlm: Matrix,
}

impl TextCursor {
    fn begin(&mut self) {
        self.tm = Matrix::identity();
        self.tlm = Matrix::identity();
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translation(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }

    fn set(&mut self, matrix: Matrix) {
        self.tm = matrix;
        self.tlm = matrix;
    }

    fn advance(&mut self, tx: f32) {
        self.tm = Matrix::translation(tx, 0.0).then(&self.tm);
    }
}

/// Glyphs shown by one text operator, accumulated until the operator ends.
#[derive(Default)]
struct Batch {
    bbox: Option<Rect>,
    baseline: f32,
    font: Option<FontRef>,
    font_size: f32,
    text: String,
}

impl Batch {
    fn into_run(self, page_index: usize) -> Option<GlyphRun> {
        let bbox = self.bbox?;
        if bbox.width() <= 0.0 || bbox.height() <= 0.0 || self.text.trim().is_empty() {
            return None;
        }
        Some(GlyphRun {
            page_index,
            bbox,
            baseline: self.baseline,
            font: self.font,
            font_size: self.font_size,
            text: self.text,
        })
    }
}

// -- Interpreter -------------------------------------------------------------------

struct PageScanner<'a> {
    doc: &'a Document,
    fonts: &'a mut FontCache,
    page_index: usize,
    runs: Vec<GlyphRun>,
    /// Rectangles of the current path, waiting for a paint operator.
    pending_rects: Vec<Rect>,
}

impl<'a> PageScanner<'a> {
    fn scan(
        &mut self,
        operations: &[Operation],
        resources: Option<&'a Dictionary>,
        initial: GraphicsState,
        depth: usize,
    ) {
        let mut gs = initial;
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut cursor = TextCursor::default();

        for op in operations {
            let operands = op.operands.as_slice();
            let num = |i: usize| operands.get(i).and_then(number).unwrap_or(0.0);

            match op.operator.as_str() {
                "q" => stack.push(gs.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        gs = saved;
                    }
                }
                "cm" => {
                    let m = Matrix::new(num(0), num(1), num(2), num(3), num(4), num(5));
                    gs.ctm = m.then(&gs.ctm);
                }
                "BT" => cursor.begin(),
                "ET" => {}
                "Tf" => {
                    gs.text.font_size = num(1);
                    gs.text.font = operands
                        .first()
                        .and_then(name)
                        .and_then(|font_name| self.resolve_font(resources, font_name));
                }
                "Tc" => gs.text.char_spacing = num(0),
                "Tw" => gs.text.word_spacing = num(0),
                "Tz" => gs.text.horizontal_scale = num(0) / 100.0,
                "TL" => gs.text.leading = num(0),
                "Ts" => gs.text.rise = num(0),
                "Td" => cursor.next_line(num(0), num(1)),
                "TD" => {
                    gs.text.leading = -num(1);
                    cursor.next_line(num(0), num(1));
                }
                "Tm" => cursor.set(Matrix::new(num(0), num(1), num(2), num(3), num(4), num(5))),
                "T*" => cursor.next_line(0.0, -gs.text.leading),
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        let mut batch = Batch::default();
                        show_glyphs(&gs, &mut cursor, bytes, &mut batch);
                        self.flush(batch);
                    }
                }
                "'" => {
                    cursor.next_line(0.0, -gs.text.leading);
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        let mut batch = Batch::default();
                        show_glyphs(&gs, &mut cursor, bytes, &mut batch);
                        self.flush(batch);
                    }
                }
                "\"" => {
                    gs.text.word_spacing = num(0);
                    gs.text.char_spacing = num(1);
                    cursor.next_line(0.0, -gs.text.leading);
                    if let Some(Object::String(bytes, _)) = operands.get(2) {
                        let mut batch = Batch::default();
                        show_glyphs(&gs, &mut cursor, bytes, &mut batch);
                        self.flush(batch);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        let mut batch = Batch::default();
                        show_adjusted(&gs, &mut cursor, items, &mut batch);
                        self.flush(batch);
                    }
                }
                "re" => {
                    let rect = transform_rect(&gs.ctm, num(0), num(1), num(2), num(3));
                    self.pending_rects.push(rect);
                }
                "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => self.occlude(),
                "n" | "S" | "s" => self.pending_rects.clear(),
                "Do" => {
                    if let Some(xobject) = operands.first().and_then(name) {
                        self.scan_form(xobject, resources, &gs, depth);
                    }
                }
                _ => {}
            }
        }
    }

    fn resolve_font(&mut self, resources: Option<&Dictionary>, font_name: &[u8]) -> Option<FontRef> {
        let font = self.fonts.lookup(self.doc, resources, font_name);
        if font.is_none() {
            warn!(
                page = self.page_index,
                font = %String::from_utf8_lossy(font_name),
                "Font resource not found, glyph widths will be estimated"
            );
        }
        font
    }

    fn flush(&mut self, batch: Batch) {
        if let Some(run) = batch.into_run(self.page_index) {
            self.runs.push(run);
        }
    }

    /// A fill paints over every earlier run that lies inside a pending rect.
    fn occlude(&mut self) {
        let rects = std::mem::take(&mut self.pending_rects);
        if rects.is_empty() {
            return;
        }
        let before = self.runs.len();
        self.runs.retain(|run| {
            !rects
                .iter()
                .any(|rect| rect.contains(&run.bbox, OCCLUSION_TOLERANCE))
        });
        if self.runs.len() != before {
            debug!(
                page = self.page_index,
                hidden = before - self.runs.len(),
                "Runs covered by a filled rectangle"
            );
        }
    }

    fn scan_form(
        &mut self,
        xobject: &[u8],
        resources: Option<&'a Dictionary>,
        gs: &GraphicsState,
        depth: usize,
    ) {
        let doc = self.doc;
        let Some(entry) = resources
            .and_then(|r| dict_get(doc, r, b"XObject"))
            .and_then(|x| resolve_dict(doc, x))
            .and_then(|x| x.get(xobject).ok())
        else {
            return;
        };
        let Object::Stream(stream) = resolve(doc, entry) else {
            return;
        };
        if dict_get(doc, &stream.dict, b"Subtype").and_then(name) != Some(b"Form".as_slice()) {
            return;
        }
        if depth >= MAX_FORM_DEPTH {
            warn!(depth, "Form XObjects nested too deeply, skipping");
            return;
        }

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        let content = match Content::decode(&data) {
            Ok(content) => content,
            Err(err) => {
                warn!(
                    form = %String::from_utf8_lossy(xobject),
                    %err,
                    "Cannot decode form XObject content, skipping"
                );
                return;
            }
        };

        let matrix = match dict_get(doc, &stream.dict, b"Matrix") {
            Some(Object::Array(values)) if values.len() == 6 => {
                let v: Vec<f32> = values
                    .iter()
                    .map(|value| number(resolve(doc, value)).unwrap_or(0.0))
                    .collect();
                Matrix::new(v[0], v[1], v[2], v[3], v[4], v[5])
            }
            _ => Matrix::identity(),
        };
        let form_resources = dict_get(doc, &stream.dict, b"Resources")
            .and_then(|r| resolve_dict(doc, r))
            .or(resources);

        let mut state = gs.clone();
        state.ctm = matrix.then(&gs.ctm);

        // Paths do not survive the implicit save/restore around a form.
        let outer_rects = std::mem::take(&mut self.pending_rects);
        self.scan(&content.operations, form_resources, state, depth + 1);
        self.pending_rects = outer_rects;
    }
}

/// Remove inline images (`BI ... ID <data> EI`) from a content stream.
///
/// lopdf refuses whole streams over inline images it cannot size, such as
/// filtered ones, and an image never carries text.
fn strip_inline_images(data: &[u8]) -> Cow<'_, [u8]> {
    let Some(mut begin) = find_keyword(data, b"BI", 0) else {
        return Cow::Borrowed(data);
    };

    let mut out = Vec::with_capacity(data.len());
    let mut copied = 0;
    loop {
        let Some(id) = find_keyword(data, b"ID", begin + 2) else {
            break;
        };
        // One whitespace byte separates `ID` from the image data.
        let Some(end) = find_keyword(data, b"EI", id + 3) else {
            break;
        };
        out.extend_from_slice(&data[copied..begin]);
        out.push(b' ');
        copied = end + 2;
        match find_keyword(data, b"BI", copied) {
            Some(next) => begin = next,
            None => break,
        }
    }
    out.extend_from_slice(&data[copied..]);
    Cow::Owned(out)
}

/// Position of `keyword` at or after `from`, delimited by whitespace or the
/// ends of `data`.
fn find_keyword(data: &[u8], keyword: &[u8], from: usize) -> Option<usize> {
    let is_boundary = |byte: Option<&u8>| byte.is_none_or(u8::is_ascii_whitespace);
    (from..data.len()).find(|&at| {
        data[at..].starts_with(keyword)
            && is_boundary(at.checked_sub(1).and_then(|before| data.get(before)))
            && is_boundary(data.get(at + keyword.len()))
    })
}

/// Lay out the glyphs of one string operand, advancing the text matrix.
fn show_glyphs(gs: &GraphicsState, cursor: &mut TextCursor, bytes: &[u8], batch: &mut Batch) {
    let ts = &gs.text;
    let font = ts.font.as_ref();

    let codes: Vec<u32> = match font {
        Some(font) => font.font.codes(bytes),
        None => bytes.iter().map(|b| u32::from(*b)).collect(),
    };
    let single_byte = font.is_none_or(|f| f.font.code_width() == CodeWidth::One);
    let (ascent, descent) = font.map_or((DEFAULT_ASCENT, DEFAULT_DESCENT), |f| {
        (f.font.ascent(), f.font.descent())
    });

    for code in codes {
        let (text, width) = match font {
            Some(font) => (
                font.font
                    .decode_code(code)
                    .unwrap_or_else(|| char::REPLACEMENT_CHARACTER.to_string()),
                font.font.width(code),
            ),
            None => (
                u8::try_from(code)
                    .ok()
                    .and_then(win_ansi_char)
                    .unwrap_or(char::REPLACEMENT_CHARACTER)
                    .to_string(),
                UNKNOWN_FONT_GLYPH_WIDTH,
            ),
        };
        let w0 = width / 1000.0;

        let trm = Matrix::new(
            ts.font_size * ts.horizontal_scale,
            0.0,
            0.0,
            ts.font_size,
            0.0,
            ts.rise,
        )
        .then(&cursor.tm)
        .then(&gs.ctm);
        let glyph_box = transform_rect(&trm, 0.0, descent, w0, ascent - descent);

        batch.bbox = Some(match batch.bbox {
            Some(bbox) => bbox.union(&glyph_box),
            None => {
                batch.baseline = trm.transform_point(point2(0.0, 0.0)).y;
                batch.font = font.cloned();
                batch.font_size = vertical_scale(&trm);
                glyph_box
            }
        });
        batch.text.push_str(&text);

        let word_spacing = if single_byte && code == 32 {
            ts.word_spacing
        } else {
            0.0
        };
        cursor.advance((w0 * ts.font_size + ts.char_spacing + word_spacing) * ts.horizontal_scale);
    }
}

/// `TJ`: strings interleaved with position adjustments in 1/1000 em.
fn show_adjusted(gs: &GraphicsState, cursor: &mut TextCursor, items: &[Object], batch: &mut Batch) {
    for item in items {
        match item {
            Object::String(bytes, _) => show_glyphs(gs, cursor, bytes, batch),
            other => {
                let Some(adjust) = number(other) else {
                    continue;
                };
                cursor.advance(-adjust / 1000.0 * gs.text.font_size * gs.text.horizontal_scale);
                if adjust <= -TJ_SPACE_THRESHOLD
                    && !batch.text.is_empty()
                    && !batch.text.ends_with(char::is_whitespace)
                {
                    batch.text.push(' ');
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testing::{FixtureLine, build_pdf, build_pdf_with_content};

    fn runs_of(bytes: &[u8]) -> Vec<GlyphRun> {
        let doc = Document::load_mem(bytes).unwrap();
        extract_runs(&doc).unwrap()
    }

    #[test]
    fn extracts_positioned_runs() {
        let bytes = build_pdf(&[vec![
            FixtureLine::new("Alice Smith", 72.0, 700.0),
            FixtureLine::new("Software Engineer", 72.0, 680.0),
        ]]);
        let runs = runs_of(&bytes);

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "Alice Smith");
        assert_eq!(runs[0].page_index, 0);
        assert!((runs[0].baseline - 700.0).abs() < 1e-3);
        assert!((runs[0].bbox.min_x - 72.0).abs() < 1e-3);
        assert!((runs[0].font_size - 12.0).abs() < 1e-3);
        // Ascent/descent of the standard font.
        assert!((runs[0].bbox.max_y - (700.0 + 0.718 * 12.0)).abs() < 1e-2);
        assert!((runs[0].bbox.min_y - (700.0 - 0.207 * 12.0)).abs() < 1e-2);
        // Width from Helvetica metrics.
        let expected = crate::pdf::metrics::helvetica_string_width("Alice Smith", 12.0);
        assert!((runs[0].bbox.width() - expected).abs() < 1e-2);
        assert_eq!(runs[0].font.as_ref().unwrap().base_font(), "Helvetica");
        assert_eq!(runs[1].text, "Software Engineer");
    }

    #[test]
    fn tj_arrays_become_one_run_with_word_gaps() {
        let bytes = build_pdf_with_content(
            b"BT /F1 10 Tf 1 0 0 1 50 500 Tm [(Team) -300 (Lead) 20 (er)] TJ ET",
        );
        let runs = runs_of(&bytes);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "Team Leader");
    }

    #[test]
    fn ctm_and_text_scaling_affect_geometry() {
        let bytes = build_pdf_with_content(b"q 2 0 0 2 10 20 cm BT /F1 6 Tf 5 100 Td (Hi) Tj ET Q");
        let runs = runs_of(&bytes);
        assert_eq!(runs.len(), 1);
        assert!((runs[0].font_size - 12.0).abs() < 1e-3);
        assert!((runs[0].baseline - 220.0).abs() < 1e-3);
        assert!((runs[0].bbox.min_x - 20.0).abs() < 1e-3);
    }

    #[test]
    fn leading_operators_move_down() {
        let bytes = build_pdf_with_content(
            b"BT /F1 12 Tf 14 TL 72 700 Td (one) Tj T* (two) Tj (three) ' ET",
        );
        let runs = runs_of(&bytes);
        let baselines: Vec<f32> = runs.iter().map(|r| r.baseline).collect();
        assert_eq!(runs.len(), 3);
        assert!((baselines[0] - 700.0).abs() < 1e-3);
        assert!((baselines[1] - 686.0).abs() < 1e-3);
        assert!((baselines[2] - 672.0).abs() < 1e-3);
    }

    #[test]
    fn whitespace_and_zero_size_runs_are_dropped() {
        let bytes = build_pdf_with_content(
            b"BT /F1 12 Tf 72 700 Td (   ) Tj /F1 0 Tf (hidden) Tj ET",
        );
        assert!(runs_of(&bytes).is_empty());
    }

    #[test]
    fn filled_rectangles_hide_earlier_text() {
        let bytes = build_pdf_with_content(
            b"BT /F1 12 Tf 72 700 Td (covered) Tj ET \
              BT /F1 12 Tf 72 600 Td (visible) Tj ET \
              1 1 1 rg 60 690 200 20 re f \
              BT /F1 12 Tf 72 700 Td (on top) Tj ET",
        );
        let texts: Vec<String> = runs_of(&bytes).into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["visible", "on top"]);
    }

    #[test]
    fn stroked_rectangles_do_not_hide_text() {
        let bytes = build_pdf_with_content(
            b"BT /F1 12 Tf 72 700 Td (boxed) Tj ET 60 690 200 20 re S 0 0 1 1 re f",
        );
        assert_eq!(runs_of(&bytes).len(), 1);
    }

    #[test]
    fn unknown_font_still_produces_a_run() {
        let bytes = build_pdf_with_content(b"BT /Missing 10 Tf 72 700 Td (Ghost) Tj ET");
        let runs = runs_of(&bytes);
        assert_eq!(runs.len(), 1);
        assert!(runs[0].font.is_none());
        assert_eq!(runs[0].text, "Ghost");
    }

    #[test]
    fn inline_images_do_not_hide_the_page_text() {
        let bytes = build_pdf_with_content(
            b"q 10 0 0 10 0 0 cm BI /W 1 /H 1 /BPC 8 /CS /G ID \x80 EI Q \
              BT /F1 12 Tf 72 700 Td (Hello) Tj ET",
        );
        let runs = runs_of(&bytes);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "Hello");
    }

    #[test]
    fn filtered_inline_images_are_skipped_too() {
        let bytes = build_pdf_with_content(
            b"BT /F1 12 Tf 72 700 Td (Before) Tj ET \
              BI /W 2 /H 2 /BPC 8 /CS /RGB /F /AHx ID 00ff00ff00ff> EI \
              BT /F1 12 Tf 72 680 Td (After) Tj ET",
        );
        let texts: Vec<String> = runs_of(&bytes).into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["Before", "After"]);
    }

    #[test]
    fn undecodable_pages_yield_no_runs_instead_of_failing() {
        // An inline image that never ends cannot be tokenised.
        let bytes = build_pdf_with_content(b"BT /F1 12 Tf 72 700 Td (Lost) Tj ET BI /W 1 /H 1");
        assert!(runs_of(&bytes).is_empty());
    }

    #[test]
    fn inline_image_stripping_respects_token_boundaries() {
        let data = b"(OBI ID) Tj BI /W 1 ID xEIx EI Q";
        assert_eq!(&*strip_inline_images(data), b"(OBI ID) Tj   Q".as_slice());
        assert!(matches!(strip_inline_images(b"BT (x) Tj ET"), Cow::Borrowed(_)));
    }
}

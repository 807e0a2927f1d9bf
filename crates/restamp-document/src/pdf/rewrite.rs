// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rewrite applier — paint over each mapped line and draw its replacement
// text in the line's own font, size, and position.
//
// Original content streams are never edited. Each touched page gets its
// existing content wrapped in `q`/`Q` and one appended stream holding the
// erase-and-draw operations, so the appended drawing starts from default
// user space whatever the original left on the graphics state stack.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use restamp_core::config::EngineConfig;
use restamp_core::error::{RestampError, Result};
use restamp_core::types::Rgb;
use tracing::{debug, info, instrument, warn};

use super::fonts::{FontFace, FontRef, StandardFont};
use super::reader::{page_resources, resolve_dict};
use crate::layout::mapper::{LineRewrite, RewritePlan};
use crate::sanitize::sanitize_for_font;

/// Prefix for font resource names this module registers.
const RESOURCE_PREFIX: &str = "RsF";

/// What happened while applying a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub pages: usize,
    pub lines_erased: usize,
    pub lines_drawn: usize,
    /// Lines drawn with the fallback font instead of their own.
    pub fallbacks: usize,
    /// Lines whose text could not be drawn at all.
    pub skipped: usize,
}

/// Apply `plan` to `doc` in place.
#[instrument(skip_all, fields(pages = plan.len()))]
pub fn apply_plan(doc: &mut Document, plan: &RewritePlan, config: &EngineConfig) -> Result<ApplyStats> {
    let pages = doc.get_pages();
    let mut stats = ApplyStats::default();

    for (page_index, rewrites) in plan {
        let Some(&page_id) = pages.get(&(*page_index as u32 + 1)) else {
            warn!(page_index, "Rewrite targets a page that does not exist, skipping");
            continue;
        };

        let mut fonts = PageFonts::new(doc, page_id);
        let mut operations = Vec::new();
        for rewrite in rewrites {
            erase_line(&mut operations, rewrite, config);
            stats.lines_erased += 1;

            match draw_line(&mut operations, &mut fonts, rewrite, config) {
                DrawOutcome::Drawn => stats.lines_drawn += 1,
                DrawOutcome::DrawnWithFallback => {
                    stats.lines_drawn += 1;
                    stats.fallbacks += 1;
                }
                DrawOutcome::Empty => {}
                DrawOutcome::Skipped => stats.skipped += 1,
            }
        }

        let content = Content { operations }.encode().map_err(|err| {
            RestampError::RenderFailure(format!("cannot encode rewrite content: {}", err))
        })?;
        append_wrapped_content(doc, page_id, content)?;
        fonts.install(doc, page_id)?;
        stats.pages += 1;
    }

    info!(
        pages = stats.pages,
        erased = stats.lines_erased,
        drawn = stats.lines_drawn,
        fallbacks = stats.fallbacks,
        skipped = stats.skipped,
        "Rewrite plan applied"
    );
    Ok(stats)
}

/// Fill the line's box, grown by the erase margin, with the background colour.
fn erase_line(operations: &mut Vec<Operation>, rewrite: &LineRewrite, config: &EngineConfig) {
    let area = rewrite.line.bbox.inflate(config.erase_margin);
    operations.push(Operation::new("q", vec![]));
    operations.push(fill_color(config.background));
    operations.push(Operation::new(
        "re",
        vec![
            area.min_x.into(),
            area.min_y.into(),
            area.width().into(),
            area.height().into(),
        ],
    ));
    operations.push(Operation::new("f", vec![]));
    operations.push(Operation::new("Q", vec![]));
}

enum DrawOutcome {
    Drawn,
    DrawnWithFallback,
    Empty,
    Skipped,
}

fn draw_line(
    operations: &mut Vec<Operation>,
    fonts: &mut PageFonts,
    rewrite: &LineRewrite,
    config: &EngineConfig,
) -> DrawOutcome {
    let line = &rewrite.line;
    let size = if line.font_size > 0.0 {
        line.font_size
    } else {
        config.default_font_size
    };

    let attempt = match &line.font {
        Some(font) => encode_in_own_font(fonts, font, &rewrite.text),
        None => Err(RestampError::RenderFailure("line has no resolvable font".into())),
    };

    let (name, encoded, is_fallback) = match attempt {
        Ok(Some((name, encoded))) => (name, encoded, false),
        Ok(None) => return DrawOutcome::Empty,
        Err(err) => {
            if line.font.is_some() {
                warn!(%err, baseline = line.baseline, "Retrying line with the fallback font");
            } else {
                debug!(baseline = line.baseline, "Drawing line with the fallback font");
            }
            let standard = FontFace::Standard(StandardFont);
            let text = sanitize_for_font(&standard, &rewrite.text);
            if text.is_empty() {
                return DrawOutcome::Empty;
            }
            match standard.encode(&text) {
                Ok(encoded) => (fonts.fallback_name(), encoded, true),
                Err(err) => {
                    warn!(%err, baseline = line.baseline, "Cannot draw replacement line, skipping");
                    return DrawOutcome::Skipped;
                }
            }
        }
    };

    operations.extend([
        Operation::new("q", vec![]),
        Operation::new("BT", vec![]),
        fill_color(config.text_color),
        Operation::new("Tf", vec![Object::Name(name), size.into()]),
        Operation::new("Td", vec![line.bbox.min_x.into(), line.baseline.into()]),
        Operation::new("Tj", vec![Object::String(encoded, StringFormat::Hexadecimal)]),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ]);

    if is_fallback {
        DrawOutcome::DrawnWithFallback
    } else {
        DrawOutcome::Drawn
    }
}

/// Resource name and string operand for `text` in the line's own font.
/// `Ok(None)` when the font can draw none of the text. Fails when the page
/// cannot address the font or the font cannot encode the sanitised text.
fn encode_in_own_font(
    fonts: &mut PageFonts,
    font: &FontRef,
    text: &str,
) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
    let face = FontFace::Document(font.font.clone());
    let text = sanitize_for_font(&face, text);
    if text.is_empty() {
        return Ok(None);
    }
    let name = fonts.name_for_font(font).ok_or_else(|| {
        RestampError::RenderFailure(format!(
            "font {} is not reachable from the page resources",
            font.base_font()
        ))
    })?;
    Ok(Some((name, face.encode(&text)?)))
}

fn fill_color(color: Rgb) -> Operation {
    Operation::new("rg", vec![color.r.into(), color.g.into(), color.b.into()])
}

/// Surround the page's existing content with `q`/`Q` and append `content`.
fn append_wrapped_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let existing: Vec<Object> = match doc.get_dictionary(page_id).ok().and_then(|p| p.get(b"Contents").ok()) {
        Some(Object::Array(items)) => items.clone(),
        Some(Object::Reference(id)) => match doc.get_object(*id) {
            // An indirect array of streams.
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        _ => Vec::new(),
    };

    let mut contents = Vec::with_capacity(existing.len() + 3);
    if !existing.is_empty() {
        let open = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let close = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
        contents.push(Object::Reference(open));
        contents.extend(existing);
        contents.push(Object::Reference(close));
    }
    let appended = doc.add_object(Stream::new(Dictionary::new(), content));
    contents.push(Object::Reference(appended));

    let page = doc.get_dictionary_mut(page_id).map_err(|err| {
        RestampError::RenderFailure(format!("cannot update page {:?}: {}", page_id, err))
    })?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}

/// The page's font resources, extended with whatever the rewrite needs.
///
/// Works on a copy of the (possibly inherited or shared) resource
/// dictionary that is installed directly on the page once the page is done,
/// so sibling pages sharing resources are not affected.
struct PageFonts {
    resources: Dictionary,
    fonts: Dictionary,
    fallback: Option<Vec<u8>>,
    changed: bool,
}

impl PageFonts {
    fn new(doc: &Document, page_id: ObjectId) -> Self {
        let resources = page_resources(doc, page_id).cloned().unwrap_or_default();
        let fonts = resources
            .get(b"Font")
            .ok()
            .and_then(|f| resolve_dict(doc, f))
            .cloned()
            .unwrap_or_default();
        Self {
            resources,
            fonts,
            fallback: None,
            changed: false,
        }
    }

    /// Resource name that selects `font` on this page.
    fn name_for_font(&mut self, font: &FontRef) -> Option<Vec<u8>> {
        match font.object_id {
            Some(id) => self.name_for(id),
            None => self.direct_name(font),
        }
    }

    /// A font written as a direct dictionary has no object to point a new
    /// name at. Its own resource name works when the page lists that same
    /// font under it.
    fn direct_name(&self, font: &FontRef) -> Option<Vec<u8>> {
        let Ok(Object::Dictionary(dict)) = self.fonts.get(&font.resource_name) else {
            return None;
        };
        let same_font = dict
            .get(b"BaseFont")
            .and_then(Object::as_name)
            .map_or(true, |base_font| base_font == font.base_font().as_bytes());
        same_font.then(|| font.resource_name.clone())
    }

    /// Resource name under which font object `id` is reachable on this page,
    /// registering it under a fresh name when the page does not list it.
    fn name_for(&mut self, id: ObjectId) -> Option<Vec<u8>> {
        let existing = self
            .fonts
            .iter()
            .find(|(_, value)| matches!(value, Object::Reference(r) if *r == id))
            .map(|(key, _)| key.clone());
        if existing.is_some() {
            return existing;
        }

        let name = self.fresh_name();
        self.fonts.set(name.clone(), Object::Reference(id));
        self.changed = true;
        Some(name)
    }

    /// Resource name of the standard fallback font, registering it once.
    fn fallback_name(&mut self) -> Vec<u8> {
        if let Some(name) = &self.fallback {
            return name.clone();
        }
        let name = self.fresh_name();
        self.fonts.set(name.clone(), Object::Dictionary(StandardFont.dictionary()));
        self.fallback = Some(name.clone());
        self.changed = true;
        name
    }

    fn fresh_name(&self) -> Vec<u8> {
        (1..)
            .map(|n| format!("{}{}", RESOURCE_PREFIX, n).into_bytes())
            .find(|candidate| !self.fonts.has(candidate))
            .unwrap_or_else(|| RESOURCE_PREFIX.as_bytes().to_vec())
    }

    fn install(mut self, doc: &mut Document, page_id: ObjectId) -> Result<()> {
        if !self.changed {
            return Ok(());
        }
        self.resources.set("Font", Object::Dictionary(self.fonts));
        let page = doc.get_dictionary_mut(page_id).map_err(|err| {
            RestampError::RenderFailure(format!("cannot update page {:?}: {}", page_id, err))
        })?;
        page.set("Resources", Object::Dictionary(self.resources));
        debug!(?page_id, "Page font resources updated");
        Ok(())
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font model — decode glyph codes to Unicode, measure advances, and answer
// the one question the rewriter cares about: can this font draw this
// character?
//
// Document fonts are loaded once per font object and shared through `Arc`
// between every glyph run and visual line that uses them. The standard
// Helvetica face is the fallback for text no document font can encode.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use glyph_names::GLYPH_NAME_PAIRS;
use lopdf::{Dictionary, Document, Encoding, Object, ObjectId, dictionary};
use restamp_core::error::{RestampError, Result};
use tracing::{debug, warn};

use super::cmap::ToUnicodeMap;
use super::metrics::{helvetica_string_width, standard_width};
use super::reader::{dict_get, name, number, resolve, resolve_dict};

/// Ascent used when the font descriptor does not give one (em fraction).
pub const DEFAULT_ASCENT: f32 = 0.718;
/// Descent used when the font descriptor does not give one (em fraction).
pub const DEFAULT_DESCENT: f32 = -0.207;

/// Width assigned to CID fonts without `/DW`.
const DEFAULT_CID_WIDTH: f32 = 1000.0;

/// Bit 3 of `/Flags`: the font uses a symbolic character set.
const SYMBOLIC_FLAG: i64 = 1 << 2;

/// Code-to-Unicode table of a one-byte encoding.
pub type EncodingTable = [Option<char>; 256];

/// How many bytes each character code occupies in a string operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeWidth {
    One,
    Two,
}

/// A font loaded from a document's resources.
#[derive(Debug)]
pub struct DocumentFont {
    base_font: String,
    code_width: CodeWidth,
    /// Code to Unicode from the font's own encoding (simple fonts only).
    encoding: HashMap<u32, char>,
    /// Code to Unicode from `/ToUnicode`; wins over `encoding`.
    to_unicode: ToUnicodeMap,
    /// Reverse of `encoding`, used when encoding replacement text.
    encode_map: HashMap<char, u32>,
    /// Advance widths in glyph space (1/1000 em).
    widths: HashMap<u32, f32>,
    /// `c_first c_last w` entries of a CID font's `/W`.
    width_ranges: Vec<(u32, u32, f32)>,
    default_width: f32,
    /// Whether `/Widths` or `/W` was present in the font dictionary.
    explicit_widths: bool,
    embedded: bool,
    ascent: f32,
    descent: f32,
}

impl DocumentFont {
    /// Load a font dictionary. Malformed parts are skipped with a warning;
    /// loading itself never fails.
    pub fn load(doc: &Document, dict: &Dictionary) -> Self {
        let base_font = dict_get(doc, dict, b"BaseFont")
            .and_then(name)
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_else(|| "Unknown".to_string());

        let subtype = dict_get(doc, dict, b"Subtype").and_then(name).unwrap_or(b"");
        let to_unicode = dict_get(doc, dict, b"ToUnicode")
            .and_then(|object| match object {
                Object::Stream(stream) => Some(
                    stream
                        .decompressed_content()
                        .unwrap_or_else(|_| stream.content.clone()),
                ),
                _ => None,
            })
            .map(|data| ToUnicodeMap::parse(&data))
            .unwrap_or_default();

        let mut font = if subtype == b"Type0" {
            Self::load_composite(doc, dict, base_font, to_unicode)
        } else {
            Self::load_simple(doc, dict, base_font, to_unicode)
        };
        font.build_encode_map();

        debug!(
            base_font = %font.base_font,
            embedded = font.embedded,
            simple_codes = font.encode_map.len(),
            "Font loaded"
        );
        font
    }

    fn load_simple(
        doc: &Document,
        dict: &Dictionary,
        base_font: String,
        to_unicode: ToUnicodeMap,
    ) -> Self {
        let descriptor = dict_get(doc, dict, b"FontDescriptor").and_then(|d| resolve_dict(doc, d));
        let symbolic = descriptor
            .and_then(|d| dict_get(doc, d, b"Flags"))
            .and_then(|flags| match flags {
                Object::Integer(bits) => Some(bits & SYMBOLIC_FLAG != 0),
                _ => None,
            })
            .unwrap_or(false);

        let table = simple_encoding(doc, dict, symbolic);
        let encoding: HashMap<u32, char> = table
            .iter()
            .enumerate()
            .filter_map(|(code, ch)| ch.map(|c| (code as u32, c)))
            .collect();

        let mut widths = HashMap::new();
        let first_char = dict_get(doc, dict, b"FirstChar").and_then(number);
        let width_array = dict_get(doc, dict, b"Widths").and_then(|w| match w {
            Object::Array(items) => Some(items),
            _ => None,
        });
        let explicit_widths = first_char.is_some() && width_array.is_some();
        if let (Some(first), Some(items)) = (first_char, width_array) {
            for (offset, item) in items.iter().enumerate() {
                if let Some(width) = number(resolve(doc, item)) {
                    widths.insert(first as u32 + offset as u32, width);
                }
            }
        } else {
            for (code, ch) in &encoding {
                widths.insert(*code, f32::from(standard_width(&base_font, *ch)));
            }
        }

        let missing_width = descriptor
            .and_then(|d| dict_get(doc, d, b"MissingWidth"))
            .and_then(number);
        let default_width = match missing_width {
            Some(width) => width,
            None if explicit_widths => 0.0,
            None => 500.0,
        };

        let (ascent, descent) = descriptor_metrics(doc, descriptor);

        Self {
            embedded: descriptor.is_some_and(is_embedded),
            base_font,
            code_width: CodeWidth::One,
            encoding,
            to_unicode,
            encode_map: HashMap::new(),
            widths,
            width_ranges: Vec::new(),
            default_width,
            explicit_widths,
            ascent,
            descent,
        }
    }

    fn load_composite(
        doc: &Document,
        dict: &Dictionary,
        base_font: String,
        to_unicode: ToUnicodeMap,
    ) -> Self {
        let descendant = dict_get(doc, dict, b"DescendantFonts")
            .and_then(|d| match d {
                Object::Array(items) => items.first(),
                _ => None,
            })
            .and_then(|first| resolve_dict(doc, first));

        let mut widths = HashMap::new();
        let mut width_ranges = Vec::new();
        let mut default_width = DEFAULT_CID_WIDTH;
        let mut explicit_widths = false;
        let mut descriptor = None;

        if let Some(cid_font) = descendant {
            if let Some(dw) = dict_get(doc, cid_font, b"DW").and_then(number) {
                default_width = dw;
            }
            if let Some(Object::Array(w)) = dict_get(doc, cid_font, b"W") {
                explicit_widths = true;
                parse_cid_widths(doc, w, &mut widths, &mut width_ranges);
            }
            descriptor = dict_get(doc, cid_font, b"FontDescriptor").and_then(|d| resolve_dict(doc, d));
        } else {
            warn!(%base_font, "Type0 font has no descendant font");
        }

        if to_unicode.is_empty() {
            warn!(%base_font, "Composite font has no /ToUnicode, text will not be decodable");
        }

        let (ascent, descent) = descriptor_metrics(doc, descriptor);

        Self {
            embedded: descriptor.is_some_and(is_embedded),
            base_font,
            code_width: CodeWidth::Two,
            encoding: HashMap::new(),
            to_unicode,
            encode_map: HashMap::new(),
            widths,
            width_ranges,
            default_width,
            explicit_widths,
            ascent,
            descent,
        }
    }

    /// Reverse the one-byte encoding. The lowest code wins for duplicate
    /// characters so encoding is deterministic. `/ToUnicode` entries are
    /// reversed per lookup in [`Self::code_for`].
    fn build_encode_map(&mut self) {
        let mut codes: Vec<u32> = self.encoding.keys().copied().collect();
        codes.sort_unstable();

        for code in codes {
            if let Some(ch) = self.encoding.get(&code) {
                self.encode_map.entry(*ch).or_insert(code);
            }
        }
    }

    // -- Decoding -------------------------------------------------------------

    pub fn base_font(&self) -> &str {
        &self.base_font
    }

    pub fn code_width(&self) -> CodeWidth {
        self.code_width
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    /// Ascent as a fraction of the em.
    pub fn ascent(&self) -> f32 {
        self.ascent
    }

    /// Descent as a (negative) fraction of the em.
    pub fn descent(&self) -> f32 {
        self.descent
    }

    /// Split a string operand into character codes.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        match self.code_width {
            CodeWidth::One => bytes.iter().map(|b| u32::from(*b)).collect(),
            CodeWidth::Two => bytes
                .chunks(2)
                .map(|pair| match pair {
                    [hi, lo] => (u32::from(*hi) << 8) | u32::from(*lo),
                    [single] => u32::from(*single),
                    _ => 0,
                })
                .collect(),
        }
    }

    /// Unicode text for a character code, if the font can tell.
    pub fn decode_code(&self, code: u32) -> Option<String> {
        self.to_unicode
            .get(code)
            .or_else(|| self.encoding.get(&code).map(|ch| ch.to_string()))
    }

    /// Decode a string operand. Codes without a mapping become U+FFFD.
    pub fn decode(&self, bytes: &[u8]) -> String {
        self.codes(bytes)
            .into_iter()
            .map(|code| {
                self.decode_code(code)
                    .unwrap_or_else(|| char::REPLACEMENT_CHARACTER.to_string())
            })
            .collect()
    }

    /// Advance width of a code in glyph space (1/1000 em).
    pub fn width(&self, code: u32) -> f32 {
        if let Some(width) = self.widths.get(&code) {
            return *width;
        }
        self.width_ranges
            .iter()
            .find(|(first, last, _)| (*first..=*last).contains(&code))
            .map_or(self.default_width, |(_, _, width)| *width)
    }

    // -- Encoding -------------------------------------------------------------

    /// Whether the font has a glyph for `ch` that it can address.
    ///
    /// Embedded simple fonts are usually subsets, so an encodable code also
    /// needs a positive advance width to count.
    pub fn can_render(&self, ch: char) -> bool {
        self.renderable_code(ch).is_some()
    }

    /// The lowest code that decodes to `ch`.
    fn code_for(&self, ch: char) -> Option<u32> {
        let from_encoding = self
            .encode_map
            .get(&ch)
            .copied()
            .filter(|code| self.to_unicode.get(*code).is_none());
        let from_to_unicode = self.to_unicode.code_for(ch);
        let max_code = match self.code_width {
            CodeWidth::One => 0xFF,
            CodeWidth::Two => 0xFFFF,
        };
        from_encoding
            .into_iter()
            .chain(from_to_unicode)
            .filter(|code| *code <= max_code)
            .min()
    }

    fn renderable_code(&self, ch: char) -> Option<u32> {
        let code = self.code_for(ch)?;
        if ch.is_whitespace() || !self.embedded || !self.explicit_widths {
            return Some(code);
        }
        let has_glyph = match self.code_width {
            CodeWidth::One => self.widths.get(&code).is_some_and(|w| *w > 0.0),
            CodeWidth::Two => self.width(code) > 0.0,
        };
        has_glyph.then_some(code)
    }

    /// Encode `text` as a string operand for this font.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(text.len() * 2);
        for ch in text.chars() {
            let code = self.renderable_code(ch).ok_or_else(|| {
                RestampError::UnrenderableCharacter {
                    font: self.base_font.clone(),
                    character: ch,
                }
            })?;
            match self.code_width {
                CodeWidth::One => bytes.push(code as u8),
                CodeWidth::Two => bytes.extend_from_slice(&(code as u16).to_be_bytes()),
            }
        }
        Ok(bytes)
    }
}

/// Base-14 Helvetica with WinAnsiEncoding: the fallback face.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardFont;

impl StandardFont {
    pub const BASE_FONT: &'static str = "Helvetica";

    pub fn can_render(&self, ch: char) -> bool {
        win_ansi_code(ch).is_some()
    }

    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        text.chars()
            .map(|ch| {
                win_ansi_code(ch).ok_or_else(|| RestampError::UnrenderableCharacter {
                    font: Self::BASE_FONT.to_string(),
                    character: ch,
                })
            })
            .collect()
    }

    pub fn string_width(&self, text: &str, size: f32) -> f32 {
        helvetica_string_width(text, size)
    }

    /// Font dictionary to register in a page's resources.
    pub fn dictionary(&self) -> Dictionary {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => Self::BASE_FONT,
            "Encoding" => "WinAnsiEncoding",
        }
    }
}

/// Either a font from the document or the fallback face.
#[derive(Debug, Clone)]
pub enum FontFace {
    Document(Arc<DocumentFont>),
    Standard(StandardFont),
}

impl FontFace {
    pub fn name(&self) -> &str {
        match self {
            FontFace::Document(font) => font.base_font(),
            FontFace::Standard(_) => StandardFont::BASE_FONT,
        }
    }

    pub fn can_render(&self, ch: char) -> bool {
        match self {
            FontFace::Document(font) => font.can_render(ch),
            FontFace::Standard(font) => font.can_render(ch),
        }
    }

    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        match self {
            FontFace::Document(font) => font.encode(text),
            FontFace::Standard(font) => font.encode(text),
        }
    }
}

/// A font as used by a glyph run: where it came from plus the loaded face.
#[derive(Debug, Clone)]
pub struct FontRef {
    /// Resource name the content stream selected it by (without `/`).
    pub resource_name: Vec<u8>,
    /// Indirect object id of the font dictionary, when it has one.
    pub object_id: Option<ObjectId>,
    pub font: Arc<DocumentFont>,
}

impl FontRef {
    pub fn base_font(&self) -> &str {
        self.font.base_font()
    }
}

/// Per-document cache so each font object is parsed once.
#[derive(Default)]
pub struct FontCache {
    fonts: HashMap<ObjectId, Arc<DocumentFont>>,
}

impl FontCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve font resource `resource_name` in `resources`.
    pub fn lookup(
        &mut self,
        doc: &Document,
        resources: Option<&Dictionary>,
        resource_name: &[u8],
    ) -> Option<FontRef> {
        let fonts = resources
            .and_then(|r| dict_get(doc, r, b"Font"))
            .and_then(|f| resolve_dict(doc, f))?;
        let entry = fonts.get(resource_name).ok()?;

        let (object_id, font) = match entry {
            Object::Reference(id) => {
                let font = match self.fonts.get(id) {
                    Some(font) => Arc::clone(font),
                    None => {
                        let dict = resolve_dict(doc, entry)?;
                        let font = Arc::new(DocumentFont::load(doc, dict));
                        self.fonts.insert(*id, Arc::clone(&font));
                        font
                    }
                };
                (Some(*id), font)
            }
            Object::Dictionary(dict) => (None, Arc::new(DocumentFont::load(doc, dict))),
            _ => {
                warn!(name = %String::from_utf8_lossy(resource_name), "Font resource is not a dictionary");
                return None;
            }
        };

        Some(FontRef {
            resource_name: resource_name.to_vec(),
            object_id,
            font,
        })
    }
}

// -- Font dictionary helpers ---------------------------------------------------

fn is_embedded(descriptor: &Dictionary) -> bool {
    descriptor.has(b"FontFile") || descriptor.has(b"FontFile2") || descriptor.has(b"FontFile3")
}

fn descriptor_metrics(doc: &Document, descriptor: Option<&Dictionary>) -> (f32, f32) {
    let metric = |key: &[u8]| {
        descriptor
            .and_then(|d| dict_get(doc, d, key))
            .and_then(number)
            .filter(|v| *v != 0.0)
            .map(|v| v / 1000.0)
    };
    let ascent = metric(b"Ascent").filter(|a| *a > 0.0).unwrap_or(DEFAULT_ASCENT);
    let descent = metric(b"Descent")
        .map(|d| -d.abs())
        .unwrap_or(DEFAULT_DESCENT);
    (ascent, descent)
}

/// Code-to-Unicode table of a named base encoding, taken from lopdf's
/// encoding tables. `None` for names that are not one-byte base encodings.
pub fn base_encoding(encoding: &[u8]) -> Option<EncodingTable> {
    if !matches!(
        encoding,
        b"StandardEncoding" | b"WinAnsiEncoding" | b"MacRomanEncoding" | b"MacExpertEncoding"
    ) {
        return None;
    }
    let font = dictionary! {
        "Type" => "Font",
        "Encoding" => Object::Name(encoding.to_vec()),
    };
    match font.get_font_encoding(&Document::new()) {
        Ok(Encoding::OneByteEncoding(table)) => {
            Some(table.map(|unit| unit.and_then(|unit| char::from_u32(u32::from(unit)))))
        }
        _ => None,
    }
}

fn standard_table() -> &'static EncodingTable {
    static TABLE: OnceLock<EncodingTable> = OnceLock::new();
    TABLE.get_or_init(|| base_encoding(b"StandardEncoding").unwrap_or([None; 256]))
}

fn win_ansi_table() -> &'static EncodingTable {
    static TABLE: OnceLock<EncodingTable> = OnceLock::new();
    TABLE.get_or_init(|| base_encoding(b"WinAnsiEncoding").unwrap_or([None; 256]))
}

/// Character for a WinAnsiEncoding byte.
pub fn win_ansi_char(code: u8) -> Option<char> {
    win_ansi_table()[usize::from(code)]
}

/// WinAnsiEncoding byte for `ch`, the lowest when there are several.
pub fn win_ansi_code(ch: char) -> Option<u8> {
    win_ansi_table()
        .iter()
        .position(|entry| *entry == Some(ch))
        .and_then(|code| u8::try_from(code).ok())
}

/// Unicode for an Adobe glyph name: the named glyphs of the Adobe Glyph List
/// plus the `uniXXXX` and `uXXXX[XX]` forms. Suffixes after `.` are ignored.
pub fn glyph_name_to_char(glyph: &str) -> Option<char> {
    let base = glyph.split('.').next().unwrap_or_default();
    if let Some((ch, _)) = GLYPH_NAME_PAIRS.iter().find(|(_, name)| *name == base) {
        return Some(*ch);
    }

    let hex = |digits: &str| u32::from_str_radix(digits, 16).ok().and_then(char::from_u32);
    if let Some(digits) = base.strip_prefix("uni") {
        return (digits.len() == 4).then(|| hex(digits)).flatten();
    }
    if let Some(digits) = base.strip_prefix('u') {
        return (4..=6).contains(&digits.len()).then(|| hex(digits)).flatten();
    }
    None
}

/// Code-to-Unicode table of a simple font from `/Encoding`.
fn simple_encoding(doc: &Document, dict: &Dictionary, symbolic: bool) -> EncodingTable {
    let default = if symbolic {
        *win_ansi_table()
    } else {
        *standard_table()
    };

    match dict_get(doc, dict, b"Encoding") {
        Some(Object::Name(encoding)) => base_encoding(encoding).unwrap_or(default),
        Some(Object::Dictionary(encoding)) => {
            let mut table = dict_get(doc, encoding, b"BaseEncoding")
                .and_then(name)
                .and_then(base_encoding)
                .unwrap_or(default);
            if let Some(Object::Array(differences)) = dict_get(doc, encoding, b"Differences") {
                apply_differences(doc, differences, &mut table);
            }
            table
        }
        _ => default,
    }
}

fn apply_differences(doc: &Document, differences: &[Object], table: &mut EncodingTable) {
    let mut code = 0usize;
    for item in differences {
        match resolve(doc, item) {
            Object::Integer(start) => code = (*start).clamp(0, 255) as usize,
            Object::Name(glyph) => {
                if let Some(slot) = table.get_mut(code) {
                    *slot = glyph_name_to_char(&String::from_utf8_lossy(glyph));
                }
                code += 1;
            }
            _ => {}
        }
    }
}

/// Parse a CID font `/W` array: `c [w1 w2 ...]` and `c_first c_last w` forms.
/// Listed widths go into `widths`; ranges stay ranges.
fn parse_cid_widths(
    doc: &Document,
    w: &[Object],
    widths: &mut HashMap<u32, f32>,
    ranges: &mut Vec<(u32, u32, f32)>,
) {
    let mut items = w.iter().map(|item| resolve(doc, item));
    while let Some(first) = items.next() {
        let Some(start) = number(first) else {
            continue;
        };
        let start = start.max(0.0) as u32;
        match items.next() {
            Some(Object::Array(list)) => {
                for (offset, width) in list.iter().enumerate() {
                    if let Some(width) = number(resolve(doc, width)) {
                        widths.insert(start.saturating_add(offset as u32), width);
                    }
                }
            }
            Some(last) => {
                let (Some(end), Some(width)) = (number(last), items.next().and_then(number)) else {
                    continue;
                };
                let end = end.max(0.0) as u32;
                if end >= start {
                    ranges.push((start, end, width));
                }
            }
            None => break,
        }
    }
}

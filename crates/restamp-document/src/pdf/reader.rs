// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open existing PDF documents with `lopdf`, sniff the format,
// and expose the page tree, media boxes, inherited resources, and content
// streams the extractor and applier work on.

use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use restamp_core::error::{RestampError, Result};
use tracing::{debug, info, instrument, warn};

use crate::geometry::Rect;

/// How far into the file the `%PDF-` header may appear.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Depth limit when walking `/Parent` chains for inherited attributes.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// US Letter, used when a page has no usable media box.
pub const DEFAULT_MEDIA_BOX: Rect = Rect {
    min_x: 0.0,
    max_x: 612.0,
    min_y: 0.0,
    max_y: 792.0,
};

/// An opened PDF document.
///
/// Owns the parsed `lopdf::Document`; dropping the reader releases it.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let data = std::fs::read(path_ref)?;
        let mut reader = Self::from_bytes(&data)?;
        reader.source_path = Some(path_ref.display().to_string());
        Ok(reader)
    }

    /// Create a reader from raw PDF bytes already in memory.
    ///
    /// Bytes without a `%PDF-` header are rejected as `UnsupportedFormat`;
    /// bytes with a header that fail to parse are `CorruptInput`.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if !has_pdf_header(data) {
            return Err(RestampError::UnsupportedFormat(
                "input does not start with a %PDF- header".into(),
            ));
        }

        let document = Document::load_mem(data).map_err(|err| {
            RestampError::CorruptInput(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self {
            document,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Return the source path if the reader was created via [`PdfReader::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// Page object ids in page-tree order, paired with their 0-based index.
    pub fn pages(&self) -> Vec<(usize, ObjectId)> {
        // lopdf pages are keyed by 1-indexed page number.
        self.document
            .get_pages()
            .into_iter()
            .map(|(number, id)| (number as usize - 1, id))
            .collect()
    }

    /// Media box of the page at `page_index`, or `None` past the last page.
    pub fn media_box(&self, page_index: usize) -> Option<Rect> {
        let (_, page_id) = self.pages().into_iter().nth(page_index)?;
        Some(page_media_box(&self.document, page_id))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    // -- Output ---------------------------------------------------------------

    /// Serialise the (possibly modified) document.
    #[instrument(skip(self))]
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.document.save_to(&mut output).map_err(|err| {
            RestampError::RenderFailure(format!("failed to serialise PDF: {}", err))
        })?;

        debug!(output_bytes = output.len(), "PDF serialised");
        Ok(output)
    }
}

/// Whether `data` carries a `%PDF-` header within the search window.
pub fn has_pdf_header(data: &[u8]) -> bool {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}

// -- Object helpers ------------------------------------------------------------

static NULL: Object = Object::Null;

/// Follow indirect references until a direct object is reached.
///
/// Dangling references resolve to `null`, as PDF readers are required to do.
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    let mut current = object;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        match current {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(target) => current = target,
                Err(err) => {
                    warn!(?id, %err, "Cannot resolve reference");
                    return &NULL;
                }
            },
            _ => return current,
        }
    }
    current
}

/// Resolve `object` and view it as a dictionary (stream dictionaries included).
pub(crate) fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, object) {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Look up `key` in `dict` and resolve the value.
pub(crate) fn dict_get<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().map(|value| resolve(doc, value))
}

/// Integer or real operand as `f32`.
pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Name object contents.
pub(crate) fn name(object: &Object) -> Option<&[u8]> {
    match object {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

/// Walk the page and its ancestors for an inheritable attribute.
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = node.get(b"Parent").ok()?;
        node = resolve_dict(doc, parent)?;
    }
    None
}

/// Resource dictionary in effect for a page (inherited from the page tree).
pub(crate) fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    match inherited(doc, page_id, b"Resources")? {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Media box of a page, defaulting to US Letter when absent or malformed.
pub(crate) fn page_media_box(doc: &Document, page_id: ObjectId) -> Rect {
    let values: Option<Vec<f32>> = match inherited(doc, page_id, b"MediaBox") {
        Some(Object::Array(items)) => items.iter().map(|item| number(resolve(doc, item))).collect(),
        _ => None,
    };

    match values.as_deref() {
        Some([x0, y0, x1, y1]) => Rect::from_corners(*x0, *y0, *x1, *y1),
        _ => {
            warn!(?page_id, "Page has no usable /MediaBox, assuming US Letter");
            DEFAULT_MEDIA_BOX
        }
    }
}

/// Decoded bytes of every content stream of a page, joined by newlines.
pub(crate) fn page_content(doc: &Document, page_id: ObjectId) -> Vec<u8> {
    let mut content = Vec::new();
    for stream_id in doc.get_page_contents(page_id) {
        let Ok(Object::Stream(stream)) = doc.get_object(stream_id) else {
            warn!(?stream_id, "Content entry is not a stream");
            continue;
        };
        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        content.extend_from_slice(&data);
        content.push(b'\n');
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testing::{FixtureLine, build_pdf};

    #[test]
    fn rejects_non_pdf_bytes() {
        let err = PdfReader::from_bytes(b"plain text, not a document").err().unwrap();
        assert!(matches!(err, RestampError::UnsupportedFormat(_)));
    }

    #[test]
    fn rejects_truncated_pdf_as_corrupt() {
        let err = PdfReader::from_bytes(b"%PDF-1.5\n1 0 obj << /Type").err().unwrap();
        assert!(matches!(err, RestampError::CorruptInput(_)));
    }

    #[test]
    fn header_may_follow_leading_junk() {
        let mut data = b"\xef\xbb\xbfjunk".to_vec();
        data.extend_from_slice(b"%PDF-1.7");
        assert!(has_pdf_header(&data));
        assert!(!has_pdf_header(b"%PD"));
    }

    #[test]
    fn reads_pages_and_media_box() {
        let bytes = build_pdf(&[vec![FixtureLine::new("Hello", 72.0, 700.0)]]);
        let reader = PdfReader::from_bytes(&bytes).unwrap();
        assert_eq!(reader.page_count(), 1);
        assert_eq!(reader.pages()[0].0, 0);
        assert_eq!(reader.media_box(0), Some(DEFAULT_MEDIA_BOX));
        assert_eq!(reader.media_box(1), None);
    }

    #[test]
    fn open_reads_from_disk() {
        let bytes = build_pdf(&[vec![FixtureLine::new("On disk", 72.0, 700.0)]]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.pdf");
        std::fs::write(&path, &bytes).unwrap();

        let reader = PdfReader::open(&path).unwrap();
        assert_eq!(reader.page_count(), 1);
        assert!(reader.source_path().unwrap().ends_with("cv.pdf"));
    }
}

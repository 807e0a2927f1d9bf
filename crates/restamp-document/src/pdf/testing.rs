// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory PDF fixtures for tests and benches.
//
// Every page carries three fonts: `/F1` is base-14 Helvetica with
// WinAnsiEncoding, `/F2` is an "embedded subset" that only has glyphs for
// lowercase ASCII letters and the space, and `/F3` is Times-Roman written as
// a direct dictionary inside the resources.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

/// A single `Tj` to place on a fixture page.
#[derive(Debug, Clone)]
pub struct FixtureLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub font: &'static str,
}

impl FixtureLine {
    pub fn new(text: &str, x: f32, y: f32) -> Self {
        Self {
            text: text.to_string(),
            x,
            y,
            size: 12.0,
            font: "F1",
        }
    }

    pub fn sized(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn in_subset_font(mut self) -> Self {
        self.font = "F2";
        self
    }

    fn operations(&self) -> Vec<Operation> {
        vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![self.font.into(), self.size.into()]),
            Operation::new("Td", vec![self.x.into(), self.y.into()]),
            Operation::new("Tj", vec![Object::string_literal(self.text.as_str())]),
            Operation::new("ET", vec![]),
        ]
    }
}

/// A US Letter document with one page per entry of `pages`.
pub fn build_pdf(pages: &[Vec<FixtureLine>]) -> Vec<u8> {
    build_pdf_sized(pages, 612.0, 792.0)
}

/// Like [`build_pdf`] with a custom media box.
pub fn build_pdf_sized(pages: &[Vec<FixtureLine>], width: f32, height: f32) -> Vec<u8> {
    let contents: Vec<Vec<u8>> = pages
        .iter()
        .map(|lines| {
            let content: Content<Vec<Operation>> = Content {
                operations: lines.iter().flat_map(FixtureLine::operations).collect(),
            };
            content.encode().unwrap()
        })
        .collect();
    assemble(&contents, width, height)
}

/// A single Letter page whose content stream is `content` verbatim.
pub fn build_pdf_with_content(content: &[u8]) -> Vec<u8> {
    assemble(&[content.to_vec()], 612.0, 792.0)
}

/// A document whose page tree has no pages at all.
pub fn empty_pdf() -> Vec<u8> {
    assemble(&[], 612.0, 792.0)
}

fn assemble(contents: &[Vec<u8>], width: f32, height: f32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let resources_id = add_resources(&mut doc);

    let kids: Vec<Object> = contents
        .iter()
        .map(|content| {
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.clone()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            });
            Object::Reference(page_id)
        })
        .collect();

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut output = Vec::new();
    doc.save_to(&mut output).unwrap();
    output
}

fn add_resources(doc: &mut Document) -> ObjectId {
    let helvetica_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    // Glyphs only for ' ' and 'a'..='z'.
    let widths: Vec<Object> = (32u8..=126)
        .map(|code| match code {
            b' ' => 278.into(),
            b'a'..=b'z' => 500.into(),
            _ => 0.into(),
        })
        .collect();
    let font_file_id = doc.add_object(Stream::new(dictionary! {}, b"not a real font program".to_vec()));
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => "ABCDEF+Subset",
        "Flags" => 32,
        "Ascent" => 700,
        "Descent" => -200,
        "FontFile2" => font_file_id,
    });
    let subset_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "TrueType",
        "BaseFont" => "ABCDEF+Subset",
        "Encoding" => "WinAnsiEncoding",
        "FirstChar" => 32,
        "LastChar" => 126,
        "Widths" => widths,
        "FontDescriptor" => descriptor_id,
    });

    doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => helvetica_id,
            "F2" => subset_id,
            "F3" => dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Times-Roman",
                "Encoding" => "WinAnsiEncoding",
            },
        },
    })
}

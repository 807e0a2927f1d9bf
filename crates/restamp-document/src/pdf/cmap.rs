// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ToUnicode CMaps.
//
// The CMap program is tokenised by lopdf's content parser: every CMap keyword
// is an operator, so `endbfchar` and `endbfrange` arrive with their entries as
// operands. Ranges are kept as ranges and resolved per lookup, so a CMap that
// maps the whole 4-byte code space costs one entry.

use std::collections::HashMap;

use encoding_rs::UTF_16BE;
use lopdf::Object;
use lopdf::content::Content;
use tracing::warn;

#[derive(Debug, Clone)]
enum RangeTarget {
    /// UTF-16BE bytes for the first code; the last unit counts up.
    Incrementing(Vec<u8>),
    /// One UTF-16BE string per code, starting at the range's low code.
    Listed(Vec<Vec<u8>>),
}

#[derive(Debug, Clone)]
struct BfRange {
    lo: u32,
    hi: u32,
    target: RangeTarget,
}

/// Character code to Unicode mappings from a font's `/ToUnicode` stream.
#[derive(Debug, Clone, Default)]
pub struct ToUnicodeMap {
    chars: HashMap<u32, String>,
    ranges: Vec<BfRange>,
}

impl ToUnicodeMap {
    /// Parse the `bfchar` and `bfrange` sections of a CMap program.
    /// Unparseable input yields an empty map.
    pub fn parse(data: &[u8]) -> Self {
        let mut map = Self::default();
        let content = match Content::decode(data) {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "ToUnicode CMap could not be tokenised");
                return map;
            }
        };

        for operation in &content.operations {
            match operation.operator.as_str() {
                "endbfchar" => {
                    for pair in operation.operands.chunks_exact(2) {
                        if let (Some(code), Object::String(dst, _)) = (code_of(&pair[0]), &pair[1]) {
                            map.chars.insert(code, utf16_to_string(dst));
                        }
                    }
                }
                "endbfrange" => {
                    for entry in operation.operands.chunks_exact(3) {
                        let (Some(lo), Some(hi)) = (code_of(&entry[0]), code_of(&entry[1])) else {
                            continue;
                        };
                        if hi < lo {
                            continue;
                        }
                        let target = match &entry[2] {
                            Object::String(dst, _) => RangeTarget::Incrementing(dst.clone()),
                            Object::Array(items) => RangeTarget::Listed(
                                items
                                    .iter()
                                    .filter_map(|item| match item {
                                        Object::String(dst, _) => Some(dst.clone()),
                                        _ => None,
                                    })
                                    .collect(),
                            ),
                            _ => continue,
                        };
                        map.ranges.push(BfRange { lo, hi, target });
                    }
                }
                _ => {}
            }
        }

        if map.is_empty() {
            warn!("ToUnicode CMap contained no usable mappings");
        }
        map
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty() && self.ranges.is_empty()
    }

    /// Unicode text for `code`. Single mappings win over ranges.
    pub fn get(&self, code: u32) -> Option<String> {
        if let Some(text) = self.chars.get(&code) {
            return Some(text.clone());
        }
        self.ranges
            .iter()
            .find(|range| (range.lo..=range.hi).contains(&code))
            .and_then(|range| {
                let offset = code - range.lo;
                match &range.target {
                    RangeTarget::Incrementing(base) => {
                        Some(utf16_to_string(&bump_last_unit(base, offset)))
                    }
                    RangeTarget::Listed(items) => {
                        items.get(offset as usize).map(|dst| utf16_to_string(dst))
                    }
                }
            })
    }

    /// The lowest code that decodes to exactly `ch`.
    pub fn code_for(&self, ch: char) -> Option<u32> {
        let mut buf = [0u16; 2];
        let wanted: Vec<u8> = ch
            .encode_utf16(&mut buf)
            .iter()
            .flat_map(|unit| unit.to_be_bytes())
            .collect();

        let single = self
            .chars
            .iter()
            .filter(|(_, text)| text.chars().eq(std::iter::once(ch)))
            .map(|(code, _)| *code);

        let ranged = self.ranges.iter().filter_map(|range| match &range.target {
            RangeTarget::Incrementing(base) => {
                let split = base.len().checked_sub(2)?;
                if wanted.len() != base.len() || wanted[..split] != base[..split] {
                    return None;
                }
                let first = u16::from_be_bytes([base[split], base[split + 1]]);
                let target = u16::from_be_bytes([wanted[split], wanted[split + 1]]);
                let offset = u32::from(target.wrapping_sub(first));
                (offset <= range.hi - range.lo).then(|| range.lo + offset)
            }
            RangeTarget::Listed(items) => items
                .iter()
                .position(|dst| *dst == wanted)
                .and_then(|index| u32::try_from(index).ok())
                .filter(|offset| *offset <= range.hi - range.lo)
                .map(|offset| range.lo + offset),
        });

        let text = ch.to_string();
        single
            .chain(ranged)
            .filter(|code| self.get(*code).as_deref() == Some(text.as_str()))
            .min()
    }
}

/// A source code operand: a 1 to 4 byte string.
fn code_of(object: &Object) -> Option<u32> {
    match object {
        Object::String(bytes, _) if (1..=4).contains(&bytes.len()) => Some(
            bytes
                .iter()
                .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte)),
        ),
        _ => None,
    }
}

fn bump_last_unit(base: &[u8], offset: u32) -> Vec<u8> {
    let mut bytes = base.to_vec();
    if let Some(split) = bytes.len().checked_sub(2) {
        let last = u16::from_be_bytes([bytes[split], bytes[split + 1]]);
        let bumped = last.wrapping_add(offset as u16);
        bytes[split..].copy_from_slice(&bumped.to_be_bytes());
    }
    bytes
}

fn utf16_to_string(bytes: &[u8]) -> String {
    let (text, _) = UTF_16BE.decode_without_bom_handling(bytes);
    text.into_owned()
}

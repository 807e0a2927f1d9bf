// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text sanitisation before drawing.

use crate::pdf::fonts::FontFace;

/// Drop every character `face` cannot draw. Order is preserved.
pub fn sanitize_for_font(face: &FontFace, text: &str) -> String {
    text.chars().filter(|ch| face.can_render(*ch)).collect()
}

/// Restrict `text` to printable ASCII, mapping bullets to hyphens first.
///
/// Used by the fallback paginator, whose built-in font is only trusted for
/// the ASCII range.
pub fn sanitize_ascii(text: &str) -> String {
    text.chars()
        .map(|ch| if ch == '\u{2022}' { '-' } else { ch })
        .filter(|ch| (' '..='~').contains(ch))
        .collect()
}

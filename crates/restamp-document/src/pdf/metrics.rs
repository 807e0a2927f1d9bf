// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Glyph advance widths for the standard 14 fonts we rely on, in 1/1000 em.
//
// Helvetica values are taken from the Adobe Core14 AFM. Times and the other
// proportional standard fonts borrow the Helvetica table; Courier is fixed
// pitch.

/// Helvetica advance widths for ASCII 32..=126.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a..m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n..z
    334, 260, 334, 584, // {..~
];

/// Width used for characters the tables do not list.
const DEFAULT_WIDTH: u16 = 556;

/// Helvetica advance width of `ch` in 1/1000 em.
pub fn helvetica_width(ch: char) -> u16 {
    let code = ch as u32;
    if (32..=126).contains(&code) {
        return HELVETICA_ASCII[(code - 32) as usize];
    }
    match ch {
        '\u{a0}' => 278,
        '\u{2022}' => 350,
        '\u{2013}' => 556,
        '\u{2014}' => 1000,
        '\u{2018}' | '\u{2019}' | '\u{201a}' => 222,
        '\u{201c}' | '\u{201d}' | '\u{201e}' => 333,
        '\u{2026}' => 1000,
        '\u{20ac}' => 556,
        '\u{2122}' => 1000,
        '\u{a9}' | '\u{ae}' => 737,
        '\u{b0}' => 400,
        _ => DEFAULT_WIDTH,
    }
}

/// Width of `text` in Helvetica at `size` points.
pub fn helvetica_string_width(text: &str, size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(helvetica_width(c))).sum();
    units as f32 / 1000.0 * size
}

/// Advance width of `ch` for a standard-14 font identified by its base name.
///
/// Subset prefixes (`ABCDEF+`) are ignored.
pub fn standard_width(base_font: &str, ch: char) -> u16 {
    let name = strip_subset_prefix(base_font);
    if name.starts_with("Courier") {
        600
    } else {
        helvetica_width(ch)
    }
}

/// Whether `base_font` names one of the standard 14 fonts.
pub fn is_standard_font(base_font: &str) -> bool {
    matches!(
        strip_subset_prefix(base_font),
        "Helvetica"
            | "Helvetica-Bold"
            | "Helvetica-Oblique"
            | "Helvetica-BoldOblique"
            | "Times-Roman"
            | "Times-Bold"
            | "Times-Italic"
            | "Times-BoldItalic"
            | "Courier"
            | "Courier-Bold"
            | "Courier-Oblique"
            | "Courier-BoldOblique"
            | "Symbol"
            | "ZapfDingbats"
    )
}

fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((prefix, rest)) if prefix.len() == 6 => rest,
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_helvetica_widths() {
        assert_eq!(helvetica_width(' '), 278);
        assert_eq!(helvetica_width('A'), 667);
        assert_eq!(helvetica_width('W'), 944);
        assert_eq!(helvetica_width('i'), 222);
        assert_eq!(helvetica_width('~'), 584);
    }

    #[test]
    fn string_width_scales_with_size() {
        let at_ten = helvetica_string_width("Hello", 10.0);
        let at_twenty = helvetica_string_width("Hello", 20.0);
        assert!((at_twenty - 2.0 * at_ten).abs() < 1e-4);
        // H e l l o = 722 + 556 + 222 + 222 + 556
        assert!((at_ten - 22.78).abs() < 1e-3);
    }

    #[test]
    fn courier_is_fixed_pitch() {
        assert_eq!(standard_width("Courier-Bold", 'i'), 600);
        assert_eq!(standard_width("ABCDEF+Courier", 'W'), 600);
        assert!(is_standard_font("ABCDEF+Helvetica"));
        assert!(!is_standard_font("Calibri"));
    }
}

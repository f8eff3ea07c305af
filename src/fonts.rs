//! Font metrics and text fitting.
//!
//! Labels are drawn with the PDF built-in Helvetica, so the default metrics
//! are Helvetica's advance widths. A TTF face can be loaded with `ttf-parser`
//! for backends that rasterise real glyphs; its advances then replace the
//! built-in table for that weight.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{LabelError, Result};

/// Marker appended to truncated text.
pub const ELLIPSIS: &str = "\u{2026}";

/// Helvetica advance widths (1/1000 em) for ASCII 0x20..=0x7E.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Helvetica-Bold advance widths (1/1000 em) for ASCII 0x20..=0x7E.
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

/// Font weight used by the label templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weight {
    Regular,
    Bold,
}

/// A loaded TTF/OTF face.
#[derive(Clone)]
struct FontData {
    /// Raw font bytes (kept alive for ttf-parser's zero-copy API).
    bytes: Vec<u8>,
    units_per_em: f32,
}

/// Per-weight font faces with a built-in Helvetica fallback.
#[derive(Clone, Default)]
pub struct FontManager {
    faces: HashMap<Weight, FontData>,
}

impl FontManager {
    /// Metrics of the built-in Helvetica only.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Load a TTF/OTF face for `weight`.
    pub fn load_font(&mut self, weight: Weight, bytes: Vec<u8>) -> Result<()> {
        let face = ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| LabelError::Font(format!("Failed to parse font: {e}")))?;
        let units_per_em = face.units_per_em() as f32;
        self.faces.insert(weight, FontData { bytes, units_per_em });
        Ok(())
    }

    /// Face used for `weight`: its own, else the regular face. Bold text
    /// falls back to the regular face so metrics track what gets painted.
    fn face(&self, weight: Weight) -> Option<&FontData> {
        self.faces
            .get(&weight)
            .or_else(|| self.faces.get(&Weight::Regular))
    }

    pub fn has_real_fonts(&self) -> bool {
        !self.faces.is_empty()
    }

    /// Font bytes for glyph rasterisation.
    pub fn font_bytes(&self, weight: Weight) -> Option<&[u8]> {
        self.face(weight).map(|d| d.bytes.as_slice())
    }

    /// Measure the advance width of `text` at `font_size`. The result is in
    /// the same unit as `font_size`.
    pub fn measure_text_width(&self, text: &str, font_size: f32, weight: Weight) -> f32 {
        if let Some(data) = self.face(weight) {
            if let Ok(face) = ttf_parser::Face::parse(&data.bytes, 0) {
                let scale = font_size / data.units_per_em;
                return text
                    .chars()
                    .map(|ch| match face.glyph_index(ch) {
                        Some(gid) => face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale,
                        None => font_size * 0.5,
                    })
                    .sum();
            }
        }

        let units: u32 = text.chars().map(|ch| builtin_advance(ch, weight) as u32).sum();
        units as f32 * font_size / 1000.0
    }
}

fn builtin_advance(ch: char, weight: Weight) -> u16 {
    let table = match weight {
        Weight::Regular => &HELVETICA_WIDTHS,
        Weight::Bold => &HELVETICA_BOLD_WIDTHS,
    };
    match ch {
        ' '..='~' => table[ch as usize - 0x20],
        '\u{2026}' => 1000,
        '\u{00A0}' => 278,
        _ => 556,
    }
}

/// Result of fitting a string into a maximum width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextFit {
    pub text: String,
    pub width: f32,
}

/// Truncate `text` with a trailing ellipsis until it fits `max_width`.
///
/// Returns the original text when it already fits, otherwise the longest
/// prefix + ellipsis that fits, or the bare ellipsis when no prefix does.
/// A non-positive `max_width` yields an empty string.
pub fn fit_text<F>(text: &str, max_width: f32, measure: F) -> TextFit
where
    F: Fn(&str) -> f32,
{
    if max_width <= 0.0 {
        return TextFit {
            text: String::new(),
            width: 0.0,
        };
    }

    let width = measure(text);
    if width <= max_width {
        return TextFit {
            text: text.to_string(),
            width,
        };
    }

    // Byte offset just past each char; prefix `k` is `text[..ends[k - 1]]`.
    let ends: Vec<usize> = text.char_indices().map(|(i, c)| i + c.len_utf8()).collect();
    let candidate = |k: usize| format!("{}{ELLIPSIS}", &text[..ends[k - 1]]);

    // Widths grow with prefix length, so binary-search the longest proper
    // prefix whose truncated form fits.
    let (mut lo, mut hi) = (0usize, ends.len().saturating_sub(1));
    let mut best: Option<TextFit> = None;
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        let text = candidate(mid);
        let width = measure(&text);
        if width <= max_width {
            best = Some(TextFit { text, width });
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }

    best.unwrap_or_else(|| TextFit {
        text: ELLIPSIS.to_string(),
        width: measure(ELLIPSIS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn per_char(s: &str) -> f32 {
        s.chars().count() as f32
    }

    #[test]
    fn builtin_text_width() {
        let mgr = FontManager::builtin();
        // H + e + l + l + o = 722 + 556 + 222 + 222 + 556 = 2278 units
        let w = mgr.measure_text_width("Hello", 10.0, Weight::Regular);
        assert!((w - 22.78).abs() < 0.001, "got {w}");
    }

    #[test]
    fn bold_is_wider() {
        let mgr = FontManager::builtin();
        let regular = mgr.measure_text_width("label", 10.0, Weight::Regular);
        let bold = mgr.measure_text_width("label", 10.0, Weight::Bold);
        assert!(bold > regular);
    }

    #[test]
    fn invalid_font_bytes_are_rejected() {
        let mut mgr = FontManager::builtin();
        assert!(mgr.load_font(Weight::Regular, vec![0, 1, 2, 3]).is_err());
        assert!(!mgr.has_real_fonts());
    }

    #[test]
    fn fitting_text_is_unchanged() {
        let fit = fit_text("abc", 3.0, per_char);
        assert_eq!(fit.text, "abc");
        assert_eq!(fit.width, 3.0);
    }

    #[test]
    fn long_text_gets_longest_prefix() {
        let fit = fit_text("abcdefgh", 5.0, per_char);
        assert_eq!(fit.text, "abcd\u{2026}");
        assert_eq!(fit.width, 5.0);
    }

    #[test]
    fn nothing_fits_yields_ellipsis() {
        let fit = fit_text("abcdefgh", 0.5, per_char);
        assert_eq!(fit.text, ELLIPSIS);
    }

    #[test]
    fn non_positive_width_yields_empty() {
        let fit = fit_text("abc", 0.0, per_char);
        assert_eq!(fit.text, "");
        assert_eq!(fit.width, 0.0);
        assert_eq!(fit_text("abc", -2.0, per_char).text, "");
    }

    #[test]
    fn long_text_needs_few_measurements() {
        let text = "x".repeat(100_000);
        let calls = std::cell::Cell::new(0usize);
        let fit = fit_text(&text, 10.0, |s| {
            calls.set(calls.get() + 1);
            per_char(s)
        });
        assert_eq!(fit.text, format!("{}\u{2026}", "x".repeat(9)));
        assert!(calls.get() < 40, "{} measurements", calls.get());
    }

    #[test]
    fn multibyte_prefixes_stay_on_char_boundaries() {
        let fit = fit_text("\u{e9}t\u{e9} \u{e0} la plage", 4.0, per_char);
        assert_eq!(fit.text, "\u{e9}t\u{e9}\u{2026}");
    }

    #[test]
    fn refitting_is_a_no_op() {
        let mgr = FontManager::builtin();
        let measure = |s: &str| mgr.measure_text_width(s, 8.0, Weight::Bold);
        for width in [0.5, 5.0, 20.0, 40.0, 400.0] {
            let text = "Organic extra virgin olive oil, cold pressed 750ml";
            let once = fit_text(text, width, measure);
            let twice = fit_text(&once.text, width, measure);
            assert_eq!(once, twice, "width {width}");
        }
    }
}

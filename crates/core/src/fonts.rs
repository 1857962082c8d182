//! Font families and text measurement
//!
//! Text is measured with the advance widths of the standard PDF base fonts,
//! so what the editor lays out on screen matches what the export draws.

use pdf_engine::StandardFont;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    Helvetica,
    Times,
    Courier,
}

impl FontFamily {
    /// Recognizes the family names the editor offers, plus common aliases.
    pub fn parse(name: &str) -> Option<FontFamily> {
        match name.trim().to_ascii_lowercase().as_str() {
            "helvetica" | "arial" | "sans-serif" => Some(FontFamily::Helvetica),
            "times" | "times-roman" | "times new roman" | "serif" => Some(FontFamily::Times),
            "courier" | "courier new" | "monospace" => Some(FontFamily::Courier),
            _ => None,
        }
    }

    /// Like [`FontFamily::parse`], falling back to Helvetica.
    pub fn resolve(name: &str) -> FontFamily {
        Self::parse(name).unwrap_or_else(|| {
            tracing::debug!(family = name, "unknown font family, using Helvetica");
            FontFamily::Helvetica
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            FontFamily::Helvetica => "Helvetica",
            FontFamily::Times => "Times",
            FontFamily::Courier => "Courier",
        }
    }

    pub fn standard_font(self, bold: bool, italic: bool) -> StandardFont {
        match (self, bold, italic) {
            (FontFamily::Helvetica, false, false) => StandardFont::Helvetica,
            (FontFamily::Helvetica, true, false) => StandardFont::HelveticaBold,
            (FontFamily::Helvetica, false, true) => StandardFont::HelveticaOblique,
            (FontFamily::Helvetica, true, true) => StandardFont::HelveticaBoldOblique,
            (FontFamily::Times, false, false) => StandardFont::TimesRoman,
            (FontFamily::Times, true, false) => StandardFont::TimesBold,
            (FontFamily::Times, false, true) => StandardFont::TimesItalic,
            (FontFamily::Times, true, true) => StandardFont::TimesBoldItalic,
            (FontFamily::Courier, false, false) => StandardFont::Courier,
            (FontFamily::Courier, true, false) => StandardFont::CourierBold,
            (FontFamily::Courier, false, true) => StandardFont::CourierOblique,
            (FontFamily::Courier, true, true) => StandardFont::CourierBoldOblique,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    pub family: FontFamily,
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
}

pub trait FontMetrics {
    /// Advance width of `ch` in thousandths of an em.
    fn advance(&self, family: FontFamily, bold: bool, ch: char) -> u16;

    /// Width of a single line of text at `spec.size`.
    fn line_width(&self, line: &str, spec: &FontSpec) -> f32 {
        let units: u32 =
            line.chars().map(|ch| self.advance(spec.family, spec.bold, ch) as u32).sum();
        units as f32 * spec.size / 1000.0
    }
}

/// Metrics from the AFM tables of the standard base fonts.
///
/// Italic faces share the upright advances; Times bold is measured with the
/// Times-Roman table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFontMetrics;

// Advances for U+0020 ..= U+007E.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // A..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333,
    500, 278, 556, 500, 722, 500, 500, 500, // a..z
    334, 260, 334, 584, // {..~
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, //
    333, 333, 584, 584, 584, 611, 975, //
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, //
    333, 278, 333, 584, 556, 333, //
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389,
    556, 333, 611, 556, 778, 556, 556, 500, //
    389, 280, 389, 584, //
];

const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278, //
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, //
    278, 278, 564, 564, 564, 444, 921, //
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722, 556, 722, 667,
    556, 611, 722, 722, 944, 722, 722, 611, //
    333, 278, 333, 469, 500, 333, //
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500, 500, 500, 333,
    389, 278, 500, 500, 722, 500, 500, 444, //
    480, 200, 480, 541, //
];

const COURIER_ADVANCE: u16 = 600;

fn table_lookup(table: &[u16; 95], ch: char, fallback: u16) -> u16 {
    let code = ch as u32;
    if (0x20..=0x7e).contains(&code) {
        table[(code - 0x20) as usize]
    } else {
        fallback
    }
}

impl FontMetrics for StandardFontMetrics {
    fn advance(&self, family: FontFamily, bold: bool, ch: char) -> u16 {
        match (family, bold) {
            (FontFamily::Helvetica, false) => table_lookup(&HELVETICA, ch, 556),
            (FontFamily::Helvetica, true) => table_lookup(&HELVETICA_BOLD, ch, 556),
            (FontFamily::Times, _) => table_lookup(&TIMES_ROMAN, ch, 500),
            (FontFamily::Courier, _) => COURIER_ADVANCE,
        }
    }
}

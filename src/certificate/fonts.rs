//! Standard PDF base fonts and their glyph widths.
//!
//! Widths are in 1/1000 em for the printable ASCII range (32..=126) and come
//! from the Adobe font metrics shipped with every PDF reader, so measured
//! widths match what the reader draws.

/// Printable ASCII range covered by the width tables.
const FIRST_CHAR: u32 = 32;
const LAST_CHAR: u32 = 126;

#[rustfmt::skip]
const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    278, 278, 564, 564, 564, 444, 921,
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889,
    722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
    333, 278, 333, 469, 500, 333,
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778,
    500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
    480, 200, 480, 541,
];

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    278, 278, 584, 584, 584, 556, 1015,
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    278, 278, 278, 469, 556, 333,
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
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

/// Base fonts used by the certificate template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontFace {
    TimesRoman,
    Helvetica,
    HelveticaBoldOblique,
}

impl FontFace {
    pub const ALL: [FontFace; 3] = [
        FontFace::TimesRoman,
        FontFace::Helvetica,
        FontFace::HelveticaBoldOblique,
    ];

    /// PostScript name written into the PDF font dictionary.
    pub fn base_font(&self) -> &'static str {
        match self {
            FontFace::TimesRoman => "Times-Roman",
            FontFace::Helvetica => "Helvetica",
            FontFace::HelveticaBoldOblique => "Helvetica-BoldOblique",
        }
    }

    /// Name of the font in the page resource dictionary.
    pub fn resource_name(&self) -> &'static str {
        match self {
            FontFace::TimesRoman => "F1",
            FontFace::Helvetica => "F2",
            FontFace::HelveticaBoldOblique => "F3",
        }
    }

    fn widths(&self) -> &'static [u16; 95] {
        match self {
            FontFace::TimesRoman => &TIMES_ROMAN,
            FontFace::Helvetica => &HELVETICA,
            // Oblique glyphs share the upright bold advance widths.
            FontFace::HelveticaBoldOblique => &HELVETICA_BOLD,
        }
    }

    /// Advance width of `ch` in 1/1000 em. Characters outside the table use
    /// the width of `n`.
    pub fn char_width(&self, ch: char) -> u16 {
        let code = ch as u32;
        let index = if (FIRST_CHAR..=LAST_CHAR).contains(&code) {
            code - FIRST_CHAR
        } else {
            'n' as u32 - FIRST_CHAR
        };
        self.widths()[index as usize]
    }

    /// Rendered width of `text` in points at `size`.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|ch| u32::from(self.char_width(ch))).sum();
        units as f32 * size / 1000.0
    }
}

/// Face and point size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    pub face: FontFace,
    pub size: f32,
}

impl FontSpec {
    pub const fn new(face: FontFace, size: f32) -> Self {
        Self { face, size }
    }

    pub fn text_width(&self, text: &str) -> f32 {
        self.face.text_width(text, self.size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const GRAY: Rgb = Rgb(128, 128, 128);

    /// Components scaled to the 0..=1 range PDF colour operators take.
    pub fn components(&self) -> [f32; 3] {
        [
            f32::from(self.0) / 255.0,
            f32::from(self.1) / 255.0,
            f32::from(self.2) / 255.0,
        ]
    }
}

/// Font and colour applied together to a run of fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: FontSpec,
    pub color: Rgb,
}

impl TextStyle {
    pub const fn new(face: FontFace, size: f32, color: Rgb) -> Self {
        Self {
            font: FontSpec::new(face, size),
            color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_cover_printable_ascii() {
        assert_eq!(TIMES_ROMAN.len() as u32, LAST_CHAR - FIRST_CHAR + 1);
        assert_eq!(FontFace::Helvetica.char_width('@'), 1015);
        assert_eq!(FontFace::TimesRoman.char_width('~'), 541);
        assert_eq!(FontFace::HelveticaBoldOblique.char_width('m'), 889);
    }

    #[test]
    fn test_text_width_scales_with_size() {
        let width = FontFace::Helvetica.text_width("AAAA", 10.0);
        assert!((width - 26.68).abs() < 1e-3);
        assert!((FontFace::Helvetica.text_width("AAAA", 20.0) - 2.0 * width).abs() < 1e-3);
    }

    #[test]
    fn test_unknown_characters_fall_back_to_n_width() {
        assert_eq!(
            FontFace::TimesRoman.char_width('é'),
            FontFace::TimesRoman.char_width('n')
        );
    }
}

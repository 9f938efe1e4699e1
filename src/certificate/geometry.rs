//! Fixed geometry of the two-up certificate page.
//!
//! All coordinates are PDF points measured from the top-left corner of the
//! page. Field offsets are relative to the vertical anchor of their slot.

use super::fonts::{FontFace, Rgb, TextStyle};

/// A4 portrait.
pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;

/// Vertical anchors of the two certificate slots on a page.
pub const SLOT_ANCHORS: [f32; 2] = [20.0, 445.0];
pub const SLOTS_PER_PAGE: usize = SLOT_ANCHORS.len();

/// Height of the cell a single-line field is vertically centred in.
pub const CELL_HEIGHT: f32 = 40.0;
/// Horizontal padding between a field's x and its first glyph.
pub const CELL_MARGIN: f32 = 2.83;

/// Rightmost x usable for text inside the template frame.
pub const TEXT_RIGHT_EDGE: f32 = 470.0;

/// Where the `index`-th certificate of a run lands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotPosition {
    /// Zero-based page number.
    pub page: usize,
    /// Zero-based slot on the page.
    pub slot: usize,
    /// Vertical anchor of the slot.
    pub y: f32,
}

impl SlotPosition {
    /// First slot of its page.
    pub fn opens_page(&self) -> bool {
        self.slot == 0
    }
}

/// Slot allocation depends only on the ordinal of the record.
pub fn slot_for(index: usize) -> SlotPosition {
    let slot = index % SLOTS_PER_PAGE;
    SlotPosition {
        page: index / SLOTS_PER_PAGE,
        slot,
        y: SLOT_ANCHORS[slot],
    }
}

/// Pages needed for `records` certificates.
pub fn page_count(records: usize) -> usize {
    records.div_ceil(SLOTS_PER_PAGE)
}

/// Rectangle with `dy` relative to the slot anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub x: f32,
    pub dy: f32,
    pub width: f32,
    pub height: f32,
}

impl Frame {
    pub const fn new(x: f32, dy: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            dy,
            width,
            height,
        }
    }
}

/// Text fields printed on each certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Ccf,
    SeatNo,
    Name,
    Course,
    HeldBy,
    Result,
    Gender,
    IssueDate,
    Director,
    Board,
}

/// Measurement-driven wrapping for a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WrapRule {
    /// Widest single line allowed, in points.
    pub budget: f32,
    /// Distance between wrapped lines.
    pub line_height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub field: Field,
    pub x: f32,
    pub dy: f32,
    pub style: TextStyle,
    pub wrap: Option<WrapRule>,
    /// Body fields stack vertically; a taller block pushes the ones below it down.
    pub flow: bool,
}

impl FieldSpec {
    const fn fixed(field: Field, x: f32, dy: f32, style: TextStyle) -> Self {
        Self {
            field,
            x,
            dy,
            style,
            wrap: None,
            flow: false,
        }
    }

    fn body(field: Field, x: f32, dy: f32, style: TextStyle) -> Self {
        Self {
            field,
            x,
            dy,
            style,
            wrap: Some(WrapRule {
                budget: TEXT_RIGHT_EDGE - x - 2.0 * CELL_MARGIN,
                line_height: (style.font.size * 1.1).round(),
            }),
            flow: true,
        }
    }

    /// Vertical extent a single line of this field occupies around its midline.
    pub fn line_height(&self) -> f32 {
        self.wrap
            .map(|rule| rule.line_height)
            .unwrap_or_else(|| (self.style.font.size * 1.1).round())
    }
}

const DETAIL: TextStyle = TextStyle::new(FontFace::TimesRoman, 11.0, Rgb::GRAY);
const CAPTION: TextStyle = TextStyle::new(FontFace::Helvetica, 12.0, Rgb::BLACK);
const SIGNATORY: TextStyle = TextStyle::new(FontFace::HelveticaBoldOblique, 10.0, Rgb::BLACK);

/// Template frame, auxiliary images and field anchors.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateGeometry {
    pub template: Frame,
    pub mark: Frame,
    pub signature: Frame,
    /// Fields in draw order; neighbours sharing a style are kept adjacent.
    pub fields: Vec<FieldSpec>,
    /// Style the canvas is left in after every slot.
    pub baseline: TextStyle,
}

impl TemplateGeometry {
    pub fn standard() -> Self {
        Self {
            template: Frame::new(105.0, 0.0, 390.0, 375.0),
            mark: Frame::new(272.5, 28.0, 45.0, 45.0),
            signature: Frame::new(330.0, 298.0, 90.0, 28.0),
            fields: vec![
                FieldSpec::fixed(Field::Ccf, 140.0, 75.0, DETAIL),
                FieldSpec::fixed(Field::SeatNo, 140.0, 90.0, DETAIL),
                FieldSpec::body(Field::Name, 150.0, 170.0, DETAIL),
                FieldSpec::body(Field::Course, 150.0, 200.0, DETAIL),
                FieldSpec::body(Field::HeldBy, 150.0, 230.0, CAPTION),
                FieldSpec::body(Field::Result, 150.0, 260.0, DETAIL),
                FieldSpec::fixed(Field::Gender, 130.0, 320.0, DETAIL),
                FieldSpec::fixed(Field::IssueDate, 120.0, 335.0, DETAIL),
                FieldSpec::fixed(Field::Director, 344.0, 320.0, SIGNATORY),
                FieldSpec::fixed(Field::Board, 263.0, 335.0, SIGNATORY),
            ],
            baseline: TextStyle::new(FontFace::Helvetica, 11.0, Rgb::BLACK),
        }
    }

    pub fn field(&self, field: Field) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.field == field)
    }
}

impl Default for TemplateGeometry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_alternate_and_open_pages() {
        let positions: Vec<(usize, usize, f32)> = (0..5)
            .map(slot_for)
            .map(|p| (p.page, p.slot, p.y))
            .collect();
        assert_eq!(
            positions,
            vec![
                (0, 0, 20.0),
                (0, 1, 445.0),
                (1, 0, 20.0),
                (1, 1, 445.0),
                (2, 0, 20.0)
            ]
        );
        assert!(slot_for(4).opens_page());
        assert!(!slot_for(3).opens_page());
    }

    #[test]
    fn test_page_count_rounds_up() {
        assert_eq!(page_count(0), 0);
        assert_eq!(page_count(1), 1);
        assert_eq!(page_count(2), 1);
        assert_eq!(page_count(5), 3);
    }

    #[test]
    fn test_body_fields_wrap_inside_the_frame() {
        let geometry = TemplateGeometry::standard();
        let name = geometry.field(Field::Name).unwrap();
        let rule = name.wrap.unwrap();
        assert!((name.x + rule.budget) < geometry.template.x + geometry.template.width);
        assert_eq!(rule.line_height, 12.0);
        assert!(geometry.field(Field::Ccf).unwrap().wrap.is_none());
    }

    #[test]
    fn test_both_slots_fit_on_the_page() {
        let geometry = TemplateGeometry::standard();
        let last = SLOT_ANCHORS[SLOTS_PER_PAGE - 1];
        assert!(last + geometry.template.height <= PAGE_HEIGHT);
        assert!(SLOT_ANCHORS[0] + geometry.template.height <= last);
    }
}

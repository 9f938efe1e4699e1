//! Layout engine: turns one record into the draw operations of one slot.
//!
//! The engine never paginates. It receives the slot position from the
//! assembler and only appends operations relative to that slot's anchor.

use super::fonts::{FontSpec, Rgb, TextStyle};
use super::geometry::{Field, FieldSpec, Frame, SlotPosition, TemplateGeometry, CELL_HEIGHT};
use super::narrative::{CertificateText, NarrativeContext};
use super::RenderError;
use crate::dataset::EligibleRecord;

/// Deployment switches that select which parts of the template are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutCapabilities {
    /// Place the authorising signature image above the director caption.
    pub has_signature: bool,
    /// Include the `(SEM …)` fragment in the course line.
    pub has_semester: bool,
    /// Place the institutional mark at the top of the slot.
    pub has_mark: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Template,
    Mark,
    Signature,
}

/// A single drawing instruction in page coordinates (top-left origin).
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Image {
        kind: ImageKind,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    SetFont(FontSpec),
    SetColor(Rgb),
    /// One line vertically centred in a cell of `CELL_HEIGHT` starting at `y`.
    Text {
        field: Field,
        x: f32,
        y: f32,
        text: String,
    },
    /// Left-aligned lines, the first one occupying `y..y + line_height`.
    TextBlock {
        field: Field,
        x: f32,
        y: f32,
        line_height: f32,
        lines: Vec<String>,
    },
}

/// How a field ended up on the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    SingleLine { y: f32 },
    Wrapped { y: f32, lines: usize },
}

/// Draw operations for one certificate.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotLayout {
    pub position: SlotPosition,
    pub ops: Vec<DrawOp>,
}

impl SlotLayout {
    pub fn placement(&self, field: Field) -> Option<Placement> {
        self.ops.iter().find_map(|op| match op {
            DrawOp::Text { field: f, y, .. } if *f == field => Some(Placement::SingleLine { y: *y }),
            DrawOp::TextBlock {
                field: f, y, lines, ..
            } if *f == field => Some(Placement::Wrapped {
                y: *y,
                lines: lines.len(),
            }),
            _ => None,
        })
    }

    pub fn text(&self, field: Field) -> Option<String> {
        self.ops.iter().find_map(|op| match op {
            DrawOp::Text { field: f, text, .. } if *f == field => Some(text.clone()),
            DrawOp::TextBlock { field: f, lines, .. } if *f == field => Some(lines.join(" ")),
            _ => None,
        })
    }

    /// Number of font or colour changes in the slot.
    pub fn state_changes(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::SetFont(_) | DrawOp::SetColor(_)))
            .count()
    }
}

/// Tracks the active style so only real changes are emitted.
struct StyleTracker {
    current: TextStyle,
}

impl StyleTracker {
    fn switch_to(&mut self, style: TextStyle, ops: &mut Vec<DrawOp>) {
        if self.current.font != style.font {
            ops.push(DrawOp::SetFont(style.font));
        }
        if self.current.color != style.color {
            ops.push(DrawOp::SetColor(style.color));
        }
        self.current = style;
    }
}

pub struct LayoutEngine {
    geometry: TemplateGeometry,
    capabilities: LayoutCapabilities,
}

impl LayoutEngine {
    pub fn new(geometry: TemplateGeometry, capabilities: LayoutCapabilities) -> Self {
        Self {
            geometry,
            capabilities,
        }
    }

    pub fn geometry(&self) -> &TemplateGeometry {
        &self.geometry
    }

    pub fn capabilities(&self) -> LayoutCapabilities {
        self.capabilities
    }

    /// Lay out `record` in the slot at `position`.
    ///
    /// The canvas is expected in the baseline style on entry and is returned
    /// to it on exit.
    pub fn layout_slot(
        &self,
        record: &EligibleRecord,
        context: &NarrativeContext,
        position: SlotPosition,
    ) -> Result<SlotLayout, RenderError> {
        let text = CertificateText::compose(record, context, self.capabilities.has_semester)?;
        let anchor = position.y;
        let mut ops = Vec::with_capacity(self.geometry.fields.len() * 2 + 6);

        ops.push(image_op(ImageKind::Template, &self.geometry.template, anchor));
        if self.capabilities.has_mark {
            ops.push(image_op(ImageKind::Mark, &self.geometry.mark, anchor));
        }
        if self.capabilities.has_signature {
            ops.push(image_op(ImageKind::Signature, &self.geometry.signature, anchor));
        }

        let mut style = StyleTracker {
            current: self.geometry.baseline,
        };
        // Bottom edge of the last body block and the shift carried below it.
        let mut flow_floor: Option<f32> = None;
        let mut flow_shift = 0.0_f32;

        for spec in &self.geometry.fields {
            let value = text.get(spec.field);
            if value.is_empty() {
                continue;
            }

            let mut cell_top = anchor + spec.dy + if spec.flow { flow_shift } else { 0.0 };
            let (lines, line_height) = self.fit(spec, value);
            let block_height = lines.len() as f32 * line_height;
            let midline = cell_top + CELL_HEIGHT / 2.0;
            let mut block_top = midline - block_height / 2.0;

            if spec.flow {
                if let Some(floor) = flow_floor {
                    if block_top < floor {
                        let push = floor - block_top;
                        flow_shift += push;
                        cell_top += push;
                        block_top += push;
                    }
                }
                flow_floor = Some(block_top + block_height);
            }

            style.switch_to(spec.style, &mut ops);
            match <[String; 1]>::try_from(lines) {
                Ok([line]) => ops.push(DrawOp::Text {
                    field: spec.field,
                    x: spec.x,
                    y: cell_top,
                    text: line,
                }),
                Err(lines) => {
                    log::debug!(
                        "Wrapping {:?} for seat {} into {} lines",
                        spec.field,
                        record.seat_no(),
                        lines.len()
                    );
                    ops.push(DrawOp::TextBlock {
                        field: spec.field,
                        x: spec.x,
                        y: block_top,
                        line_height,
                        lines,
                    });
                }
            }
        }

        style.switch_to(self.geometry.baseline, &mut ops);
        Ok(SlotLayout { position, ops })
    }

    /// Single line when it fits the field's budget, wrapped lines otherwise.
    fn fit(&self, spec: &FieldSpec, value: &str) -> (Vec<String>, f32) {
        let line_height = spec.line_height();
        match spec.wrap {
            Some(rule) if spec.style.font.text_width(value) > rule.budget => {
                (wrap_text(value, spec.style.font, rule.budget), rule.line_height)
            }
            _ => (vec![value.to_string()], line_height),
        }
    }
}

fn image_op(kind: ImageKind, frame: &Frame, anchor: f32) -> DrawOp {
    DrawOp::Image {
        kind,
        x: frame.x,
        y: anchor + frame.dy,
        width: frame.width,
        height: frame.height,
    }
}

/// Greedy word wrap against a measured width budget.
///
/// Words wider than the budget on their own are broken between characters.
pub fn wrap_text(text: &str, font: FontSpec, budget: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if font.text_width(&candidate) <= budget {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if font.text_width(word) <= budget {
            current = word.to_string();
        } else {
            for ch in word.chars() {
                current.push(ch);
                if font.text_width(&current) > budget && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(ch);
                }
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

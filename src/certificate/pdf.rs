//! PDF output for laid-out slots.

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::fonts::{FontFace, FontSpec, Rgb, TextStyle};
use super::geometry::{CELL_HEIGHT, CELL_MARGIN, PAGE_HEIGHT, PAGE_WIDTH};
use super::images::{ImageAssets, RasterImage};
use super::layout::{DrawOp, ImageKind, SlotLayout};
use super::RenderError;

/// Distance from the vertical centre of a line to its baseline, as a share
/// of the font size.
const BASELINE_DROP: f32 = 0.3;

/// Destination of the assembler's output.
///
/// Pages are opened explicitly; every slot drawn after `begin_page` lands on
/// that page.
pub trait DocumentSink {
    fn begin_page(&mut self) -> Result<(), RenderError>;

    fn draw_slot(&mut self, slot: &SlotLayout) -> Result<(), RenderError>;

    /// Number of pages opened so far.
    fn page_count(&self) -> usize;

    /// Serialise the document. Nothing is written anywhere until this succeeds.
    fn finish(self) -> Result<Vec<u8>, RenderError>
    where
        Self: Sized;
}

/// In-memory PDF document built with `lopdf`.
///
/// Fonts and images are embedded once and shared by every page through a
/// single resource dictionary.
pub struct PdfCanvas {
    doc: Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    page_ids: Vec<ObjectId>,
    images: HashMap<ImageKind, Vec<u8>>,
    baseline: TextStyle,
    page: Option<PageState>,
}

struct PageState {
    operations: Vec<Operation>,
    font: FontSpec,
}

impl PdfCanvas {
    pub fn new(assets: &ImageAssets, baseline: TextStyle) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for face in FontFace::ALL {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => face.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(face.resource_name(), font_id);
        }

        let mut images = HashMap::new();
        let mut xobjects = Dictionary::new();
        let embedded = [
            (ImageKind::Template, Some(&assets.template)),
            (ImageKind::Mark, assets.mark.as_ref()),
            (ImageKind::Signature, assets.signature.as_ref()),
        ];
        for (index, (kind, raster)) in embedded.into_iter().enumerate() {
            let Some(raster) = raster else { continue };
            let name = format!("Im{index}");
            let image_id = doc.add_object(image_stream(raster));
            xobjects.set(name.as_bytes().to_vec(), image_id);
            images.insert(kind, name.into_bytes());
        }

        let resources_id = doc.add_object(dictionary! {
            "Font" => fonts,
            "XObject" => xobjects,
        });

        Self {
            doc,
            pages_id,
            resources_id,
            page_ids: Vec::new(),
            images,
            baseline,
            page: None,
        }
    }

    fn flush_page(&mut self) -> Result<(), RenderError> {
        let Some(page) = self.page.take() else {
            return Ok(());
        };
        let content = Content {
            operations: page.operations,
        };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    fn draw_image(
        &self,
        page: &mut PageState,
        kind: ImageKind,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), RenderError> {
        let Some(name) = self.images.get(&kind) else {
            return match kind {
                ImageKind::Signature => Err(RenderError::MissingSignature),
                _ => {
                    log::warn!("No {:?} image loaded, leaving its frame empty", kind);
                    Ok(())
                }
            };
        };
        let bottom = PAGE_HEIGHT - (y + height);
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    0.into(),
                    0.into(),
                    height.into(),
                    x.into(),
                    bottom.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.clone())]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }
}

impl DocumentSink for PdfCanvas {
    fn begin_page(&mut self) -> Result<(), RenderError> {
        self.flush_page()?;
        // Every content stream starts from a clean graphics state.
        let mut operations = Vec::new();
        push_font(&mut operations, self.baseline.font);
        push_color(&mut operations, self.baseline.color);
        self.page = Some(PageState {
            operations,
            font: self.baseline.font,
        });
        Ok(())
    }

    fn draw_slot(&mut self, slot: &SlotLayout) -> Result<(), RenderError> {
        if self.page.is_none() {
            self.begin_page()?;
        }
        let mut page = self.page.take().unwrap_or_else(|| PageState {
            operations: Vec::new(),
            font: self.baseline.font,
        });

        let result = slot.ops.iter().try_for_each(|op| match op {
            DrawOp::Image {
                kind,
                x,
                y,
                width,
                height,
            } => self.draw_image(&mut page, *kind, *x, *y, *width, *height),
            DrawOp::SetFont(font) => {
                push_font(&mut page.operations, *font);
                page.font = *font;
                Ok(())
            }
            DrawOp::SetColor(color) => {
                push_color(&mut page.operations, *color);
                Ok(())
            }
            DrawOp::Text { x, y, text, .. } => {
                let baseline = y + CELL_HEIGHT / 2.0 + BASELINE_DROP * page.font.size;
                push_text(&mut page.operations, x + CELL_MARGIN, baseline, text);
                Ok(())
            }
            DrawOp::TextBlock {
                x,
                y,
                line_height,
                lines,
                ..
            } => {
                for (index, line) in lines.iter().enumerate() {
                    let centre = y + index as f32 * line_height + line_height / 2.0;
                    let baseline = centre + BASELINE_DROP * page.font.size;
                    push_text(&mut page.operations, x + CELL_MARGIN, baseline, line);
                }
                Ok(())
            }
        });

        self.page = Some(page);
        result
    }

    fn page_count(&self) -> usize {
        self.page_ids.len() + usize::from(self.page.is_some())
    }

    fn finish(mut self) -> Result<Vec<u8>, RenderError> {
        self.flush_page()?;

        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
            "Resources" => self.resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Title" => Object::string_literal("Certificates"),
            "Producer" => Object::string_literal(concat!("certificate-press-server ", env!("CARGO_PKG_VERSION"))),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);
        self.doc.compress();

        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes)?;
        log::info!(
            "Serialised {} page(s) into {} bytes",
            self.page_ids.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}

fn image_stream(raster: &RasterImage) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(raster.width),
            "Height" => i64::from(raster.height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        raster.rgb.clone(),
    )
}

fn push_font(operations: &mut Vec<Operation>, font: FontSpec) {
    operations.push(Operation::new(
        "Tf",
        vec![
            Object::Name(font.face.resource_name().as_bytes().to_vec()),
            font.size.into(),
        ],
    ));
}

fn push_color(operations: &mut Vec<Operation>, color: Rgb) {
    let [r, g, b] = color.components();
    operations.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
}

fn push_text(operations: &mut Vec<Operation>, x: f32, baseline: f32, text: &str) {
    operations.extend([
        Operation::new("BT", vec![]),
        Operation::new("Td", vec![x.into(), (PAGE_HEIGHT - baseline).into()]),
        Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(text))]),
        Operation::new("ET", vec![]),
    ]);
}

/// Latin-1 bytes for the standard fonts; anything else becomes `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?'))
        .collect()
}

//! Certificate module - wording, layout and PDF assembly.
//!
//! - `roman` - semester numerals
//! - `fonts` - base fonts and glyph metrics used to measure text
//! - `geometry` - page size, slot anchors and field positions
//! - `narrative` - the strings printed on one certificate
//! - `images` - template, mark and signature rasters
//! - `layout` - one record to the draw operations of one slot
//! - `pdf` - the canvas that turns draw operations into a PDF
//! - `assembler` - pending records to a complete document

pub mod assembler;
pub mod fonts;
pub mod geometry;
pub mod images;
pub mod layout;
pub mod narrative;
pub mod pdf;
pub mod roman;


pub use assembler::{AssemblyOutcome, AssemblyReport, DocumentAssembler, GENERATION_STAGE};
pub use geometry::{slot_for, SlotPosition, TemplateGeometry};
pub use images::{ImageAssets, RasterImage};
pub use layout::{DrawOp, LayoutCapabilities, LayoutEngine, Placement, SlotLayout};
pub use narrative::{CertificateText, NarrativeContext};
pub use pdf::{DocumentSink, PdfCanvas};
pub use roman::to_roman;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("semester {0} cannot be written as a roman numeral")]
    InvalidSemester(u32),
    #[error("the layout prints a semester but none was provided")]
    MissingSemester,
    #[error("could not decode the {what} image: {source}")]
    Image {
        what: &'static str,
        #[source]
        source: image::ImageError,
    },
    #[error("could not read the {what} image at {path}: {source}")]
    ImageIo {
        what: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("signature images must be PNG or JPEG, got {0}")]
    UnsupportedSignature(String),
    #[error("a signature image is required but none was provided")]
    MissingSignature,
    #[error("PDF serialisation failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("I/O error while writing the document: {0}")]
    Io(#[from] std::io::Error),
}

//! Raster images placed on the certificate.

use std::path::Path;

use image::{DynamicImage, ImageFormat};

use super::RenderError;

/// Formats accepted for uploaded signature images.
pub const SIGNATURE_FORMATS: &[ImageFormat] = &[ImageFormat::Png, ImageFormat::Jpeg];

/// Decoded 8-bit RGB pixels, alpha flattened onto white.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl RasterImage {
    pub fn decode(bytes: &[u8], what: &'static str) -> Result<Self, RenderError> {
        let image = image::load_from_memory(bytes).map_err(|source| RenderError::Image { what, source })?;
        Ok(Self::from_dynamic(&image))
    }

    pub fn open(path: &Path, what: &'static str) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path).map_err(|source| RenderError::ImageIo {
            what,
            path: path.display().to_string(),
            source,
        })?;
        Self::decode(&bytes, what)
    }

    /// Decode an uploaded signature, accepting only PNG and JPEG.
    pub fn decode_signature(bytes: &[u8]) -> Result<Self, RenderError> {
        let format = image::guess_format(bytes).map_err(|source| RenderError::Image {
            what: "signature",
            source,
        })?;
        if !SIGNATURE_FORMATS.contains(&format) {
            return Err(RenderError::UnsupportedSignature(format!("{format:?}")));
        }
        Self::decode(bytes, "signature")
    }

    pub fn from_dynamic(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            let alpha = u32::from(a);
            for channel in [r, g, b] {
                let blended = (u32::from(channel) * alpha + 255 * (255 - alpha)) / 255;
                rgb.push(blended as u8);
            }
        }
        Self { width, height, rgb }
    }
}

/// Images shared by every slot of a run.
#[derive(Debug, Clone)]
pub struct ImageAssets {
    pub template: RasterImage,
    pub mark: Option<RasterImage>,
    pub signature: Option<RasterImage>,
}

impl ImageAssets {
    pub fn new(template: RasterImage) -> Self {
        Self {
            template,
            mark: None,
            signature: None,
        }
    }

    pub fn with_mark(mut self, mark: Option<RasterImage>) -> Self {
        self.mark = mark;
        self
    }

    pub fn with_signature(mut self, signature: Option<RasterImage>) -> Self {
        self.signature = signature;
        self
    }
}

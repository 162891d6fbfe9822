//! The opaque decoded-image value that flows through every recipe.
//!
//! [`RawImage`] is the upload as received: bytes plus declared MIME type,
//! owned by the request and consumed exactly once. [`ImageHandle`] is the
//! result of that one decode: the pixel surface plus the metadata recipes
//! care about (dimensions, channels, declared density). Handles are never
//! shared across requests.

use super::codec::{CodecError, OutputFormat};
use super::density::{self, Density};
use image::DynamicImage;

/// An uploaded image before decoding: bytes plus the declared MIME type.
/// The declared type is advisory; the actual format is sniffed from the
/// bytes, since browsers routinely mislabel uploads.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl RawImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, mime: None }
    }

    pub fn with_mime(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: Some(mime.into()),
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A decoded image: pixel surface + metadata, owned by one request.
#[derive(Debug)]
pub struct ImageHandle {
    image: DynamicImage,
    source_format: OutputFormat,
    density: Option<Density>,
}

impl ImageHandle {
    /// Decode raw bytes. The single decode per request happens here.
    ///
    /// Formats outside the service set (JPEG/PNG/WEBP) are rejected as
    /// [`CodecError::UnsupportedFormat`] before any pixel work.
    pub fn decode(raw: &RawImage) -> Result<Self, CodecError> {
        let format = image::guess_format(&raw.bytes).map_err(|_| {
            CodecError::UnsupportedFormat(
                raw.mime.clone().unwrap_or_else(|| "unrecognized bytes".into()),
            )
        })?;
        let source_format = OutputFormat::from_input(format)
            .ok_or_else(|| CodecError::UnsupportedFormat(format!("{format:?}")))?;
        let image = image::load_from_memory_with_format(&raw.bytes, format)
            .map_err(|e| CodecError::Decode(e.to_string()))?;
        let density = density::sniff_density(&raw.bytes);
        Ok(Self {
            image,
            source_format,
            density,
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    pub fn channel_count(&self) -> u8 {
        self.image.color().channel_count()
    }

    /// The format the upload was actually encoded in.
    pub fn source_format(&self) -> OutputFormat {
        self.source_format
    }

    /// Density declared in the file headers, if any.
    pub fn density(&self) -> Option<Density> {
        self.density
    }

    /// Working DPI: the declared horizontal density, or the fallback.
    pub fn dpi_or(&self, fallback: f64) -> f64 {
        self.density.map(|d| d.x_dpi).unwrap_or(fallback)
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

//! Output formats and the encode side of the native codec boundary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality 1–100) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (compression level + adaptive filtering) |
//! | Encode → WebP (lossy) | `webp::Encoder` (libwebp; quality 1–100) |
//!
//! The `image` crate's own WebP encoder is lossless-only, so lossy WebP
//! goes through the `webp` crate. Everything the rest of the codebase
//! needs from a codec flows through [`encode`] and the
//! [`decode`](super::handle) side in the handle module.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat};
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("{format} encode failed: {detail}")]
    Encode {
        format: &'static str,
        detail: String,
    },
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
}

/// Encoded output format of a tool.
///
/// The service's format set is fixed to the three web formats; anything
/// else is rejected at the decode boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    /// Whether the format's encoder exposes a lossy quality knob.
    /// PNG does not; its size is steered structurally (see the
    /// compression engine's PNG strategy).
    pub fn supports_quality(self) -> bool {
        !matches!(self, OutputFormat::Png)
    }

    /// Parse a user-supplied format name.
    pub fn parse(name: &str) -> Option<OutputFormat> {
        match name.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "webp" => Some(OutputFormat::Webp),
            _ => None,
        }
    }

    /// Map a decoded input format onto the output set.
    pub fn from_input(format: ImageFormat) -> Option<OutputFormat> {
        match format {
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::Png => Some(OutputFormat::Png),
            ImageFormat::WebP => Some(OutputFormat::Webp),
            _ => None,
        }
    }
}

/// Immutable codec tuning, built once at startup from the service config
/// and threaded through the dispatcher — never ambient global state.
#[derive(Debug, Clone, Copy)]
pub struct CodecConfig {
    /// Quality used when a recipe does not pick one (1–100).
    pub default_quality: u8,
    /// Lower bound of the compression engine's quality search.
    pub quality_floor: u8,
    /// Upper bound of the compression engine's quality search.
    pub quality_ceiling: u8,
    /// Hard cap on encode probes per compression request.
    pub max_probes: u32,
    /// Tolerance band around a byte target, as a percentage of it.
    pub tolerance_percent: u8,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            default_quality: 90,
            quality_floor: 10,
            quality_ceiling: 100,
            max_probes: 10,
            tolerance_percent: 5,
        }
    }
}

/// Encode an image to the given format at the given quality.
///
/// Color handling: JPEG cannot carry alpha, so alpha surfaces are
/// flattened to RGB; PNG keeps alpha when the surface has it; grayscale
/// surfaces stay single-channel where the format allows.
pub fn encode(
    image: &DynamicImage,
    format: OutputFormat,
    quality: u8,
) -> Result<Vec<u8>, CodecError> {
    match format {
        OutputFormat::Jpeg => encode_jpeg(image, quality),
        OutputFormat::Png => encode_png(image, CompressionType::Default),
        OutputFormat::Webp => encode_webp(image, quality),
    }
}

pub(crate) fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CodecError> {
    let quality = quality.clamp(1, 100);
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut out), quality);
    let result = match image {
        DynamicImage::ImageLuma8(gray) => encoder.write_image(
            gray.as_raw(),
            gray.width(),
            gray.height(),
            ExtendedColorType::L8,
        ),
        _ => {
            let rgb = image.to_rgb8();
            encoder.write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )
        }
    };
    result.map_err(|e| CodecError::Encode {
        format: "jpeg",
        detail: e.to_string(),
    })?;
    Ok(out)
}

pub(crate) fn encode_png(
    image: &DynamicImage,
    compression: CompressionType,
) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(
        Cursor::new(&mut out),
        compression,
        PngFilterType::Adaptive,
    );
    let result = match image {
        DynamicImage::ImageLuma8(gray) => encoder.write_image(
            gray.as_raw(),
            gray.width(),
            gray.height(),
            ExtendedColorType::L8,
        ),
        _ if image.color().has_alpha() => {
            let rgba = image.to_rgba8();
            encoder.write_image(
                rgba.as_raw(),
                rgba.width(),
                rgba.height(),
                ExtendedColorType::Rgba8,
            )
        }
        _ => {
            let rgb = image.to_rgb8();
            encoder.write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )
        }
    };
    result.map_err(|e| CodecError::Encode {
        format: "png",
        detail: e.to_string(),
    })?;
    Ok(out)
}

pub(crate) fn encode_webp(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CodecError> {
    let quality = quality.clamp(1, 100) as f32;
    let mem = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height()).encode(quality)
    } else {
        let rgb = image.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height()).encode(quality)
    };
    Ok(mem.to_vec())
}

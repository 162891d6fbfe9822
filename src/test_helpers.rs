//! Shared fixture builders for the unit-test suite.
//!
//! All fixtures are synthetic and deterministic — no binary files in the
//! repo, no randomness between runs. `gradient_*` compresses well,
//! `textured_*` carries enough high-frequency detail that JPEG/WebP
//! quality visibly moves the encoded size, which the compression-engine
//! tests rely on.

use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbImage};
use std::io::Cursor;

/// Smooth two-axis gradient.
pub(crate) fn gradient_image(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    });
    DynamicImage::ImageRgb8(img)
}

/// Gradient plus deterministic high-frequency texture.
pub(crate) fn textured_image(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        // Cheap integer hash; varies every pixel without a RNG.
        let n = x.wrapping_mul(0x9E37_79B9) ^ y.wrapping_mul(0x85EB_CA6B);
        let noise = (n >> 13) as u8;
        image::Rgb([
            ((x * 255 / width.max(1)) as u8).wrapping_add(noise / 4),
            ((y * 255 / height.max(1)) as u8).wrapping_add(noise / 8),
            noise,
        ])
    });
    DynamicImage::ImageRgb8(img)
}

/// One flat color everywhere.
pub(crate) fn solid_image(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
}

pub(crate) fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode_jpeg_fixture(&gradient_image(width, height))
}

pub(crate) fn textured_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode_jpeg_fixture(&textured_image(width, height))
}

pub(crate) fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    encode_png_fixture(&gradient_image(width, height))
}

pub(crate) fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    encode_png_fixture(&solid_image(width, height, rgb))
}

fn encode_jpeg_fixture(image: &DynamicImage) -> Vec<u8> {
    let rgb = image.to_rgb8();
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut out), 90)
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .expect("fixture JPEG encode");
    out
}

fn encode_png_fixture(image: &DynamicImage) -> Vec<u8> {
    let rgb = image.to_rgb8();
    let mut out = Vec::new();
    PngEncoder::new(Cursor::new(&mut out))
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .expect("fixture PNG encode");
    out
}

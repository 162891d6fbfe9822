//! Resize, crop, rotate and flip tools, plus the named-size presets.
//!
//! Geometry parameters accept unit suffixes and arrive here already
//! normalized to pixels. Output keeps the upload's format; conversion is
//! the convert family's job.

use super::{Diagnostics, Family, Recipe, RecipeCtx, RecipeOutput, Registry};
use crate::dispatch::ToolError;
use crate::imaging::geometry;
use crate::imaging::handle::ImageHandle;
use crate::params::{ParamError, Schema, TransformParams};
use image::DynamicImage;
use image::imageops::FilterType;

/// Named social-media and print canvas sizes, fill-cropped to exact
/// dimensions. Mechanical preset table; the interesting work is in
/// [`apply_resize`].
const NAMED_SIZES: &[(&str, u32, u32, &str)] = &[
    ("instagram-square", 1080, 1080, "Instagram square post (1080×1080)"),
    ("instagram-portrait", 1080, 1350, "Instagram portrait post (1080×1350)"),
    ("instagram-landscape", 1080, 566, "Instagram landscape post (1080×566)"),
    ("instagram-story", 1080, 1920, "Instagram story (1080×1920)"),
    ("facebook-post", 1200, 630, "Facebook link post (1200×630)"),
    ("facebook-cover", 820, 312, "Facebook cover photo (820×312)"),
    ("twitter-post", 1600, 900, "X/Twitter post image (1600×900)"),
    ("twitter-header", 1500, 500, "X/Twitter profile header (1500×500)"),
    ("youtube-thumbnail", 1280, 720, "YouTube thumbnail (1280×720)"),
    ("youtube-banner", 2560, 1440, "YouTube channel banner (2560×1440)"),
    ("linkedin-post", 1200, 627, "LinkedIn post image (1200×627)"),
    ("linkedin-banner", 1584, 396, "LinkedIn profile banner (1584×396)"),
    ("pinterest-pin", 1000, 1500, "Pinterest pin (1000×1500)"),
    ("whatsapp-profile", 500, 500, "WhatsApp profile photo (500×500)"),
    ("og-image", 1200, 630, "Open Graph preview image (1200×630)"),
    ("email-header", 600, 200, "Email newsletter header (600×200)"),
];

pub fn register(registry: &mut Registry) {
    registry.add(Recipe::image(
        "resize",
        Family::Resize,
        "Resize to a target width and/or height (fit, fill or exact)",
        Schema::new()
            .dimension("width", "target width (px/mm/cm/in)")
            .dimension("height", "target height (px/mm/cm/in)")
            .choice(
                "mode",
                &["fit", "fill", "exact"],
                "fit",
                "fit inside the box, fill and crop to it, or stretch exactly",
            ),
        apply_resize,
    ));

    registry.add(Recipe::image(
        "resize-width",
        Family::Resize,
        "Resize to a target width, height follows the aspect ratio",
        Schema::new().required_dimension("width", "target width (px/mm/cm/in)"),
        |handle, params, _ctx| {
            let width = params.require_px("width").map_err(ToolError::InvalidParameter)?;
            let (w, h) = handle.dimensions();
            let height = ((h as f64 * width as f64 / w as f64).round() as u32).max(1);
            Ok(resized_output(handle, width, height, FilterType::Lanczos3))
        },
    ));

    registry.add(Recipe::image(
        "resize-height",
        Family::Resize,
        "Resize to a target height, width follows the aspect ratio",
        Schema::new().required_dimension("height", "target height (px/mm/cm/in)"),
        |handle, params, _ctx| {
            let height = params.require_px("height").map_err(ToolError::InvalidParameter)?;
            let (w, h) = handle.dimensions();
            let width = ((w as f64 * height as f64 / h as f64).round() as u32).max(1);
            Ok(resized_output(handle, width, height, FilterType::Lanczos3))
        },
    ));

    registry.add(Recipe::image(
        "resize-percent",
        Family::Resize,
        "Scale both edges by a percentage",
        Schema::new().required_float("percent", 1.0, 500.0, "scale factor in percent"),
        |handle, params, _ctx| {
            let percent = params
                .float("percent")
                .ok_or(ToolError::InvalidParameter(ParamError::Missing("percent")))?;
            let (w, h) = geometry::percent_dimensions(handle.dimensions(), percent);
            Ok(resized_output(handle, w, h, FilterType::Lanczos3))
        },
    ));

    registry.add(Recipe::image(
        "thumbnail",
        Family::Resize,
        "Square thumbnail: fill-crop to size, with optional sharpening",
        Schema::new()
            .dimension("size", "edge length, default 400px")
            .flag("sharpen", true, "apply a light unsharp mask"),
        |handle, params, _ctx| {
            let size = params.px("size").unwrap_or(400);
            let filled = handle.image().resize_to_fill(size, size, FilterType::Lanczos3);
            let image = if params.flag("sharpen").unwrap_or(true) {
                DynamicImage::from(image::imageops::unsharpen(&filled, 0.5, 0))
            } else {
                filled
            };
            Ok(plain_output(handle, image))
        },
    ));

    registry.add(Recipe::image(
        "crop",
        Family::Resize,
        "Crop a rectangle out of the image",
        Schema::new()
            .int("x", 0, i64::MAX, 0, "left edge of the crop, default 0")
            .int("y", 0, i64::MAX, 0, "top edge of the crop, default 0")
            .required_dimension("width", "crop width (px/mm/cm/in)")
            .required_dimension("height", "crop height (px/mm/cm/in)"),
        |handle, params, _ctx| {
            let x = params.int("x").unwrap_or(0).max(0) as u32;
            let y = params.int("y").unwrap_or(0).max(0) as u32;
            let width = params.require_px("width").map_err(ToolError::InvalidParameter)?;
            let height = params.require_px("height").map_err(ToolError::InvalidParameter)?;
            let (img_w, img_h) = handle.dimensions();
            if x >= img_w || y >= img_h {
                return Err(ToolError::InvalidParameter(ParamError::Invalid {
                    name: "x",
                    reason: format!("crop origin ({x},{y}) is outside the {img_w}×{img_h} image"),
                }));
            }
            // Clamp the rectangle to the image instead of erroring: callers
            // routinely ask for "the left 500px" of a 400px image.
            let width = width.min(img_w - x);
            let height = height.min(img_h - y);
            Ok(plain_output(handle, handle.image().crop_imm(x, y, width, height)))
        },
    ));

    registry.add(Recipe::image(
        "crop-square",
        Family::Resize,
        "Center-crop to a square",
        Schema::new().dimension("size", "output edge; default is the shorter image edge"),
        |handle, params, _ctx| {
            let (w, h) = handle.dimensions();
            let side = w.min(h);
            let x = (w - side) / 2;
            let y = (h - side) / 2;
            let mut image = handle.image().crop_imm(x, y, side, side);
            if let Some(size) = params.px("size") {
                image = image.resize_exact(size, size, FilterType::Lanczos3);
            }
            Ok(plain_output(handle, image))
        },
    ));

    registry.add(Recipe::image(
        "crop-face",
        Family::Resize,
        "Crop to the statistically likely face region (heuristic, not detection)",
        Schema::new().dimension("size", "optional output edge for the square crop"),
        |handle, params, _ctx| {
            let mut image = face_crop(handle.image());
            if let Some(size) = params.px("size") {
                image = image.resize_exact(size, size, FilterType::Lanczos3);
            }
            Ok(plain_output(handle, image))
        },
    ));

    registry.add(Recipe::image(
        "rotate",
        Family::Resize,
        "Rotate by a quarter turn",
        Schema::new().choice("angle", &["90", "180", "270"], "90", "clockwise degrees"),
        |handle, params, _ctx| {
            let image = match params.text("angle").unwrap_or("90") {
                "180" => handle.image().rotate180(),
                "270" => handle.image().rotate270(),
                _ => handle.image().rotate90(),
            };
            Ok(plain_output(handle, image))
        },
    ));

    for (id, summary, turn) in [
        ("rotate-90", "Rotate 90° clockwise", 1u8),
        ("rotate-180", "Rotate 180°", 2),
        ("rotate-270", "Rotate 270° clockwise", 3),
    ] {
        registry.add(Recipe::image(
            id,
            Family::Resize,
            summary,
            Schema::new(),
            move |handle, _params, _ctx| {
                let image = match turn {
                    2 => handle.image().rotate180(),
                    3 => handle.image().rotate270(),
                    _ => handle.image().rotate90(),
                };
                Ok(plain_output(handle, image))
            },
        ));
    }

    registry.add(Recipe::image(
        "flip-horizontal",
        Family::Resize,
        "Mirror left to right",
        Schema::new(),
        |handle, _params, _ctx| Ok(plain_output(handle, handle.image().fliph())),
    ));

    registry.add(Recipe::image(
        "flip-vertical",
        Family::Resize,
        "Mirror top to bottom",
        Schema::new(),
        |handle, _params, _ctx| Ok(plain_output(handle, handle.image().flipv())),
    ));

    for &(id, width, height, summary) in NAMED_SIZES {
        registry.add(Recipe::image(
            id,
            Family::Resize,
            summary,
            Schema::new(),
            move |handle, _params, _ctx| {
                let image = handle.image().resize_to_fill(width, height, FilterType::Lanczos3);
                Ok(plain_output(handle, image))
            },
        ));
    }
}

/// The generic resize. `fit` bounds the image inside the box, `fill`
/// covers and center-crops to it, `exact` stretches. A single given edge
/// means "scale by aspect ratio"; no edge at all is a caller error.
fn apply_resize(
    handle: &ImageHandle,
    params: &TransformParams,
    _ctx: &RecipeCtx,
) -> Result<RecipeOutput, ToolError> {
    let (src_w, src_h) = handle.dimensions();
    let width = params.px("width");
    let height = params.px("height");
    let (target_w, target_h) = match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, ((src_h as f64 * w as f64 / src_w as f64).round() as u32).max(1)),
        (None, Some(h)) => (((src_w as f64 * h as f64 / src_h as f64).round() as u32).max(1), h),
        (None, None) => {
            return Err(ToolError::InvalidParameter(ParamError::Missing("width")));
        }
    };

    let image = match params.text("mode").unwrap_or("fit") {
        "fill" => handle.image().resize_to_fill(target_w, target_h, FilterType::Lanczos3),
        "exact" => handle.image().resize_exact(target_w, target_h, FilterType::Lanczos3),
        _ => handle.image().resize(target_w, target_h, FilterType::Lanczos3),
    };
    Ok(plain_output(handle, image))
}

/// Crop to the face-region heuristic square.
pub(crate) fn face_crop(image: &DynamicImage) -> DynamicImage {
    let r = geometry::face_region(image.width(), image.height());
    image.crop_imm(r.x, r.y, r.width, r.height)
}

/// Wrap a transformed surface keeping the upload's format and the
/// configured default quality.
pub(crate) fn plain_output(handle: &ImageHandle, image: DynamicImage) -> RecipeOutput {
    RecipeOutput::Image {
        image,
        format: handle.source_format(),
        quality: None,
        extra: Diagnostics::new(),
    }
}

fn resized_output(handle: &ImageHandle, width: u32, height: u32, filter: FilterType) -> RecipeOutput {
    plain_output(handle, handle.image().resize_exact(width, height, filter))
}

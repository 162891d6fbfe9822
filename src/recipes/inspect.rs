//! JSON-returning tools: metadata inspection, pixel sampling, OCR.
//!
//! These answer with a JSON body instead of image bytes; the dispatcher
//! routes on the recipe's declared output kind. OCR delegates to the
//! [`TextRecognizer`](crate::collab::TextRecognizer) collaborator; a
//! deployment without an engine gets a structured `success: false`
//! body, not a failed request.

use super::{Family, Recipe, Registry};
use crate::dispatch::ToolError;
use crate::params::{ParamError, Schema};
use image::GenericImageView;
use serde_json::json;

pub fn register(registry: &mut Registry) {
    registry.add(Recipe::json(
        "inspect",
        Family::Inspect,
        "Report dimensions, channels, format and declared density",
        Schema::new(),
        |handle, _params, ctx| {
            let density = handle.density();
            Ok(super::RecipeOutput::Json(json!({
                "success": true,
                "width": handle.width(),
                "height": handle.height(),
                "channels": handle.channel_count(),
                "format": handle.source_format().name(),
                "declared_dpi": density.map(|d| d.x_dpi),
                "working_dpi": ctx.dpi,
            })))
        },
    ));

    registry.add(Recipe::json(
        "dpi",
        Family::Inspect,
        "Report the declared print density",
        Schema::new(),
        |handle, _params, ctx| {
            let body = match handle.density() {
                Some(d) => json!({
                    "success": true,
                    "dpi": { "x": d.x_dpi, "y": d.y_dpi },
                    "source": "declared",
                }),
                None => json!({
                    "success": true,
                    "dpi": { "x": ctx.dpi, "y": ctx.dpi },
                    "source": "default",
                }),
            };
            Ok(super::RecipeOutput::Json(body))
        },
    ));

    registry.add(Recipe::json(
        "color-at",
        Family::Inspect,
        "Sample the color of one pixel",
        Schema::new()
            .required_int("x", 0, i64::MAX, "pixel column")
            .required_int("y", 0, i64::MAX, "pixel row"),
        |handle, params, _ctx| {
            let x = params.require_int("x").map_err(ToolError::InvalidParameter)? as u32;
            let y = params.require_int("y").map_err(ToolError::InvalidParameter)? as u32;
            let (w, h) = handle.dimensions();
            if x >= w || y >= h {
                return Err(ToolError::InvalidParameter(ParamError::Invalid {
                    name: "x",
                    reason: format!("({x},{y}) is outside the {w}×{h} image"),
                }));
            }
            let p = handle.image().get_pixel(x, y);
            Ok(super::RecipeOutput::Json(json!({
                "success": true,
                "color": format!("#{:02x}{:02x}{:02x}", p[0], p[1], p[2]),
                "alpha": p[3],
            })))
        },
    ));

    registry.add(Recipe::json(
        "mean-color",
        Family::Inspect,
        "Average color over the whole image",
        Schema::new(),
        |handle, _params, _ctx| {
            let rgba = handle.image().to_rgba8();
            let (w, h) = rgba.dimensions();
            // Stride sampling keeps this O(thousands) even for huge surfaces.
            let step = ((w as u64 * h as u64 / 10_000).max(1) as usize).next_power_of_two();
            let mut sums = [0u64; 3];
            let mut count = 0u64;
            for (i, p) in rgba.pixels().enumerate() {
                if i % step == 0 {
                    sums[0] += p[0] as u64;
                    sums[1] += p[1] as u64;
                    sums[2] += p[2] as u64;
                    count += 1;
                }
            }
            let mean = |s: u64| (s / count.max(1)) as u8;
            Ok(super::RecipeOutput::Json(json!({
                "success": true,
                "color": format!("#{:02x}{:02x}{:02x}", mean(sums[0]), mean(sums[1]), mean(sums[2])),
                "samples": count,
            })))
        },
    ));

    registry.add(Recipe::json(
        "ocr",
        Family::Inspect,
        "Extract text via the configured recognition engine",
        Schema::new().text("language", "engine language hint, e.g. 'eng'"),
        |_handle, params, ctx| {
            let language = params.text("language").unwrap_or("eng");
            let body = match ctx.recognizer {
                Some(engine) => match engine.recognize(ctx.raw_bytes, language) {
                    Ok(text) => json!({ "success": true, "text": text, "language": language }),
                    Err(e) => json!({ "success": false, "error": e.to_string() }),
                },
                None => json!({
                    "success": false,
                    "error": "no text recognition engine configured",
                }),
            };
            Ok(super::RecipeOutput::Json(body))
        },
    ));
}

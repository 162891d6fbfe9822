//! Document photo tools: passport-style crops, print sheets, grids.
//!
//! Passport tools frame the subject with the face-region heuristic (an
//! upper-center square bias, not face detection — see
//! [`geometry::face_region`]), fill-resize it to the document geometry,
//! and optionally tile N copies onto one print canvas.
//!
//! The grid is computed from the quantity itself (`ceil(sqrt(n))`
//! columns), so its capacity always covers the request; the placement
//! loop still stops at capacity rather than erroring, and surplus cells
//! stay at the background color. `copies_placed` in the diagnostics
//! makes the outcome visible to callers.

use super::resize::face_crop;
use super::{Diagnostics, Family, Recipe, RecipeCtx, RecipeOutput, Registry};
use crate::dispatch::ToolError;
use crate::imaging::geometry::{self, GridLayout, Unit};
use crate::imaging::handle::ImageHandle;
use crate::params::{MAX_DIMENSION_PX, ParamError, Schema, TransformParams};
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};

/// Country/document photo presets, sizes in millimetres. Mechanical
/// table; all entries share the passport pipeline.
const DOCUMENT_PRESETS: &[(&str, f64, f64, &str)] = &[
    ("passport-us", 50.8, 50.8, "US passport photo (2×2 in)"),
    ("passport-canada", 50.0, 70.0, "Canadian passport photo (50×70 mm)"),
    ("passport-uk", 35.0, 45.0, "UK passport photo (35×45 mm)"),
    ("passport-ireland", 35.0, 45.0, "Irish passport photo (35×45 mm)"),
    ("passport-germany", 35.0, 45.0, "German passport photo (35×45 mm)"),
    ("passport-france", 35.0, 45.0, "French passport photo (35×45 mm)"),
    ("passport-italy", 35.0, 45.0, "Italian passport photo (35×45 mm)"),
    ("passport-spain", 30.0, 40.0, "Spanish passport photo (30×40 mm)"),
    ("passport-netherlands", 35.0, 45.0, "Dutch passport photo (35×45 mm)"),
    ("passport-poland", 35.0, 45.0, "Polish passport photo (35×45 mm)"),
    ("passport-sweden", 35.0, 45.0, "Swedish passport photo (35×45 mm)"),
    ("passport-switzerland", 35.0, 45.0, "Swiss passport photo (35×45 mm)"),
    ("passport-austria", 35.0, 45.0, "Austrian passport photo (35×45 mm)"),
    ("passport-portugal", 35.0, 45.0, "Portuguese passport photo (35×45 mm)"),
    ("passport-russia", 35.0, 45.0, "Russian passport photo (35×45 mm)"),
    ("passport-turkey", 50.0, 60.0, "Turkish passport photo (50×60 mm)"),
    ("passport-india", 51.0, 51.0, "Indian passport photo (51×51 mm)"),
    ("passport-china", 33.0, 48.0, "Chinese passport photo (33×48 mm)"),
    ("passport-japan", 35.0, 45.0, "Japanese passport photo (35×45 mm)"),
    ("passport-korea", 35.0, 45.0, "South Korean passport photo (35×45 mm)"),
    ("passport-singapore", 35.0, 45.0, "Singaporean passport photo (35×45 mm)"),
    ("passport-malaysia", 35.0, 50.0, "Malaysian passport photo (35×50 mm)"),
    ("passport-thailand", 35.0, 45.0, "Thai passport photo (35×45 mm)"),
    ("passport-vietnam", 40.0, 60.0, "Vietnamese passport photo (40×60 mm)"),
    ("passport-philippines", 35.0, 45.0, "Philippine passport photo (35×45 mm)"),
    ("passport-indonesia", 35.0, 45.0, "Indonesian passport photo (35×45 mm)"),
    ("passport-pakistan", 35.0, 45.0, "Pakistani passport photo (35×45 mm)"),
    ("passport-bangladesh", 40.0, 50.0, "Bangladeshi passport photo (40×50 mm)"),
    ("passport-nigeria", 35.0, 45.0, "Nigerian passport photo (35×45 mm)"),
    ("passport-south-africa", 35.0, 45.0, "South African passport photo (35×45 mm)"),
    ("passport-brazil", 50.0, 70.0, "Brazilian passport photo (50×70 mm)"),
    ("passport-mexico", 35.0, 45.0, "Mexican passport photo (35×45 mm)"),
    ("passport-australia", 35.0, 45.0, "Australian passport photo (35×45 mm)"),
    ("passport-new-zealand", 35.0, 45.0, "New Zealand passport photo (35×45 mm)"),
    ("visa-us", 50.8, 50.8, "US visa photo (2×2 in)"),
    ("visa-india", 50.8, 50.8, "Indian visa photo (2×2 in)"),
    ("visa-china", 33.0, 48.0, "Chinese visa photo (33×48 mm)"),
    ("visa-schengen", 35.0, 45.0, "Schengen visa photo (35×45 mm)"),
    ("visa-japan", 45.0, 45.0, "Japanese visa photo (45×45 mm)"),
];

pub fn register(registry: &mut Registry) {
    registry.add(Recipe::image(
        "passport-photo",
        Family::Document,
        "Passport-style photo at explicit geometry, optionally tiled for print",
        Schema::new()
            .required_dimension("width", "document width (px/mm/cm/in)")
            .required_dimension("height", "document height (px/mm/cm/in)")
            .int("quantity", 1, 36, 1, "copies on one sheet, default 1")
            .color("background", [255, 255, 255, 255], "sheet background, default white"),
        |handle, params, ctx| {
            let width = params.require_px("width").map_err(ToolError::InvalidParameter)?;
            let height = params.require_px("height").map_err(ToolError::InvalidParameter)?;
            apply_document(handle, params, ctx, width, height, true)
        },
    ));

    for &(id, width_mm, height_mm, summary) in DOCUMENT_PRESETS {
        registry.add(Recipe::image(
            id,
            Family::Document,
            summary,
            Schema::new()
                .int("quantity", 1, 36, 1, "copies on one sheet, default 1")
                .color("background", [255, 255, 255, 255], "sheet background, default white"),
            move |handle, params, ctx| {
                let width = geometry::to_pixels(width_mm, Unit::Mm, ctx.dpi).round() as u32;
                let height = geometry::to_pixels(height_mm, Unit::Mm, ctx.dpi).round() as u32;
                apply_document(handle, params, ctx, width.max(1), height.max(1), true)
            },
        ));
    }

    registry.add(Recipe::image(
        "print-sheet",
        Family::Document,
        "Tile N copies of the photo at a fixed size onto one sheet",
        Schema::new()
            .required_dimension("width", "unit photo width (px/mm/cm/in)")
            .required_dimension("height", "unit photo height (px/mm/cm/in)")
            .int("quantity", 1, 36, 4, "copies on the sheet, default 4")
            .color("background", [255, 255, 255, 255], "sheet background, default white"),
        |handle, params, ctx| {
            let width = params.require_px("width").map_err(ToolError::InvalidParameter)?;
            let height = params.require_px("height").map_err(ToolError::InvalidParameter)?;
            apply_document(handle, params, ctx, width, height, false)
        },
    ));

    registry.add(Recipe::image(
        "photo-grid",
        Family::Document,
        "Tile N copies of the photo into a near-square grid",
        Schema::new()
            .int("quantity", 2, 16, 4, "copies in the grid, default 4")
            .dimension("cell-size", "bounding box per cell, default 800px")
            .color("background", [255, 255, 255, 255], "grid background, default white"),
        |handle, params, _ctx| {
            let quantity = params.int("quantity").unwrap_or(4) as u32;
            let cell = params.px("cell-size").unwrap_or(800);
            let background = params.color("background").unwrap_or([255, 255, 255, 255]);
            let (w, h) = geometry::fit_dimensions(handle.dimensions(), (cell, cell));
            let unit = handle.image().resize_exact(w, h, FilterType::Lanczos3);
            let (canvas, extra) = compose_grid(&unit, quantity, background)?;
            Ok(RecipeOutput::Image {
                image: DynamicImage::ImageRgba8(canvas),
                format: handle.source_format(),
                quality: None,
                extra,
            })
        },
    ));
}

/// Shared passport/print-sheet pipeline: optional face-heuristic framing,
/// fill-resize to the document geometry, then a grid when quantity > 1.
fn apply_document(
    handle: &ImageHandle,
    params: &TransformParams,
    _ctx: &RecipeCtx,
    width: u32,
    height: u32,
    frame_face: bool,
) -> Result<RecipeOutput, ToolError> {
    let quantity = params.int("quantity").unwrap_or(1) as u32;
    let background = params.color("background").unwrap_or([255, 255, 255, 255]);

    let framed = if frame_face {
        face_crop(handle.image())
    } else {
        handle.image().clone()
    };
    let unit = framed.resize_to_fill(width, height, FilterType::Lanczos3);

    if quantity <= 1 {
        let mut extra = Diagnostics::new();
        extra.insert("copies_placed".into(), "1".into());
        return Ok(RecipeOutput::Image {
            image: unit,
            format: handle.source_format(),
            quality: None,
            extra,
        });
    }

    let (canvas, extra) = compose_grid(&unit, quantity, background)?;
    Ok(RecipeOutput::Image {
        image: DynamicImage::ImageRgba8(canvas),
        format: handle.source_format(),
        quality: None,
        extra,
    })
}

/// Build the grid canvas and place up to capacity copies of the unit.
fn compose_grid(
    unit: &DynamicImage,
    quantity: u32,
    background: [u8; 4],
) -> Result<(RgbaImage, Diagnostics), ToolError> {
    let (unit_w, unit_h) = (unit.width(), unit.height());
    let grid = GridLayout::for_quantity(quantity);
    let (canvas_w, canvas_h) = grid.canvas(unit_w, unit_h);
    if canvas_w > MAX_DIMENSION_PX || canvas_h > MAX_DIMENSION_PX {
        return Err(ToolError::InvalidParameter(ParamError::Invalid {
            name: "quantity",
            reason: format!(
                "sheet of {canvas_w}×{canvas_h}px exceeds the {MAX_DIMENSION_PX}px canvas ceiling"
            ),
        }));
    }

    let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, Rgba(background));
    let unit_rgba = unit.to_rgba8();
    let placed = quantity.min(grid.capacity());
    for index in 0..placed {
        let (x, y) = grid.offset(index, unit_w, unit_h);
        image::imageops::overlay(&mut canvas, &unit_rgba, x as i64, y as i64);
    }

    let mut extra = Diagnostics::new();
    extra.insert("grid".into(), format!("{}x{}", grid.columns, grid.rows));
    extra.insert("copies_placed".into(), placed.to_string());
    extra.insert("unit_size".into(), format!("{unit_w}x{unit_h}"));
    Ok((canvas, extra))
}

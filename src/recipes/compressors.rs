//! Byte-budget compression tools, all fronting the size-targeted engine.
//!
//! A shortfall (budget below the format's floor) is not an error: the
//! closest encoding ships with `converged=false` in the diagnostics and
//! the caller reads the shortfall there.

use super::{Diagnostics, Family, Recipe, RecipeCtx, RecipeOutput, Registry};
use crate::compress::{CompressionTarget, compress_to_size};
use crate::dispatch::ToolError;
use crate::imaging::codec::OutputFormat;
use crate::imaging::handle::ImageHandle;
use crate::params::{ParamError, Schema};

/// Mechanical byte-budget presets, in KiB.
const PRESET_BUDGETS_KB: &[u64] = &[10, 20, 30, 50, 75, 100, 150, 200, 300, 500, 1024];

pub fn register(registry: &mut Registry) {
    registry.add(Recipe::image(
        "compress",
        Family::Compress,
        "Compress to a byte budget in the chosen format",
        Schema::new()
            .required_int("target-kb", 1, 10 * 1024, "byte budget in KiB")
            .choice(
                "format",
                &["auto", "jpeg", "png", "webp"],
                "auto",
                "output format; auto keeps the upload's format",
            ),
        |handle, params, ctx| {
            let target_kb = params
                .require_int("target-kb")
                .map_err(ToolError::InvalidParameter)? as u64;
            let format = match params.text("format").unwrap_or("auto") {
                "auto" => handle.source_format(),
                other => OutputFormat::parse(other)
                    .ok_or(ToolError::InvalidParameter(ParamError::Missing("format")))?,
            };
            run_engine(handle, format, target_kb, ctx)
        },
    ));

    for (id, format, summary) in [
        ("compress-jpeg", OutputFormat::Jpeg, "Compress to a byte budget as JPEG"),
        ("compress-png", OutputFormat::Png, "Compress to a byte budget as PNG"),
        ("compress-webp", OutputFormat::Webp, "Compress to a byte budget as WebP"),
    ] {
        registry.add(Recipe::image(
            id,
            Family::Compress,
            summary,
            Schema::new().required_int("target-kb", 1, 10 * 1024, "byte budget in KiB"),
            move |handle, params, ctx| {
                let target_kb = params
                    .require_int("target-kb")
                    .map_err(ToolError::InvalidParameter)? as u64;
                run_engine(handle, format, target_kb, ctx)
            },
        ));
    }

    for &kb in PRESET_BUDGETS_KB {
        let id = format!("compress-to-{kb}kb");
        registry.add(Recipe::image(
            id,
            Family::Compress,
            format!("Compress to at most {kb} KiB, keeping the upload's format"),
            Schema::new(),
            move |handle, _params, ctx| run_engine(handle, handle.source_format(), kb, ctx),
        ));
    }
}

fn run_engine(
    handle: &ImageHandle,
    format: OutputFormat,
    target_kb: u64,
    ctx: &RecipeCtx,
) -> Result<RecipeOutput, ToolError> {
    let target = CompressionTarget::new(target_kb * 1024, format, ctx.codec);
    let result = compress_to_size(handle.image(), &target, ctx.codec)?;

    let mut extra = Diagnostics::new();
    extra.insert("target_bytes".into(), target.target_bytes.to_string());
    extra.insert("achieved_bytes".into(), result.achieved_bytes.to_string());
    extra.insert("quality".into(), result.quality_used.to_string());
    extra.insert("converged".into(), result.converged.to_string());
    extra.insert("trials".into(), result.trials.to_string());
    Ok(RecipeOutput::Encoded {
        bytes: result.bytes,
        format,
        extra,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::codec::CodecConfig;
    use crate::imaging::handle::RawImage;
    use crate::params::RawParams;
    use crate::test_helpers::{gradient_png, textured_jpeg};

    fn run(id: &str, input: Vec<u8>, pairs: &[(&str, &str)]) -> (Vec<u8>, OutputFormat, Diagnostics) {
        let mut registry = Registry::default();
        register(&mut registry);
        let recipe = registry.get(id).unwrap();
        let handle = ImageHandle::decode(&RawImage::new(input)).unwrap();
        let raw: RawParams = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let params = recipe.schema().resolve(&raw, 300.0).unwrap();
        let codec = CodecConfig::default();
        let ctx = RecipeCtx {
            codec: &codec,
            dpi: 300.0,
            raw_bytes: &[],
            recognizer: None,
        };
        match recipe.apply(&handle, &params, &ctx).unwrap() {
            RecipeOutput::Encoded { bytes, format, extra } => (bytes, format, extra),
            _ => panic!("expected encoded output"),
        }
    }

    #[test]
    fn compress_auto_keeps_upload_format() {
        let (bytes, format, _) = run("compress", textured_jpeg(320, 240), &[("target-kb", "512")]);
        assert_eq!(format, OutputFormat::Jpeg);
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn compress_reports_engine_diagnostics() {
        let (_, _, extra) = run("compress", textured_jpeg(320, 240), &[("target-kb", "8")]);
        assert!(extra.contains_key("achieved_bytes"));
        assert!(extra.contains_key("quality"));
        assert!(extra.contains_key("converged"));
        assert!(extra["trials"].parse::<u32>().unwrap() <= 10);
    }

    #[test]
    fn preset_carries_its_budget() {
        let (bytes, _, extra) = run("compress-to-100kb", textured_jpeg(320, 240), &[]);
        assert_eq!(extra["target_bytes"], (100 * 1024).to_string());
        assert_eq!(extra["achieved_bytes"], bytes.len().to_string());
    }

    #[test]
    fn compress_png_outputs_png() {
        let (bytes, format, _) = run(
            "compress",
            gradient_png(64, 64),
            &[("target-kb", "64"), ("format", "png")],
        );
        assert_eq!(format, OutputFormat::Png);
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn preset_table_registers_all_budgets() {
        let mut registry = Registry::default();
        register(&mut registry);
        for kb in PRESET_BUDGETS_KB {
            assert!(registry.get(&format!("compress-to-{kb}kb")).is_some());
        }
    }
}

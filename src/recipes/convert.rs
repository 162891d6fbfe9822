//! Format conversion and re-encoding tools.

use super::{Diagnostics, Family, Recipe, RecipeOutput, Registry};
use crate::dispatch::ToolError;
use crate::imaging::codec::OutputFormat;
use crate::imaging::density;
use crate::params::{ParamError, Schema};

pub fn register(registry: &mut Registry) {
    registry.add(Recipe::image(
        "convert",
        Family::Convert,
        "Re-encode into another format",
        Schema::new()
            .required_choice("format", &["jpeg", "png", "webp"], "output format")
            .int("quality", 1, 100, 90, "lossy quality, default 90"),
        |handle, params, _ctx| {
            let format = params
                .text("format")
                .and_then(OutputFormat::parse)
                .ok_or(ToolError::InvalidParameter(ParamError::Missing("format")))?;
            Ok(RecipeOutput::Image {
                image: handle.image().clone(),
                format,
                quality: params.int("quality").map(|q| q as u8),
                extra: Diagnostics::new(),
            })
        },
    ));

    for (id, format, summary) in [
        ("to-jpeg", OutputFormat::Jpeg, "Re-encode as JPEG"),
        ("to-png", OutputFormat::Png, "Re-encode as PNG"),
        ("to-webp", OutputFormat::Webp, "Re-encode as lossy WebP"),
    ] {
        registry.add(Recipe::image(
            id,
            Family::Convert,
            summary,
            Schema::new().int("quality", 1, 100, 90, "lossy quality, default 90"),
            move |handle, params, _ctx| {
                Ok(RecipeOutput::Image {
                    image: handle.image().clone(),
                    format,
                    quality: params.int("quality").map(|q| q as u8),
                    extra: Diagnostics::new(),
                })
            },
        ));
    }

    registry.add(Recipe::image(
        "quality",
        Family::Convert,
        "Re-encode in place at an explicit quality",
        Schema::new().required_int("quality", 1, 100, "lossy quality"),
        |handle, params, _ctx| {
            let quality = params
                .require_int("quality")
                .map_err(ToolError::InvalidParameter)? as u8;
            // PNG has no quality knob; re-encoding a PNG upload "at quality"
            // routes through JPEG, which is what callers of this tool want.
            let format = if handle.source_format().supports_quality() {
                handle.source_format()
            } else {
                OutputFormat::Jpeg
            };
            Ok(RecipeOutput::Image {
                image: handle.image().clone(),
                format,
                quality: Some(quality),
                extra: Diagnostics::new(),
            })
        },
    ));

    registry.add(Recipe::image(
        "set-dpi",
        Family::Convert,
        "Rewrite the declared print density (output is JPEG)",
        Schema::new().required_int("dpi", 1, 1200, "declared dots per inch"),
        |handle, params, ctx| {
            let dpi = params.require_int("dpi").map_err(ToolError::InvalidParameter)? as u16;

            // JPEG uploads keep their encoded pixels: only the JFIF header
            // density field is patched. Anything else is re-encoded to JPEG
            // first, whose JFIF segment is then patched the same way.
            let mut bytes = if handle.source_format() == OutputFormat::Jpeg {
                ctx.raw_bytes.to_vec()
            } else {
                crate::imaging::codec::encode_jpeg(handle.image(), ctx.codec.default_quality)?
            };
            if !density::set_jfif_density(&mut bytes, dpi) {
                // No JFIF APP0 in the upload (e.g. Exif-only JPEG): re-encode
                // to get one, then patch.
                bytes = crate::imaging::codec::encode_jpeg(handle.image(), ctx.codec.default_quality)?;
                if !density::set_jfif_density(&mut bytes, dpi) {
                    return Err(ToolError::Codec(crate::imaging::codec::CodecError::Encode {
                        format: "jpeg",
                        detail: "encoder produced no JFIF segment to patch".into(),
                    }));
                }
            }
            let mut extra = Diagnostics::new();
            extra.insert("declared_dpi".into(), dpi.to_string());
            Ok(RecipeOutput::Encoded {
                bytes,
                format: OutputFormat::Jpeg,
                extra,
            })
        },
    ));
}

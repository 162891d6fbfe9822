//! End-to-end dispatch tests: routing totality over the whole registry,
//! the grid-composite scenario, JSON tools, and the resource-release
//! invariant.

use image::{GenericImageView, RgbImage};
use imgpress::collab::{RecognizeError, TextRecognizer};
use imgpress::config::ServiceConfig;
use imgpress::dispatch::{Dispatcher, ToolError, ToolOutput};
use imgpress::imaging::handle::RawImage;
use imgpress::params::RawParams;
use std::io::Cursor;

fn portrait_jpeg(width: u32, height: u32) -> Vec<u8> {
    use image::{ExtendedColorType, ImageEncoder};
    let img = RgbImage::from_fn(width, height, |x, y| {
        let n = x.wrapping_mul(0x9E37_79B9) ^ y.wrapping_mul(0x85EB_CA6B);
        image::Rgb([
            (x * 255 / width) as u8,
            (y * 255 / height) as u8,
            (n >> 13) as u8,
        ])
    });
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut out), 90)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    out
}

fn params(pairs: &[(&str, &str)]) -> RawParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Parameters satisfying every required field any registered tool
/// declares, so the totality sweep can drive all of them.
fn kitchen_sink() -> RawParams {
    params(&[
        ("width", "35mm"),
        ("height", "45mm"),
        ("percent", "50"),
        ("quality", "80"),
        ("target-kb", "50"),
        ("format", "jpeg"),
        ("x", "1"),
        ("y", "1"),
        ("dpi", "300"),
        ("angle", "90"),
        ("quantity", "2"),
    ])
}

#[test]
fn every_registered_tool_dispatches_cleanly() {
    let dispatcher = Dispatcher::new(ServiceConfig::default());
    let raw = RawImage::new(portrait_jpeg(600, 800));
    let sink = kitchen_sink();

    let ids: Vec<String> = dispatcher
        .registry()
        .iter()
        .map(|r| r.id().to_string())
        .collect();
    assert!(ids.len() >= 90, "tool table unexpectedly small: {}", ids.len());

    for id in ids {
        let result = dispatcher.dispatch(&id, &raw, &sink);
        match result {
            Ok(ToolOutput::Image(encoded)) => {
                assert!(!encoded.bytes.is_empty(), "{id} returned empty bytes");
                assert!(!encoded.content_type.is_empty());
            }
            Ok(ToolOutput::Json(body)) => {
                assert!(body.get("success").is_some(), "{id} JSON lacks success");
            }
            Err(e) => panic!("{id} failed under the kitchen-sink params: {e}"),
        }
        assert_eq!(dispatcher.live_scopes(), 0, "{id} leaked a scope");
    }
}

#[test]
fn unknown_tool_is_rejected_without_codec_work() {
    let dispatcher = Dispatcher::new(ServiceConfig::default());
    // Undecodable bytes prove the rejection happens before decode.
    let raw = RawImage::new(b"definitely not an image".to_vec());
    let err = dispatcher
        .dispatch("not-a-real-tool", &raw, &RawParams::new())
        .unwrap_err();
    assert!(matches!(err, ToolError::UnknownTool(_)));
    assert_eq!(err.status(), 400);
    assert_eq!(dispatcher.live_scopes(), 0);
}

#[test]
fn passport_sheet_of_five_builds_three_by_two_grid() {
    let dispatcher = Dispatcher::new(ServiceConfig::default());
    let raw = RawImage::new(portrait_jpeg(1200, 1600));
    let out = dispatcher
        .dispatch(
            "passport-photo",
            &raw,
            &params(&[
                ("width", "2in"),
                ("height", "2in"),
                ("quantity", "5"),
                ("dpi", "300"),
            ]),
        )
        .unwrap();

    let ToolOutput::Image(encoded) = out else {
        panic!("expected image output");
    };
    assert_eq!(encoded.diagnostics["grid"], "3x2");
    assert_eq!(encoded.diagnostics["copies_placed"], "5");

    let sheet = image::load_from_memory(&encoded.bytes).unwrap();
    // ceil(sqrt(5)) = 3 columns of 600px, ceil(5/3) = 2 rows of 600px.
    assert_eq!((sheet.width(), sheet.height()), (1800, 1200));

    // The sixth cell was never placed: its center stays at the white
    // background (JPEG wobble aside).
    let spare = sheet.get_pixel(1500, 900);
    assert!(
        spare[0] > 240 && spare[1] > 240 && spare[2] > 240,
        "spare cell is not background: {spare:?}"
    );
    // A placed cell holds image content.
    let placed = sheet.get_pixel(300, 300);
    assert!(
        placed[0] < 240 || placed[1] < 240 || placed[2] < 240,
        "placed cell looks like background: {placed:?}"
    );
}

#[test]
fn compress_tool_reports_convergence_diagnostics() {
    let dispatcher = Dispatcher::new(ServiceConfig::default());
    let raw = RawImage::new(portrait_jpeg(1000, 750));
    let out = dispatcher
        .dispatch("compress", &raw, &params(&[("target-kb", "30")]))
        .unwrap();
    let ToolOutput::Image(encoded) = out else {
        panic!("expected image output");
    };
    for key in ["target_bytes", "achieved_bytes", "quality", "converged", "trials"] {
        assert!(encoded.diagnostics.contains_key(key), "missing {key}");
    }
    assert_eq!(
        encoded.diagnostics["achieved_bytes"],
        encoded.bytes.len().to_string()
    );
}

#[test]
fn physical_unit_resize_round_trips_through_dpi() {
    let dispatcher = Dispatcher::new(ServiceConfig::default());
    let raw = RawImage::new(portrait_jpeg(2000, 2000));
    // 5cm at 300 DPI → 591px.
    let out = dispatcher
        .dispatch(
            "resize",
            &raw,
            &params(&[("width", "5cm"), ("height", "5cm"), ("mode", "exact")]),
        )
        .unwrap();
    let ToolOutput::Image(encoded) = out else {
        panic!("expected image output");
    };
    assert_eq!(encoded.diagnostics["output_width"], "591");
}

#[test]
fn json_error_bodies_are_structured() {
    let dispatcher = Dispatcher::new(ServiceConfig::default());
    let raw = RawImage::new(portrait_jpeg(100, 100));
    let err = dispatcher
        .dispatch("resize", &raw, &RawParams::new())
        .unwrap_err();
    assert_eq!(err.status(), 400);
    let body = err.to_json();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("width"));
}

struct CannedRecognizer;

impl TextRecognizer for CannedRecognizer {
    fn recognize(&self, _image_bytes: &[u8], language: &str) -> Result<String, RecognizeError> {
        Ok(format!("recognized in {language}"))
    }
}

#[test]
fn ocr_routes_through_the_configured_engine() {
    let dispatcher =
        Dispatcher::new(ServiceConfig::default()).with_recognizer(Box::new(CannedRecognizer));
    let raw = RawImage::new(portrait_jpeg(100, 100));
    let out = dispatcher
        .dispatch("ocr", &raw, &params(&[("language", "deu")]))
        .unwrap();
    let ToolOutput::Json(body) = out else {
        panic!("expected json output");
    };
    assert_eq!(body["success"], true);
    assert_eq!(body["text"], "recognized in deu");
}

#[test]
fn ocr_without_engine_still_succeeds_as_json() {
    let dispatcher = Dispatcher::new(ServiceConfig::default());
    let raw = RawImage::new(portrait_jpeg(100, 100));
    let out = dispatcher.dispatch("ocr", &raw, &RawParams::new()).unwrap();
    let ToolOutput::Json(body) = out else {
        panic!("expected json output");
    };
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("no text recognition"));
}

#[test]
fn concurrent_requests_serialize_and_release() {
    use std::sync::Arc;
    let dispatcher = Arc::new(Dispatcher::new(ServiceConfig::default()));
    let bytes = portrait_jpeg(800, 600);

    let mut handles = Vec::new();
    for i in 0..6 {
        let dispatcher = Arc::clone(&dispatcher);
        let bytes = bytes.clone();
        handles.push(std::thread::spawn(move || {
            let raw = RawImage::new(bytes);
            let tool = if i % 2 == 0 { "grayscale" } else { "rotate-90" };
            dispatcher.dispatch(tool, &raw, &RawParams::new()).unwrap();
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(dispatcher.live_scopes(), 0);
    assert!(dispatcher.gate().try_acquire().is_some());
}

#[test]
fn batch_style_sequential_requests_write_to_disk() {
    // Mirrors what the CLI batch path does per file; pins down that
    // outputs really land as decodable files of the advertised type.
    let dispatcher = Dispatcher::new(ServiceConfig::default());
    let dir = tempfile::TempDir::new().unwrap();
    let raw = RawImage::new(portrait_jpeg(320, 240));

    for tool in ["to-webp", "to-png"] {
        let out = dispatcher.dispatch(tool, &raw, &RawParams::new()).unwrap();
        let ToolOutput::Image(encoded) = out else {
            panic!("expected image output");
        };
        let path = dir.path().join(&encoded.suggested_filename);
        std::fs::write(&path, &encoded.bytes).unwrap();
        let reloaded = image::load_from_memory(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (320, 240));
    }
}

#[test]
fn oversized_upload_respects_configured_ceiling() {
    let mut config = ServiceConfig::default();
    config.limits.max_upload_bytes = 4096;
    let dispatcher = Dispatcher::new(config);
    let raw = RawImage::new(portrait_jpeg(600, 600));
    assert!(raw.len() > 4096, "fixture must exceed the test ceiling");
    let err = dispatcher
        .dispatch("grayscale", &raw, &RawParams::new())
        .unwrap_err();
    assert!(matches!(err, ToolError::PayloadTooLarge { .. }));
    assert_eq!(err.status(), 413);
}

#[test]
fn output_format_follows_conversion_tools() {
    let dispatcher = Dispatcher::new(ServiceConfig::default());
    let raw = RawImage::new(portrait_jpeg(64, 64));

    let ToolOutput::Image(webp) = dispatcher
        .dispatch("to-webp", &raw, &RawParams::new())
        .unwrap()
    else {
        panic!("expected image output");
    };
    assert_eq!(webp.content_type, "image/webp");
    assert_eq!(&webp.bytes[..4], b"RIFF");
    assert_eq!(webp.suggested_filename, "to-webp.webp");

    let ToolOutput::Image(png) = dispatcher
        .dispatch("to-png", &raw, &RawParams::new())
        .unwrap()
    else {
        panic!("expected image output");
    };
    assert_eq!(png.content_type, "image/png");
    assert_eq!(&png.bytes[..4], &[0x89, b'P', b'N', b'G']);
}

#[test]
fn mismatched_declared_mime_is_sniffed_not_trusted() {
    let dispatcher = Dispatcher::new(ServiceConfig::default());
    let raw = RawImage::with_mime(portrait_jpeg(64, 64), "image/png");
    let ToolOutput::Json(body) = dispatcher
        .dispatch("inspect", &raw, &RawParams::new())
        .unwrap()
    else {
        panic!("expected json output");
    };
    assert_eq!(body["format"], "jpeg");
}

//! The dispatcher: one entry point for every tool request.
//!
//! `dispatch` resolves the tool, decodes the upload exactly once,
//! validates parameters against the recipe's schema, runs the transform
//! under the process-wide gate, and shapes the response. Every error a
//! request can produce is a [`ToolError`] variant with an HTTP status
//! mapping — requests never surface panics or untyped failures.
//!
//! Checks run cheapest-first: empty body, size ceiling and tool lookup
//! all reject before any codec work happens.

use crate::collab::TextRecognizer;
use crate::config::ServiceConfig;
use crate::imaging::codec::{self, CodecConfig, CodecError, OutputFormat};
use crate::imaging::handle::{ImageHandle, RawImage};
use crate::lifecycle::{Phase, RequestScope, ScopeCounter, TransformGate};
use crate::params::{ParamError, RawParams};
use crate::recipes::{Diagnostics, RecipeCtx, RecipeOutput, Registry};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("no image file provided")]
    NoFileProvided,
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(#[from] ParamError),
    #[error("upload of {size} bytes exceeds the {limit} byte ceiling")]
    PayloadTooLarge { size: u64, limit: u64 },
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl ToolError {
    /// HTTP status the upstream layer maps this error to. Codec detail
    /// suppression outside development mode is that layer's job; the
    /// error itself always carries the detail.
    pub fn status(&self) -> u16 {
        match self {
            ToolError::NoFileProvided
            | ToolError::UnknownTool(_)
            | ToolError::InvalidParameter(_) => 400,
            ToolError::PayloadTooLarge { .. } => 413,
            ToolError::UnsupportedFormat(_) => 415,
            ToolError::Codec(_) => 500,
        }
    }

    /// Structured error body for the JSON response path.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "success": false,
            "status": self.status(),
            "error": self.to_string(),
        })
    }
}

/// An image response: bytes plus everything the HTTP layer needs to
/// write headers. Diagnostics travel as a JSON-encoded string in a
/// custom response header, keeping the body a pure byte stream.
#[derive(Debug)]
pub struct EncodedOutput {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub suggested_filename: String,
    pub diagnostics: Diagnostics,
}

impl EncodedOutput {
    pub fn diagnostics_json(&self) -> String {
        serde_json::to_string(&self.diagnostics).unwrap_or_default()
    }

    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.suggested_filename)
    }
}

/// A completed request: image bytes or a JSON body, per the recipe's
/// declared output kind.
#[derive(Debug)]
pub enum ToolOutput {
    Image(EncodedOutput),
    Json(serde_json::Value),
}

/// The service core. Built once at startup; owns the registry, the
/// immutable codec tuning, the transform gate and the scope counter —
/// all the shared state there is.
pub struct Dispatcher {
    registry: Registry,
    config: ServiceConfig,
    codec: CodecConfig,
    gate: TransformGate,
    scopes: ScopeCounter,
    recognizer: Option<Box<dyn TextRecognizer>>,
}

impl Dispatcher {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            registry: Registry::standard(),
            codec: config.codec_config(),
            config,
            gate: TransformGate::new(),
            scopes: ScopeCounter::new(),
            recognizer: None,
        }
    }

    /// Plug in a text-recognition engine for the `ocr` tool.
    pub fn with_recognizer(mut self, recognizer: Box<dyn TextRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gate(&self) -> &TransformGate {
        &self.gate
    }

    /// Requests currently holding buffers; zero whenever idle.
    pub fn live_scopes(&self) -> usize {
        self.scopes.live()
    }

    /// Run one tool request end to end.
    pub fn dispatch(
        &self,
        tool_id: &str,
        raw: &RawImage,
        params: &RawParams,
    ) -> Result<ToolOutput, ToolError> {
        let mut scope = RequestScope::begin(&self.scopes);
        // The scope drops on every path below, so Released always runs.
        self.run(tool_id, raw, params, &mut scope)
    }

    fn run(
        &self,
        tool_id: &str,
        raw: &RawImage,
        params: &RawParams,
        scope: &mut RequestScope,
    ) -> Result<ToolOutput, ToolError> {
        if raw.is_empty() {
            return Err(ToolError::NoFileProvided);
        }
        let limit = self.config.limits.max_upload_bytes;
        if raw.len() > limit {
            return Err(ToolError::PayloadTooLarge {
                size: raw.len(),
                limit,
            });
        }
        let recipe = self
            .registry
            .get(tool_id)
            .ok_or_else(|| ToolError::UnknownTool(tool_id.to_string()))?;

        scope.advance(Phase::Decoding);
        let handle = ImageHandle::decode(raw).map_err(|e| match e {
            CodecError::UnsupportedFormat(detail) => ToolError::UnsupportedFormat(detail),
            other => ToolError::Codec(other),
        })?;

        let dpi = resolve_dpi(params, &handle, self.config.geometry.default_dpi);
        let validated = recipe.schema().resolve(params, dpi)?;

        // Heavy section: transform and encode run serialized process-wide.
        let permit = self.gate.acquire();
        scope.advance(Phase::Transforming);
        let ctx = RecipeCtx {
            codec: &self.codec,
            dpi,
            raw_bytes: &raw.bytes,
            recognizer: self.recognizer.as_deref(),
        };
        let output = recipe.apply(&handle, &validated, &ctx)?;

        let response = match output {
            RecipeOutput::Json(body) => {
                // No encode step on the JSON path.
                drop(permit);
                ToolOutput::Json(body)
            }
            RecipeOutput::Image {
                image,
                format,
                quality,
                extra,
            } => {
                scope.advance(Phase::Encoding);
                let quality = quality.unwrap_or(self.codec.default_quality);
                let bytes = codec::encode(&image, format, quality)?;
                drop(permit);
                ToolOutput::Image(self.shape_response(
                    tool_id,
                    raw.len(),
                    bytes,
                    format,
                    Some(quality),
                    Some((image.width(), image.height())),
                    dpi,
                    extra,
                ))
            }
            RecipeOutput::Encoded {
                bytes,
                format,
                extra,
            } => {
                scope.advance(Phase::Encoding);
                drop(permit);
                ToolOutput::Image(self.shape_response(
                    tool_id, raw.len(), bytes, format, None, None, dpi, extra,
                ))
            }
        };
        scope.advance(Phase::Responding);
        Ok(response)
    }

    #[allow(clippy::too_many_arguments)]
    fn shape_response(
        &self,
        tool_id: &str,
        original_bytes: u64,
        bytes: Vec<u8>,
        format: OutputFormat,
        quality: Option<u8>,
        dims: Option<(u32, u32)>,
        dpi: f64,
        extra: Diagnostics,
    ) -> EncodedOutput {
        let mut diagnostics = extra;
        diagnostics.insert("tool".into(), tool_id.to_string());
        diagnostics.insert("original_bytes".into(), original_bytes.to_string());
        diagnostics.insert("output_bytes".into(), bytes.len().to_string());
        diagnostics.insert("working_dpi".into(), format!("{dpi}"));
        if let Some(q) = quality {
            diagnostics.entry("quality".into()).or_insert(q.to_string());
        }
        if let Some((w, h)) = dims {
            diagnostics.insert("output_width".into(), w.to_string());
            diagnostics.insert("output_height".into(), h.to_string());
        }
        EncodedOutput {
            bytes,
            content_type: format.mime(),
            suggested_filename: format!("{tool_id}.{}", format.extension()),
            diagnostics,
        }
    }
}

/// Working DPI for a request: explicit `dpi` param → density declared by
/// the image → configured default.
fn resolve_dpi(params: &RawParams, handle: &ImageHandle, default_dpi: f64) -> f64 {
    if let Some(requested) = params.get("dpi").and_then(|s| s.trim().parse::<f64>().ok())
        && (1.0..=2400.0).contains(&requested)
    {
        return requested;
    }
    handle.dpi_or(default_dpi)
}

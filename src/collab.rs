//! Collaborator interfaces consumed by JSON-returning tools.
//!
//! Text recognition is an external engine, not part of the core: the
//! dispatcher only needs a pure `bytes + language → text` function, so
//! that is the whole seam. Deployments plug an engine in at startup;
//! without one, the `ocr` tool reports a structured failure instead of
//! erroring the request.

use std::fmt;

/// A text-recognition engine. Implementations must not keep per-call
/// state; the dispatcher treats recognition as a pure function.
pub trait TextRecognizer: Send + Sync {
    /// Extract text from raw image bytes. `language` is an engine hint
    /// (e.g. `"eng"`); engines may ignore it.
    fn recognize(&self, image_bytes: &[u8], language: &str) -> Result<String, RecognizeError>;
}

/// Opaque engine failure, surfaced in the tool's JSON body.
#[derive(Debug, Clone)]
pub struct RecognizeError(pub String);

impl fmt::Display for RecognizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "text recognition failed: {}", self.0)
    }
}

impl std::error::Error for RecognizeError {}

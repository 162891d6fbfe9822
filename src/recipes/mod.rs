//! Tool recipes and the registry that dispatches to them.
//!
//! A recipe is a named, stateless transform: decoded image + validated
//! parameters → output. All ~100 tools share the one
//! decode/transform/encode pipeline; what varies per tool is the schema
//! and the `apply` function, registered once at process start. The
//! string-keyed match of the original service is replaced by this table
//! — each entry is independently constructible and unit-testable.
//!
//! Families:
//!
//! | Family | Module | Examples |
//! |---|---|---|
//! | Resize | [`resize`] | `resize`, `crop-face`, `rotate-90`, social-size presets |
//! | Effects | [`effects`] | `grayscale`, `blur`, `border` |
//! | Convert | [`convert`] | `to-webp`, `quality`, `set-dpi` |
//! | Compress | [`compressors`] | `compress`, `compress-to-100kb` |
//! | Document | [`document`] | `passport-photo`, `print-sheet`, country presets |
//! | Inspect | [`inspect`] | `inspect`, `color-at`, `ocr` (JSON responses) |

pub mod compressors;
pub mod convert;
pub mod document;
pub mod effects;
pub mod inspect;
pub mod resize;

use crate::collab::TextRecognizer;
use crate::dispatch::ToolError;
use crate::imaging::codec::{CodecConfig, OutputFormat};
use crate::imaging::handle::ImageHandle;
use crate::params::{Schema, TransformParams};
use image::DynamicImage;
use std::collections::BTreeMap;

/// Tool family, used for grouping in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Family {
    Resize,
    Effects,
    Convert,
    Compress,
    Document,
    Inspect,
}

impl Family {
    pub fn name(self) -> &'static str {
        match self {
            Family::Resize => "resize",
            Family::Effects => "effects",
            Family::Convert => "convert",
            Family::Compress => "compress",
            Family::Document => "document",
            Family::Inspect => "inspect",
        }
    }
}

/// Whether a tool answers with image bytes or a JSON body. The
/// dispatcher routes the response path on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Image,
    Json,
}

/// Extra per-tool diagnostics merged into the response diagnostics map.
pub type Diagnostics = BTreeMap<String, String>;

/// Per-request context handed to recipes alongside the decoded image.
pub struct RecipeCtx<'a> {
    pub codec: &'a CodecConfig,
    /// Working DPI resolved for this request (param → declared → default).
    pub dpi: f64,
    /// The upload as received, for tools that patch headers or hand the
    /// original bytes to a collaborator.
    pub raw_bytes: &'a [u8],
    pub recognizer: Option<&'a dyn TextRecognizer>,
}

/// What a recipe hands back to the dispatcher.
#[derive(Debug)]
pub enum RecipeOutput {
    /// A transformed surface; the dispatcher encodes it. `quality: None`
    /// means the configured default.
    Image {
        image: DynamicImage,
        format: OutputFormat,
        quality: Option<u8>,
        extra: Diagnostics,
    },
    /// Bytes the recipe already encoded (compression results, header
    /// patches) — passed through untouched.
    Encoded {
        bytes: Vec<u8>,
        format: OutputFormat,
        extra: Diagnostics,
    },
    /// A JSON body for inspection-style tools.
    Json(serde_json::Value),
}

type ApplyFn =
    Box<dyn Fn(&ImageHandle, &TransformParams, &RecipeCtx) -> Result<RecipeOutput, ToolError> + Send + Sync>;

/// A registered tool.
pub struct Recipe {
    id: String,
    family: Family,
    summary: String,
    kind: OutputKind,
    schema: Schema,
    apply: ApplyFn,
}

impl Recipe {
    pub fn image(
        id: impl Into<String>,
        family: Family,
        summary: impl Into<String>,
        schema: Schema,
        apply: impl Fn(&ImageHandle, &TransformParams, &RecipeCtx) -> Result<RecipeOutput, ToolError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            family,
            summary: summary.into(),
            kind: OutputKind::Image,
            schema,
            apply: Box::new(apply),
        }
    }

    pub fn json(
        id: impl Into<String>,
        family: Family,
        summary: impl Into<String>,
        schema: Schema,
        apply: impl Fn(&ImageHandle, &TransformParams, &RecipeCtx) -> Result<RecipeOutput, ToolError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            family,
            summary: summary.into(),
            kind: OutputKind::Json,
            schema,
            apply: Box::new(apply),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn apply(
        &self,
        handle: &ImageHandle,
        params: &TransformParams,
        ctx: &RecipeCtx,
    ) -> Result<RecipeOutput, ToolError> {
        (self.apply)(handle, params, ctx)
    }
}

/// The tool table: string id → recipe, built once at process start.
#[derive(Default)]
pub struct Registry {
    entries: BTreeMap<String, Recipe>,
}

impl Registry {
    /// Build the full standard tool set.
    pub fn standard() -> Self {
        let mut registry = Registry::default();
        resize::register(&mut registry);
        effects::register(&mut registry);
        convert::register(&mut registry);
        compressors::register(&mut registry);
        document::register(&mut registry);
        inspect::register(&mut registry);
        registry
    }

    pub(crate) fn add(&mut self, recipe: Recipe) {
        let prior = self.entries.insert(recipe.id.clone(), recipe);
        debug_assert!(prior.is_none(), "duplicate tool id registered");
    }

    pub fn get(&self, id: &str) -> Option<&Recipe> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recipes in id order (BTreeMap iteration).
    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.entries.values()
    }
}

//! Typed tool parameters and per-recipe validation schemas.
//!
//! Raw parameters arrive as strings (multipart form fields upstream, `-p
//! key=value` on the CLI) and are validated against the recipe's
//! [`Schema`] before the recipe runs. The fallback policy is deliberate:
//! optional fields with unusable values silently fall back to their
//! documented defaults, while required geometry fields are hard errors —
//! a missing width is a caller mistake, a misspelled `sharpen=yse` is not
//! worth failing a whole upload over.
//!
//! Geometry fields accept a unit suffix (`px`, `mm`, `cm`, `in`) and are
//! normalized to pixels through the request's working DPI at resolution
//! time, so recipes only ever see pixels.

use crate::imaging::geometry::{self, Unit};
use std::collections::BTreeMap;
use thiserror::Error;

/// Ceiling on any normalized geometry value. Bounds canvas allocations
/// against absurd unit/DPI combinations (e.g. 100in at 1200 DPI).
pub const MAX_DIMENSION_PX: u32 = 20_000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    #[error("required parameter '{0}' is missing")]
    Missing(&'static str),
    #[error("parameter '{name}': {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Parameters as received, before validation.
pub type RawParams = BTreeMap<String, String>;

/// A validated, typed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    /// A geometry value, already normalized to pixels.
    Px(u32),
    Text(String),
    Choice(&'static str),
    /// RGBA color.
    Color([u8; 4]),
    Flag(bool),
}

/// What a schema field accepts.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    /// Positive length with optional unit suffix; normalized to pixels.
    Dimension,
    Choice(&'static [&'static str]),
    Color,
    Text,
    Flag,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<ParamValue>,
    pub help: &'static str,
}

/// Per-recipe parameter schema. Unknown keys in the raw input are
/// ignored — callers may post extra form fields freely.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// A geometry field that must be present and valid.
    pub fn required_dimension(self, name: &'static str, help: &'static str) -> Self {
        self.push(FieldSpec {
            name,
            kind: FieldKind::Dimension,
            required: true,
            default: None,
            help,
        })
    }

    /// An optional geometry field, absent unless supplied.
    pub fn dimension(self, name: &'static str, help: &'static str) -> Self {
        self.push(FieldSpec {
            name,
            kind: FieldKind::Dimension,
            required: false,
            default: None,
            help,
        })
    }

    pub fn int(
        self,
        name: &'static str,
        min: i64,
        max: i64,
        default: i64,
        help: &'static str,
    ) -> Self {
        self.push(FieldSpec {
            name,
            kind: FieldKind::Int { min, max },
            required: false,
            default: Some(ParamValue::Int(default)),
            help,
        })
    }

    pub fn required_int(self, name: &'static str, min: i64, max: i64, help: &'static str) -> Self {
        self.push(FieldSpec {
            name,
            kind: FieldKind::Int { min, max },
            required: true,
            default: None,
            help,
        })
    }

    pub fn float(
        self,
        name: &'static str,
        min: f64,
        max: f64,
        default: f64,
        help: &'static str,
    ) -> Self {
        self.push(FieldSpec {
            name,
            kind: FieldKind::Float { min, max },
            required: false,
            default: Some(ParamValue::Float(default)),
            help,
        })
    }

    pub fn required_float(
        self,
        name: &'static str,
        min: f64,
        max: f64,
        help: &'static str,
    ) -> Self {
        self.push(FieldSpec {
            name,
            kind: FieldKind::Float { min, max },
            required: true,
            default: None,
            help,
        })
    }

    pub fn required_choice(
        self,
        name: &'static str,
        options: &'static [&'static str],
        help: &'static str,
    ) -> Self {
        self.push(FieldSpec {
            name,
            kind: FieldKind::Choice(options),
            required: true,
            default: None,
            help,
        })
    }

    pub fn choice(
        self,
        name: &'static str,
        options: &'static [&'static str],
        default: &'static str,
        help: &'static str,
    ) -> Self {
        self.push(FieldSpec {
            name,
            kind: FieldKind::Choice(options),
            required: false,
            default: Some(ParamValue::Choice(default)),
            help,
        })
    }

    pub fn color(self, name: &'static str, default: [u8; 4], help: &'static str) -> Self {
        self.push(FieldSpec {
            name,
            kind: FieldKind::Color,
            required: false,
            default: Some(ParamValue::Color(default)),
            help,
        })
    }

    pub fn flag(self, name: &'static str, default: bool, help: &'static str) -> Self {
        self.push(FieldSpec {
            name,
            kind: FieldKind::Flag,
            required: false,
            default: Some(ParamValue::Flag(default)),
            help,
        })
    }

    pub fn text(self, name: &'static str, help: &'static str) -> Self {
        self.push(FieldSpec {
            name,
            kind: FieldKind::Text,
            required: false,
            default: None,
            help,
        })
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Validate raw parameters into typed values, normalizing geometry
    /// through `dpi`. Required fields fail hard; optional fields fall
    /// back to their defaults on any parse problem.
    pub fn resolve(&self, raw: &RawParams, dpi: f64) -> Result<TransformParams, ParamError> {
        let mut values = BTreeMap::new();
        for field in &self.fields {
            match raw.get(field.name).map(|s| s.trim()).filter(|s| !s.is_empty()) {
                Some(text) => match parse_value(&field.kind, text, dpi) {
                    Ok(value) => {
                        values.insert(field.name, value);
                    }
                    Err(reason) if field.required => {
                        return Err(ParamError::Invalid {
                            name: field.name,
                            reason,
                        });
                    }
                    Err(_) => {
                        if let Some(default) = &field.default {
                            values.insert(field.name, default.clone());
                        }
                    }
                },
                None if field.required => return Err(ParamError::Missing(field.name)),
                None => {
                    if let Some(default) = &field.default {
                        values.insert(field.name, default.clone());
                    }
                }
            }
        }
        Ok(TransformParams { values })
    }
}

fn parse_value(kind: &FieldKind, text: &str, dpi: f64) -> Result<ParamValue, String> {
    match kind {
        FieldKind::Int { min, max } => {
            let v: i64 = text.parse().map_err(|_| format!("'{text}' is not an integer"))?;
            if v < *min || v > *max {
                return Err(format!("{v} is outside {min}..={max}"));
            }
            Ok(ParamValue::Int(v))
        }
        FieldKind::Float { min, max } => {
            let v: f64 = text.parse().map_err(|_| format!("'{text}' is not a number"))?;
            if !v.is_finite() || v < *min || v > *max {
                return Err(format!("{v} is outside {min}..={max}"));
            }
            Ok(ParamValue::Float(v))
        }
        FieldKind::Dimension => parse_dimension(text, dpi).map(ParamValue::Px),
        FieldKind::Choice(options) => options
            .iter()
            .copied()
            .find(|o| o.eq_ignore_ascii_case(text))
            .map(ParamValue::Choice)
            .ok_or_else(|| format!("'{text}' is not one of {options:?}")),
        FieldKind::Color => parse_color(text).map(ParamValue::Color),
        FieldKind::Text => Ok(ParamValue::Text(text.to_string())),
        FieldKind::Flag => match text.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(ParamValue::Flag(true)),
            "false" | "no" | "off" | "0" => Ok(ParamValue::Flag(false)),
            other => Err(format!("'{other}' is not a boolean")),
        },
    }
}

/// Parse a length like `800`, `800px`, `35mm`, `4.5cm`, `2in` into pixels.
fn parse_dimension(text: &str, dpi: f64) -> Result<u32, String> {
    let split = text
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let (number, suffix) = text.split_at(split);
    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| format!("'{text}' is not a length"))?;
    let unit = Unit::from_suffix(suffix.trim())
        .ok_or_else(|| format!("unknown unit '{}'", suffix.trim()))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("length must be positive, got '{text}'"));
    }
    let px = geometry::to_pixels(value, unit, dpi).round();
    if px < 1.0 {
        return Err(format!("'{text}' is smaller than one pixel at {dpi} DPI"));
    }
    if px > MAX_DIMENSION_PX as f64 {
        return Err(format!(
            "'{text}' exceeds the {MAX_DIMENSION_PX}px dimension ceiling at {dpi} DPI"
        ));
    }
    Ok(px as u32)
}

fn parse_color(text: &str) -> Result<[u8; 4], String> {
    match text.to_ascii_lowercase().as_str() {
        "white" => return Ok([255, 255, 255, 255]),
        "black" => return Ok([0, 0, 0, 255]),
        "gray" | "grey" => return Ok([128, 128, 128, 255]),
        "red" => return Ok([255, 0, 0, 255]),
        "green" => return Ok([0, 128, 0, 255]),
        "blue" => return Ok([0, 0, 255, 255]),
        "transparent" => return Ok([0, 0, 0, 0]),
        _ => {}
    }
    let hex = text
        .strip_prefix('#')
        .ok_or_else(|| format!("'{text}' is not a color (use #rrggbb or a name)"))?;
    let parse_byte = |s: &str| u8::from_str_radix(s, 16).map_err(|_| format!("bad hex in '{text}'"));
    match hex.len() {
        6 => Ok([
            parse_byte(&hex[0..2])?,
            parse_byte(&hex[2..4])?,
            parse_byte(&hex[4..6])?,
            255,
        ]),
        8 => Ok([
            parse_byte(&hex[0..2])?,
            parse_byte(&hex[2..4])?,
            parse_byte(&hex[4..6])?,
            parse_byte(&hex[6..8])?,
        ]),
        _ => Err(format!("'{text}' must be 6 or 8 hex digits")),
    }
}

/// Validated parameters, ready for a recipe.
#[derive(Debug, Clone, Default)]
pub struct TransformParams {
    values: BTreeMap<&'static str, ParamValue>,
}

impl TransformParams {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn px(&self, name: &str) -> Option<u32> {
        match self.values.get(name)? {
            ParamValue::Px(v) => Some(*v),
            _ => None,
        }
    }

    /// A required geometry field. The schema guarantees presence, so a
    /// miss here means the recipe asked for a field it never declared.
    pub fn require_px(&self, name: &'static str) -> Result<u32, ParamError> {
        self.px(name).ok_or(ParamError::Missing(name))
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name)? {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn require_int(&self, name: &'static str) -> Result<i64, ParamError> {
        self.int(name).ok_or(ParamError::Missing(name))
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        match self.values.get(name)? {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            ParamValue::Text(v) => Some(v),
            ParamValue::Choice(v) => Some(v),
            _ => None,
        }
    }

    pub fn color(&self, name: &str) -> Option<[u8; 4]> {
        match self.values.get(name)? {
            ParamValue::Color(v) => Some(*v),
            _ => None,
        }
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.values.get(name)? {
            ParamValue::Flag(v) => Some(*v),
            _ => None,
        }
    }
}

/// Build raw params from `key=value` pairs (CLI convenience).
pub fn raw_from_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> RawParams {
    pairs
        .into_iter()
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            Some((k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> RawParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn required_dimension_missing_is_hard_error() {
        let schema = Schema::new().required_dimension("width", "target width");
        let err = schema.resolve(&raw(&[]), 300.0).unwrap_err();
        assert_eq!(err, ParamError::Missing("width"));
    }

    #[test]
    fn required_dimension_non_numeric_is_hard_error() {
        let schema = Schema::new().required_dimension("width", "target width");
        let err = schema.resolve(&raw(&[("width", "wide")]), 300.0).unwrap_err();
        assert!(matches!(err, ParamError::Invalid { name: "width", .. }));
    }

    #[test]
    fn optional_invalid_falls_back_to_default() {
        let schema = Schema::new().int("quality", 1, 100, 90, "encode quality");
        let params = schema.resolve(&raw(&[("quality", "soup")]), 300.0).unwrap();
        assert_eq!(params.int("quality"), Some(90));
    }

    #[test]
    fn optional_out_of_range_falls_back_to_default() {
        let schema = Schema::new().int("quality", 1, 100, 90, "encode quality");
        let params = schema.resolve(&raw(&[("quality", "400")]), 300.0).unwrap();
        assert_eq!(params.int("quality"), Some(90));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let schema = Schema::new().int("quality", 1, 100, 90, "encode quality");
        let params = schema
            .resolve(&raw(&[("csrf_token", "abc"), ("quality", "80")]), 300.0)
            .unwrap();
        assert_eq!(params.int("quality"), Some(80));
        assert!(params.get("csrf_token").is_none());
    }

    #[test]
    fn dimension_units_normalize_at_dpi() {
        let schema = Schema::new()
            .required_dimension("width", "w")
            .required_dimension("height", "h");
        let params = schema
            .resolve(&raw(&[("width", "2in"), ("height", "35mm")]), 300.0)
            .unwrap();
        assert_eq!(params.px("width"), Some(600));
        assert_eq!(params.px("height"), Some(413));
    }

    #[test]
    fn dimension_bare_number_is_pixels() {
        let schema = Schema::new().required_dimension("width", "w");
        let params = schema.resolve(&raw(&[("width", "800")]), 300.0).unwrap();
        assert_eq!(params.px("width"), Some(800));
        let params = schema.resolve(&raw(&[("width", "800px")]), 72.0).unwrap();
        assert_eq!(params.px("width"), Some(800));
    }

    #[test]
    fn dimension_rejects_zero_and_negative() {
        let schema = Schema::new().required_dimension("width", "w");
        assert!(schema.resolve(&raw(&[("width", "0")]), 300.0).is_err());
        assert!(schema.resolve(&raw(&[("width", "-5mm")]), 300.0).is_err());
    }

    #[test]
    fn dimension_rejects_absurd_canvas() {
        let schema = Schema::new().required_dimension("width", "w");
        let err = schema.resolve(&raw(&[("width", "100in")]), 1200.0).unwrap_err();
        assert!(matches!(err, ParamError::Invalid { .. }));
    }

    #[test]
    fn choice_is_case_insensitive_with_fallback() {
        let schema = Schema::new().choice("mode", &["fit", "fill", "exact"], "fit", "resize mode");
        let params = schema.resolve(&raw(&[("mode", "FILL")]), 300.0).unwrap();
        assert_eq!(params.text("mode"), Some("fill"));
        let params = schema.resolve(&raw(&[("mode", "stretch")]), 300.0).unwrap();
        assert_eq!(params.text("mode"), Some("fit"));
    }

    #[test]
    fn color_hex_and_names() {
        let schema = Schema::new().color("background", [255, 255, 255, 255], "bg");
        let params = schema.resolve(&raw(&[("background", "#336699")]), 300.0).unwrap();
        assert_eq!(params.color("background"), Some([0x33, 0x66, 0x99, 255]));
        let params = schema.resolve(&raw(&[("background", "black")]), 300.0).unwrap();
        assert_eq!(params.color("background"), Some([0, 0, 0, 255]));
        let params = schema.resolve(&raw(&[("background", "#00000000")]), 300.0).unwrap();
        assert_eq!(params.color("background"), Some([0, 0, 0, 0]));
    }

    #[test]
    fn flag_spellings() {
        let schema = Schema::new().flag("sharpen", false, "sharpen output");
        for yes in ["true", "YES", "on", "1"] {
            let params = schema.resolve(&raw(&[("sharpen", yes)]), 300.0).unwrap();
            assert_eq!(params.flag("sharpen"), Some(true), "{yes}");
        }
        let params = schema.resolve(&raw(&[("sharpen", "maybe")]), 300.0).unwrap();
        assert_eq!(params.flag("sharpen"), Some(false));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let schema = Schema::new().required_dimension("width", "w");
        let err = schema.resolve(&raw(&[("width", "  ")]), 300.0).unwrap_err();
        assert_eq!(err, ParamError::Missing("width"));
    }

    #[test]
    fn pairs_helper_parses_cli_params() {
        let raw = raw_from_pairs(["width=35mm", "mode=fill", "garbage"]);
        assert_eq!(raw.get("width").map(String::as_str), Some("35mm"));
        assert_eq!(raw.get("mode").map(String::as_str), Some("fill"));
        assert_eq!(raw.len(), 2);
    }
}

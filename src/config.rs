//! Service configuration module.
//!
//! Handles loading and validating `config.toml`. Configuration is flat:
//! one optional file, stock defaults for everything else. User config
//! files are sparse — override just the values you want:
//!
//! ```toml
//! # Only raise the upload ceiling
//! [limits]
//! max_upload_bytes = 20971520
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [limits]
//! max_upload_bytes = 10485760  # Upload ceiling (10 MiB)
//!
//! [geometry]
//! default_dpi = 300.0          # Used when neither request nor image declares one
//!
//! [compression]
//! default_quality = 90         # Encode quality when a tool doesn't pick one
//! quality_floor = 10           # Lower bound of the byte-budget search
//! quality_ceiling = 100        # Upper bound of the byte-budget search
//! max_probes = 10              # Hard cap on encode trials per request
//! tolerance_percent = 5        # Accepted band around a byte target
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::codec::CodecConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub limits: LimitsConfig,
    pub geometry: GeometryConfig,
    pub compression: CompressionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Uploads larger than this are rejected before decode.
    pub max_upload_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeometryConfig {
    /// DPI assumed when neither the request nor the image declares one.
    pub default_dpi: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self { default_dpi: 300.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    pub default_quality: u8,
    pub quality_floor: u8,
    pub quality_ceiling: u8,
    pub max_probes: u32,
    pub tolerance_percent: u8,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        let codec = CodecConfig::default();
        Self {
            default_quality: codec.default_quality,
            quality_floor: codec.quality_floor,
            quality_ceiling: codec.quality_ceiling,
            max_probes: codec.max_probes,
            tolerance_percent: codec.tolerance_percent,
        }
    }
}

impl ServiceConfig {
    /// Load from a TOML file, validating after parse.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: ServiceConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file when given, stock defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.compression;
        if !(1..=100).contains(&c.quality_floor) || !(1..=100).contains(&c.quality_ceiling) {
            return Err(ConfigError::Validation(
                "compression quality bounds must be within 1..=100".into(),
            ));
        }
        if c.quality_floor > c.quality_ceiling {
            return Err(ConfigError::Validation(format!(
                "quality_floor ({}) must not exceed quality_ceiling ({})",
                c.quality_floor, c.quality_ceiling
            )));
        }
        if !(1..=100).contains(&c.default_quality) {
            return Err(ConfigError::Validation(
                "default_quality must be within 1..=100".into(),
            ));
        }
        if c.max_probes == 0 {
            return Err(ConfigError::Validation("max_probes must be at least 1".into()));
        }
        if c.tolerance_percent > 50 {
            return Err(ConfigError::Validation(
                "tolerance_percent above 50 makes every result 'converged'".into(),
            ));
        }
        if !(1.0..=2400.0).contains(&self.geometry.default_dpi) {
            return Err(ConfigError::Validation(
                "default_dpi must be within 1..=2400".into(),
            ));
        }
        if self.limits.max_upload_bytes < 1024 {
            return Err(ConfigError::Validation(
                "max_upload_bytes below 1 KiB rejects every real image".into(),
            ));
        }
        Ok(())
    }

    /// The immutable codec tuning handed to the dispatcher at startup.
    pub fn codec_config(&self) -> CodecConfig {
        CodecConfig {
            default_quality: self.compression.default_quality,
            quality_floor: self.compression.quality_floor,
            quality_ceiling: self.compression.quality_ceiling,
            max_probes: self.compression.max_probes,
            tolerance_percent: self.compression.tolerance_percent,
        }
    }
}

/// A fully documented stock config, printable via `gen-config`.
pub fn stock_config_toml() -> String {
    r#"# imgpress configuration
# All options are optional - the values below are the defaults.

[limits]
# Uploads larger than this are rejected before any decode is attempted.
max_upload_bytes = 10485760

[geometry]
# DPI assumed when neither the request nor the image declares one.
# Physical units (mm/cm/in) in tool parameters convert through this.
default_dpi = 300.0

[compression]
# Encode quality used when a tool does not pick one.
default_quality = 90
# Bounds of the byte-budget quality search.
quality_floor = 10
quality_ceiling = 100
# Hard cap on encode trials per byte-budget request.
max_probes = 10
# A result within this percentage of the byte target counts as converged.
tolerance_percent = 5
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ServiceConfig::default().validate().unwrap();
    }

    #[test]
    fn stock_toml_parses_back_to_defaults() {
        let parsed: ServiceConfig = toml::from_str(&stock_config_toml()).unwrap();
        parsed.validate().unwrap();
        assert_eq!(parsed.limits.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(parsed.geometry.default_dpi, 300.0);
        assert_eq!(parsed.compression.max_probes, 10);
    }

    #[test]
    fn sparse_override_keeps_other_defaults() {
        let parsed: ServiceConfig = toml::from_str(
            r#"
            [compression]
            quality_floor = 20
            "#,
        )
        .unwrap();
        assert_eq!(parsed.compression.quality_floor, 20);
        assert_eq!(parsed.compression.quality_ceiling, 100);
        assert_eq!(parsed.limits.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<ServiceConfig, _> = toml::from_str(
            r#"
            [limits]
            max_upload_byts = 1000
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn inverted_quality_bounds_fail_validation() {
        let mut config = ServiceConfig::default();
        config.compression.quality_floor = 80;
        config.compression.quality_ceiling = 40;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_probes_fail_validation() {
        let mut config = ServiceConfig::default();
        config.compression.max_probes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn codec_config_mirrors_compression_section() {
        let mut config = ServiceConfig::default();
        config.compression.default_quality = 75;
        config.compression.max_probes = 6;
        let codec = config.codec_config();
        assert_eq!(codec.default_quality, 75);
        assert_eq!(codec.max_probes, 6);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = ServiceConfig::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}

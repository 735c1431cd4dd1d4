//! Server configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user file passed with `--config` is merged on top, so it
//! only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! name = "ImageProcessor"     # Reported in the initialize handshake
//!
//! [paths]
//! require_absolute = true     # Reject relative image paths
//! normalize_separators = true # Treat both / and \ as separators
//!
//! [processing]
//! overwrite = true            # Replace outputs left by an earlier run
//!
//! [encoding]
//! jpeg_quality = 80           # JPEG quality when a request gives none (1-100)
//! avif_quality = 50           # AVIF quality when a request gives none (1-100)
//! avif_speed = 6              # AVIF encoder speed (1 = slowest, 10 = fastest)
//!
//! [logging]
//! level = "info"              # Overridden by RUST_LOG when set
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{EncodingDefaults, Quality};
use crate::tools::PathRules;
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

/// Server configuration loaded from `config.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub paths: PathsConfig,
    pub processing: ProcessingConfig,
    pub encoding: EncodingConfig,
    pub logging: LoggingConfig,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl ServerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.name must not be empty".into(),
            ));
        }
        for (key, value) in [
            ("encoding.jpeg_quality", self.encoding.jpeg_quality),
            ("encoding.avif_quality", self.encoding.avif_quality),
        ] {
            if !(1..=100).contains(&value) {
                return Err(ConfigError::Validation(format!("{key} must be 1-100")));
            }
        }
        if !(1..=10).contains(&self.encoding.avif_speed) {
            return Err(ConfigError::Validation(
                "encoding.avif_speed must be 1-10".into(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }

    pub fn path_rules(&self) -> PathRules {
        PathRules {
            require_absolute: self.paths.require_absolute,
            normalize_separators: self.paths.normalize_separators,
        }
    }

    pub fn encoding_defaults(&self) -> EncodingDefaults {
        EncodingDefaults {
            jpeg_quality: Quality::new(self.encoding.jpeg_quality),
            avif_quality: Quality::new(self.encoding.avif_quality),
            avif_speed: self.encoding.avif_speed,
        }
    }
}

/// Identity reported to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub name: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: "ImageProcessor".to_string(),
        }
    }
}

/// How incoming image paths are interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub require_absolute: bool,
    pub normalize_separators: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            require_absolute: true,
            normalize_separators: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// When false, an existing output file fails that item instead of being
    /// replaced.
    pub overwrite: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self { overwrite: true }
    }
}

/// Encoder settings used when a request does not give its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    pub jpeg_quality: u32,
    pub avif_quality: u32,
    pub avif_speed: u8,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        let defaults = EncodingDefaults::default();
        Self {
            jpeg_quality: defaults.jpeg_quality.value(),
            avif_quality: defaults.avif_quality.value(),
            avif_speed: defaults.avif_speed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ServerConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ServerConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ServerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective config.
///
/// Without a path the stock defaults are used. A given path must exist.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let overlay = path.map(load_raw_config).transpose()?;
    resolve_config(stock_defaults_value(), overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Image Tools Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Pass the file with: image-tools --config config.toml serve
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Server identity
# ---------------------------------------------------------------------------
[server]
# Name reported to clients during the initialize handshake.
name = "ImageProcessor"

# ---------------------------------------------------------------------------
# Input paths
# ---------------------------------------------------------------------------
[paths]
# Reject relative paths. Outputs are written next to their inputs, so a
# relative path would resolve against the server's working directory.
require_absolute = true

# Rewrite both "/" and "\" to the host separator before use.
normalize_separators = true

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Replace outputs left by an earlier run. When false, an existing output
# file fails that item.
overwrite = true

# ---------------------------------------------------------------------------
# Encoder defaults (used when a request does not set its own)
# ---------------------------------------------------------------------------
[encoding]
# JPEG quality (1 = worst, 100 = best).
jpeg_quality = 80

# AVIF quality (1 = worst, 100 = best).
avif_quality = 50

# AVIF encoder speed (1 = slowest/smallest, 10 = fastest).
avif_speed = 6

# ---------------------------------------------------------------------------
# Logging (written to stderr)
# ---------------------------------------------------------------------------
[logging]
# One of: trace, debug, info, warn, error. RUST_LOG takes precedence.
level = "info"
"##
}

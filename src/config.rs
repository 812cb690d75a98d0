//! Application configuration.
//!
//! Loaded from `print-finish.toml` (or the path given with `--config`).
//! Stock defaults are the base layer; the user's file is merged on top of it,
//! so a config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! root = "finished"          # One subdirectory per material is created here
//!
//! [compositing]
//! dpi = 300                  # Print resolution
//! wrap_cm = 2.8              # Gallery-wrap edge folded around the stretcher bar
//! white_cm = 1.2             # White margin outside the wrap
//! black_px = 4               # Black cutting outline around the sheet
//! font_px = 85               # Order number size in points
//! crop_px = 9                # Rim trimmed from every source image
//! # font_path = "arial.ttf"  # TrueType font for the order number
//! # icc_profile = "sRGB.icc" # Profile embedded when the source has none
//!
//! [cropper]
//! # command = "crop-tool"    # External manual crop tool (disabled when absent)
//! poll_interval_ms = 250     # How often the workflow checks for its result
//!
//! [processing]
//! max_processes = 4          # Parallel renders in batch mode (omit for auto)
//! ```
//!
//! Unknown keys are rejected to catch typos early. Every numeric value is
//! range-checked by [`AppConfig::validate`] before anything is rendered.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "print-finish.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Where finished print files go.
    pub output: OutputConfig,
    /// Print geometry and rendering settings.
    pub compositing: CompositingSettings,
    /// External manual crop tool.
    pub cropper: CropperConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compositing.validate()?;
        if !(10..=60_000).contains(&self.cropper.poll_interval_ms) {
            return Err(ConfigError::Validation(
                "cropper.poll_interval_ms must be 10-60000".into(),
            ));
        }
        if self.output.root.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "output.root must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Output location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub root: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("finished"),
        }
    }
}

/// Numbers that drive the compositing pipeline.
///
/// Centimetre values are converted to pixels at `dpi` by
/// [`crate::imaging::cm_to_px`], the single conversion used everywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompositingSettings {
    pub dpi: u32,
    pub wrap_cm: f64,
    pub white_cm: f64,
    pub black_px: u32,
    /// Order number size in points (1/72 inch) at `dpi`.
    pub font_px: u32,
    /// Rim trimmed from every side when no explicit crop is given.
    pub crop_px: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
    /// ICC profile to embed when the source image carries none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icc_profile: Option<PathBuf>,
}

impl Default for CompositingSettings {
    fn default() -> Self {
        Self {
            dpi: 300,
            wrap_cm: 2.8,
            white_cm: 1.2,
            black_px: 4,
            font_px: 85,
            crop_px: 9,
            font_path: None,
            icc_profile: None,
        }
    }
}

impl CompositingSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(50..=1200).contains(&self.dpi) {
            return Err(ConfigError::Validation(
                "compositing.dpi must be 50-1200".into(),
            ));
        }
        if !(self.wrap_cm > 0.0 && self.wrap_cm <= 20.0) {
            return Err(ConfigError::Validation(
                "compositing.wrap_cm must be greater than 0 and at most 20".into(),
            ));
        }
        if !(0.0..=20.0).contains(&self.white_cm) {
            return Err(ConfigError::Validation(
                "compositing.white_cm must be 0-20".into(),
            ));
        }
        if self.black_px > 200 {
            return Err(ConfigError::Validation(
                "compositing.black_px must be 0-200".into(),
            ));
        }
        if !(1..=1000).contains(&self.font_px) {
            return Err(ConfigError::Validation(
                "compositing.font_px must be 1-1000".into(),
            ));
        }
        if self.crop_px > 500 {
            return Err(ConfigError::Validation(
                "compositing.crop_px must be 0-500".into(),
            ));
        }
        Ok(())
    }
}

/// External crop tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropperConfig {
    /// Program launched for manual cropping. `None` disables the cropper:
    /// items that need it are skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<PathBuf>,
    pub poll_interval_ms: u64,
}

impl Default for CropperConfig {
    fn default() -> Self {
        Self {
            command: None,
            poll_interval_ms: 250,
        }
    }
}

impl CropperConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel renders in batch mode.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
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

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge user values on top of stock defaults, reject unknown keys, validate.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let merged = match load_raw_config(path)? {
        Some(overlay) => merge_toml(stock_defaults_value(), overlay),
        None => stock_defaults_value(),
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock config file.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# print-finish configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Finished files land in <root>/<material>/, e.g. finished/Banner/.
root = "finished"

# ---------------------------------------------------------------------------
# Print geometry
# ---------------------------------------------------------------------------
[compositing]
# Print resolution. Every centimetre value below is converted at this dpi.
dpi = 300

# Gallery-wrap depth: mirrored image edge that folds around the frame.
wrap_cm = 2.8

# White margin outside the wrap, used for stapling and handling.
white_cm = 1.2

# Black outline drawn around the whole sheet as a cutting guide.
black_px = 4

# Order number size, in points at the print dpi.
font_px = 85

# Thin rim removed from every side of the source image before resizing.
crop_px = 9

# TrueType font for the order number. A built-in font is used when the
# file is missing.
# font_path = "arial.ttf"

# ICC profile embedded when the customer's photo carries none. A compact
# built-in sRGB profile is used when this is not set.
# icc_profile = "/usr/share/color/icc/sRGB.icc"

# ---------------------------------------------------------------------------
# Manual crop tool
# ---------------------------------------------------------------------------
[cropper]
# External program for manual cropping. It receives the image path and the
# prefilled order details and prints a JSON result on stdout. Without it,
# images that need a manual crop are skipped.
# command = "crop-tool"

# How often (milliseconds) the workflow checks whether the tool finished.
poll_interval_ms = 250

# ---------------------------------------------------------------------------
# Parallel processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel renders for `render`. Omit to use all CPU cores.
# max_processes = 4
"##
}

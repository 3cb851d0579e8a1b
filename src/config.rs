//! Run configuration.
//!
//! Handles loading, validating, and merging `variants.toml`. Stock defaults
//! are serialized to a TOML value and the user's file is merged on top of it
//! key by key, so a config file only needs the values it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! input_dir = "input"
//! output_dir = "output"
//! backends = ["tuned"]          # tuned, basic, kraken, kraken-sdk
//!
//! [sizes]                       # empty list = category skipped
//! thumbnails = [{ width = 200, quality = 80 }, { width = 400, quality = 80 }]
//! grid = [{ width = 800, quality = 82 }]
//! fullpage = [{ width = 1600, quality = 85 }]
//!
//! [kraken]
//! api_key = ""                  # or KRAKEN_API_KEY
//! api_secret = ""               # or KRAKEN_API_SECRET
//! endpoint = "https://api.kraken.io/v1"
//! timeout_secs = 120
//! max_attempts = 3
//! retry_backoff_ms = 500
//!
//! [processing]
//! max_processes = 4             # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Credentials
//!
//! `KRAKEN_API_KEY` and `KRAKEN_API_SECRET` take precedence over the file, so
//! secrets can stay out of version control.
//!
//! Unknown keys are rejected to catch typos early.

use crate::factory::{BackendKind, UnsupportedBackend};
use crate::remote::{Credentials, DEFAULT_ENDPOINT, RemoteSettings, RetryPolicy};
use crate::sizes::{ImageSize, SizeConfiguration, SizeError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "variants.toml";
pub const API_KEY_ENV: &str = "KRAKEN_API_KEY";
pub const API_SECRET_ENV: &str = "KRAKEN_API_SECRET";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Size configuration error: {0}")]
    Size(#[from] SizeError),
    #[error(transparent)]
    Backend(#[from] UnsupportedBackend),
}

/// Configuration loaded from `variants.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VariantsConfig {
    /// Directory holding the source images (not searched recursively).
    pub input_dir: PathBuf,
    /// Root under which `<Backend>/<category>/<width>/` trees are written.
    pub output_dir: PathBuf,
    /// Backends to run, in order. Each gets a full batch.
    pub backends: Vec<String>,
    pub sizes: SizesConfig,
    pub kraken: KrakenConfig,
    pub processing: ProcessingConfig,
}

impl Default for VariantsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            backends: vec![BackendKind::Tuned.id().to_string()],
            sizes: SizesConfig::default(),
            kraken: KrakenConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl VariantsConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backends.is_empty() {
            return Err(ConfigError::Validation("backends must not be empty".into()));
        }
        self.backend_kinds()?;
        self.size_configuration()?;
        if self.kraken.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "kraken.timeout_secs must be positive".into(),
            ));
        }
        if self.kraken.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "kraken.max_attempts must be at least 1".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn backend_kinds(&self) -> Result<Vec<BackendKind>, UnsupportedBackend> {
        self.backends.iter().map(|b| b.parse()).collect()
    }

    /// Size sets in their fixed category order.
    pub fn size_configuration(&self) -> Result<SizeConfiguration, SizeError> {
        SizeConfiguration::new()
            .with_set("thumbnails", self.sizes.thumbnails.clone())?
            .with_set("grid", self.sizes.grid.clone())?
            .with_set("fullpage", self.sizes.fullpage.clone())
    }

    /// Replace credentials with values found by `lookup`, when non-empty.
    ///
    /// `load_config` passes the process environment; tests pass a map.
    pub fn apply_credential_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.kraken.api_key = key;
        }
        if let Some(secret) = lookup(API_SECRET_ENV).filter(|v| !v.is_empty()) {
            self.kraken.api_secret = secret;
        }
    }
}

/// Target sizes per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SizesConfig {
    pub thumbnails: Vec<ImageSize>,
    pub grid: Vec<ImageSize>,
    pub fullpage: Vec<ImageSize>,
}

impl Default for SizesConfig {
    fn default() -> Self {
        // Constant, always-valid sizes.
        let size = |width, quality| ImageSize::new(width, quality).ok();
        Self {
            thumbnails: [size(200, 80), size(400, 80)].into_iter().flatten().collect(),
            grid: [size(800, 82)].into_iter().flatten().collect(),
            fullpage: [size(1600, 85)].into_iter().flatten().collect(),
        }
    }
}

/// Remote service settings shared by the `kraken` and `kraken-sdk` backends.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KrakenConfig {
    pub api_key: String,
    pub api_secret: String,
    pub endpoint: String,
    /// Per-request timeout, upload and download alike.
    pub timeout_secs: u64,
    /// Attempts per remote call, including the first.
    pub max_attempts: u32,
    /// Backoff before the first retry; doubles after each further failure.
    pub retry_backoff_ms: u64,
}

impl Default for KrakenConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 120,
            max_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl std::fmt::Debug for KrakenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KrakenConfig")
            .field("credentials", &self.credentials())
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

impl KrakenConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.api_key.clone(), self.api_secret.clone())
    }

    pub fn remote_settings(&self) -> RemoteSettings {
        RemoteSettings {
            endpoint: self.endpoint.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                backoff: Duration::from_millis(self.retry_backoff_ms),
            },
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers for parallel backends.
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
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Stock defaults as a TOML value, the base every config file merges onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(VariantsConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so a size list
///   in the overlay replaces the whole default list.
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
/// Returns `Ok(None)` if the file doesn't exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<VariantsConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: VariantsConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `path` over stock defaults and apply credential env overrides.
///
/// A missing file is not an error: the stock defaults are used.
pub fn load_config(path: &Path) -> Result<VariantsConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    let mut config = resolve_config(base, overlay)?;
    config.apply_credential_overrides(|name| std::env::var(name).ok());
    Ok(config)
}

/// Returns a fully-commented stock `variants.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# WebP Variants Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Directory holding the source images. Only files directly inside it are
# processed (jpg, jpeg, png, tif, tiff, webp); hidden files are skipped.
input_dir = "input"

# Output root. Variants land in:
#   <output_dir>/<Backend>/<category>/<width>/<name>_<category>_<width>.webp
output_dir = "output"

# Backends to run, in order. Each one processes the whole input directory.
#   tuned       local codec, graded sharpening, lossless from quality 85
#   basic       local codec, fixed sharpening, always lossy
#   kraken      remote service, one upload per variant
#   kraken-sdk  remote service, one batch upload per file (sequential)
backends = ["tuned"]

# ---------------------------------------------------------------------------
# Target sizes
# ---------------------------------------------------------------------------
# Each category is a list of { width, quality }. Width is in pixels; sources
# narrower than the target are never upscaled. Quality is 0-100.
# An empty list skips the category.
[sizes]
thumbnails = [
    { width = 200, quality = 80 },
    { width = 400, quality = 80 },
]
grid = [
    { width = 800, quality = 82 },
]
fullpage = [
    { width = 1600, quality = 85 },
]

# ---------------------------------------------------------------------------
# Remote service (kraken, kraken-sdk)
# ---------------------------------------------------------------------------
[kraken]
# Prefer the KRAKEN_API_KEY / KRAKEN_API_SECRET environment variables;
# when set they override these values.
api_key = ""
api_secret = ""
endpoint = "https://api.kraken.io/v1"
# Per-request timeout in seconds.
timeout_secs = 120
# Attempts per remote call (uploads and downloads), including the first.
max_attempts = 3
# Delay before the first retry, doubled after each further failure.
retry_backoff_ms = 500

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers. Omit to use all CPU cores.
# Values above the core count are clamped down. The kraken-sdk backend
# always runs one file at a time.
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn parse(toml_str: &str) -> Result<VariantsConfig, ConfigError> {
        let overlay: toml::Value = toml::from_str(toml_str)?;
        resolve_config(stock_defaults_value()?, Some(overlay))
    }

    // =========================================================================
    // Defaults
    // =========================================================================

    #[test]
    fn default_config_is_valid() {
        VariantsConfig::default().validate().unwrap();
    }

    #[test]
    fn default_sizes_cover_all_categories() {
        let sizes = VariantsConfig::default().size_configuration().unwrap();
        let names: Vec<_> = sizes.active_sets().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["thumbnails", "grid", "fullpage"]);
        assert_eq!(sizes.variant_count(), 4);
    }

    #[test]
    fn stock_toml_matches_defaults() {
        let from_stock: VariantsConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(from_stock, VariantsConfig::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.get("sizes").is_some());
        assert!(val.get("kraken").is_some());
        assert!(val.get("processing").is_some());
        assert!(val.get("backends").is_some());
    }

    // =========================================================================
    // Parsing and overlay
    // =========================================================================

    #[test]
    fn partial_overlay_keeps_other_defaults() {
        let config = parse(
            r#"
[kraken]
timeout_secs = 30
"#,
        )
        .unwrap();
        assert_eq!(config.kraken.timeout_secs, 30);
        assert_eq!(config.kraken.max_attempts, 3);
        assert_eq!(config.sizes, SizesConfig::default());
    }

    #[test]
    fn size_list_replaces_default_list() {
        let config = parse(
            r#"
[sizes]
thumbnails = [{ width = 150, quality = 70 }]
fullpage = []
"#,
        )
        .unwrap();
        assert_eq!(config.sizes.thumbnails, vec![ImageSize::new(150, 70).unwrap()]);
        assert!(config.sizes.fullpage.is_empty());
        // grid untouched
        assert_eq!(config.sizes.grid, SizesConfig::default().grid);

        let sizes = config.size_configuration().unwrap();
        assert_eq!(sizes.active_sets().count(), 2);
    }

    #[test]
    fn quality_above_100_is_rejected() {
        let result = parse(
            r#"
[sizes]
grid = [{ width = 800, quality = 101 }]
"#,
        );
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn zero_width_is_rejected() {
        let result = parse(
            r#"
[sizes]
grid = [{ width = 0, quality = 80 }]
"#,
        );
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn duplicate_width_in_category_is_rejected() {
        let result = parse(
            r#"
[sizes]
grid = [{ width = 400, quality = 60 }, { width = 400, quality = 95 }]
"#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::Size(SizeError::DuplicateWidth { ref category, width: 400 }))
                if category == "grid"
        ));
    }

    #[test]
    fn unknown_key_rejected() {
        let result = parse(r#"colour = "red""#);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_size_field_rejected() {
        let result = parse(
            r#"
[sizes]
grid = [{ width = 800, quality = 80, height = 600 }]
"#,
        );
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_backend_rejected() {
        let result = parse(r#"backends = ["tuned", "imagemagick"]"#);
        assert!(matches!(result, Err(ConfigError::Backend(_))));
    }

    #[test]
    fn empty_backend_list_rejected() {
        let result = parse(r#"backends = []"#);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn zero_timeout_rejected() {
        let result = parse(
            r#"
[kraken]
timeout_secs = 0
"#,
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn zero_attempts_rejected() {
        let result = parse(
            r#"
[kraken]
max_attempts = 0
"#,
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn zero_max_processes_rejected() {
        let result = parse(
            r#"
[processing]
max_processes = 0
"#,
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn backend_kinds_in_configured_order() {
        let config = parse(r#"backends = ["kraken-sdk", "basic"]"#).unwrap();
        assert_eq!(
            config.backend_kinds().unwrap(),
            vec![BackendKind::KrakenSdk, BackendKind::Basic]
        );
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"output_dir = "out""#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"output_dir = "dist""#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("output_dir").unwrap().as_str(), Some("dist"));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[kraken]
timeout_secs = 120
max_attempts = 3
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[kraken]
max_attempts = 5
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let kraken = merged.get("kraken").unwrap();
        assert_eq!(kraken.get("max_attempts").unwrap().as_integer(), Some(5));
        assert_eq!(kraken.get("timeout_secs").unwrap().as_integer(), Some(120));
    }

    #[test]
    fn merge_toml_array_replaces() {
        let base: toml::Value = toml::from_str(r#"backends = ["tuned", "basic"]"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"backends = ["kraken"]"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("backends").unwrap().as_array().unwrap().len(), 1);
    }

    // =========================================================================
    // File loading
    // =========================================================================

    #[test]
    fn load_raw_config_returns_none_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let result = load_raw_config(&tmp.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn load_raw_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "this is [not toml").unwrap();
        assert!(matches!(load_raw_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r#"
input_dir = "photos"
backends = ["basic"]
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.input_dir, PathBuf::from("photos"));
        assert_eq!(config.backend_kinds().unwrap(), vec![BackendKind::Basic]);
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    #[test]
    fn env_overrides_file_credentials() {
        let mut config = parse(
            r#"
[kraken]
api_key = "file-key"
api_secret = "file-secret"
"#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = [(API_KEY_ENV, "env-key")].into_iter().collect();
        config.apply_credential_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.kraken.api_key, "env-key");
        assert_eq!(config.kraken.api_secret, "file-secret");
    }

    #[test]
    fn empty_env_value_does_not_override() {
        let mut config = VariantsConfig::default();
        config.kraken.api_key = "file-key".into();
        config.apply_credential_overrides(|_| Some(String::new()));
        assert_eq!(config.kraken.api_key, "file-key");
    }

    #[test]
    fn kraken_debug_hides_secret() {
        let mut config = KrakenConfig::default();
        config.api_secret = "hunter2".into();
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn remote_settings_from_kraken_section() {
        let config = parse(
            r#"
[kraken]
endpoint = "http://localhost:9000/v1"
timeout_secs = 10
max_attempts = 2
retry_backoff_ms = 50
"#,
        )
        .unwrap();
        let settings = config.kraken.remote_settings();
        assert_eq!(settings.endpoint, "http://localhost:9000/v1");
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert_eq!(settings.retry.max_attempts, 2);
        assert_eq!(settings.retry.backoff, Duration::from_millis(50));
    }

    // =========================================================================
    // Threads
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig {
            max_processes: None,
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }
}

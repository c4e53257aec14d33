//! Configuration loading and data folder resolution
//!
//! The TOML file is bootstrap-only: it is read once at startup and never
//! written back. Every section is optional and falls back to built-in defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "NAVRES_CONFIG";

/// Environment variable naming the data folder (outcome database lives here)
pub const DATA_FOLDER_ENV: &str = "NAVRES_DATA_FOLDER";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the outcome database (optional)
    #[serde(default)]
    pub data_folder: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Upstream provider API keys
    #[serde(default)]
    pub providers: ProviderKeys,

    /// Resolution engine tunables
    #[serde(default)]
    pub resolver: ResolverSettings,

    /// Extra known-location overrides, appended to the built-in table
    #[serde(default)]
    pub known_locations: Vec<KnownLocationEntry>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// API keys for the upstream geocoding sources
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderKeys {
    #[serde(default)]
    pub google_maps_api_key: Option<String>,
    #[serde(default)]
    pub google_places_api_key: Option<String>,
    #[serde(default)]
    pub geocodio_api_key: Option<String>,
}

/// Resolution engine tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Per-provider call timeout in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Blended confidence a cascade result must exceed to be accepted
    #[serde(default = "default_acceptance_threshold")]
    pub acceptance_threshold: f64,

    /// Observations a pattern needs before learned routing replaces the rule table
    #[serde(default = "default_min_observations")]
    pub min_observations: u64,

    /// Lifetime of cached provider results in seconds (0 disables caching)
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            provider_timeout_secs: default_provider_timeout_secs(),
            acceptance_threshold: default_acceptance_threshold(),
            min_observations: default_min_observations(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// One hand-curated known-location override
///
/// Matches when the upper-cased business name contains every fragment in
/// `name_fragments` and, if `phone_fragment` is set, the caller's phone digits
/// contain it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownLocationEntry {
    pub name_fragments: Vec<String>,
    #[serde(default)]
    pub phone_fragment: Option<String>,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    10
}

fn default_acceptance_threshold() -> f64 {
    0.6
}

fn default_min_observations() -> u64 {
    5
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

/// Load TOML configuration from `path`
///
/// A missing file yields the default configuration; an unreadable or
/// malformed file is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Resolve the config file path
///
/// Priority:
/// 1. Command-line argument
/// 2. `NAVRES_CONFIG` environment variable
/// 3. `<config dir>/navres/config.toml`
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("navres").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Resolve the data folder
///
/// Priority:
/// 1. Command-line argument
/// 2. `NAVRES_DATA_FOLDER` environment variable
/// 3. TOML `data_folder`
/// 4. OS-dependent default
pub fn resolve_data_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATA_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.data_folder {
        return path.clone();
    }

    default_data_folder()
}

/// Get OS-dependent default data folder path
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("navres"))
        .unwrap_or_else(|| PathBuf::from("./navres_data"))
}

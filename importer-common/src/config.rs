//! Client configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. TOML config file
//! 4. Compiled defaults (fallback)
//!
//! A missing or unreadable TOML file is not fatal: a warning is logged and
//! the remaining tiers are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable overriding the API base URL
pub const ENV_API_BASE: &str = "IMPORTER_API_BASE";
/// Environment variable holding the bearer token
pub const ENV_ACCESS_TOKEN: &str = "IMPORTER_ACCESS_TOKEN";
/// Environment variable pointing at an alternate TOML file
pub const ENV_CONFIG_PATH: &str = "IMPORTER_CONFIG";

/// Built-in defaults
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub api_base: String,
    pub request_timeout_secs: u64,
    pub event_capacity: usize,
    pub log_level: String,
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self {
            api_base: "https://public-api.wordpress.com/rest/v1.1".to_string(),
            request_timeout_secs: 30,
            event_capacity: 100,
            log_level: "info".to_string(),
        }
    }
}

/// Configuration file contents
///
/// Every field is optional; absent fields fall through to defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub api_base: Option<String>,

    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// EventBus channel capacity
    #[serde(default)]
    pub event_capacity: Option<usize>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_base: Option<String>,
    pub access_token: Option<String>,
    pub config_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Fully resolved client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: String,
    pub access_token: Option<String>,
    pub request_timeout: Duration,
    pub event_capacity: usize,
    pub log_level: String,
}

impl ClientConfig {
    /// Resolve configuration from CLI overrides, environment, TOML and defaults
    pub fn resolve(overrides: &ConfigOverrides) -> Self {
        let defaults = CompiledDefaults::default();

        let config_path = overrides
            .config_path
            .clone()
            .or_else(|| std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from))
            .or_else(default_config_path);

        let toml_config = match config_path {
            Some(path) if path.exists() => match load_toml_config(&path) {
                Ok(config) => {
                    info!("Loaded config file: {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Ignoring config file {}: {}", path.display(), e);
                    TomlConfig::default()
                }
            },
            Some(path) => {
                warn!("Config file not found: {} (using defaults)", path.display());
                TomlConfig::default()
            }
            None => TomlConfig::default(),
        };

        let api_base = overrides
            .api_base
            .clone()
            .or_else(|| non_empty_env(ENV_API_BASE))
            .or(toml_config.api_base)
            .unwrap_or(defaults.api_base);

        let access_token = overrides
            .access_token
            .clone()
            .or_else(|| non_empty_env(ENV_ACCESS_TOKEN))
            .or(toml_config.access_token);

        let log_level = overrides
            .log_level
            .clone()
            .unwrap_or(toml_config.logging.level);

        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token,
            request_timeout: Duration::from_secs(
                toml_config
                    .request_timeout_secs
                    .unwrap_or(defaults.request_timeout_secs),
            ),
            event_capacity: toml_config
                .event_capacity
                .filter(|c| *c > 0)
                .unwrap_or(defaults.event_capacity),
            log_level,
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Default configuration file path for the platform
///
/// `~/.config/site-importer/config.toml` on Linux, the platform config
/// directory elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("site-importer").join("config.toml"))
}

/// Read and parse a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `FINBOARD_*` environment overrides.

use crate::fetch::FetchConfig;
use crate::persist::DEFAULT_STATE_KEY;
use crate::widget::{DEFAULT_REFRESH_INTERVAL_SECS, HISTORY_CAPACITY};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub fetch: FetchSettings,

    #[serde(default)]
    pub refresh: RefreshSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the dashboard is persisted
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// `<data_dir>/<key>.json`
    #[default]
    File,
    /// `<data_dir>/finboard.db`
    Sqlite,
    /// Nothing is persisted
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "sqlite" => Ok(StorageBackend::Sqlite),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Dashboard persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Namespace key the widget collection is stored under
    #[serde(default = "default_state_key")]
    pub key: String,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("finboard").to_string_lossy().to_string())
        .unwrap_or_else(|| "./finboard_data".to_string())
}

fn default_state_key() -> String {
    DEFAULT_STATE_KEY.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
            key: default_state_key(),
        }
    }
}

/// HTTP fetch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchSettings {
    /// Request timeout; unset means no explicit timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    format!("Finboard/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            user_agent: default_user_agent(),
        }
    }
}

impl FetchSettings {
    /// Runtime fetcher configuration
    pub fn to_fetch_config(&self) -> FetchConfig {
        FetchConfig {
            timeout: self.timeout_secs.map(Duration::from_secs),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Refresh loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshSettings {
    /// Chart samples kept per widget
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Interval offered to new widgets, in seconds
    #[serde(default = "default_interval")]
    pub default_interval_secs: u64,
}

fn default_history_capacity() -> usize {
    HISTORY_CAPACITY
}

fn default_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            default_interval_secs: default_interval(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("finboard").join("config.toml")),
            Some(PathBuf::from("./finboard.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Storage overrides
        if let Some(data_dir) = var("FINBOARD_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }
        if let Some(backend) = var("FINBOARD_STORAGE_BACKEND") {
            match backend.parse() {
                Ok(b) => self.storage.backend = b,
                Err(e) => tracing::warn!("Ignoring FINBOARD_STORAGE_BACKEND: {}", e),
            }
        }
        if let Some(key) = var("FINBOARD_STORAGE_KEY") {
            self.storage.key = key;
        }

        // Fetch overrides
        if let Some(timeout) = var("FINBOARD_FETCH_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.fetch.timeout_secs = Some(secs);
            }
        }

        // Logging overrides
        if let Some(level) = var("FINBOARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("FINBOARD_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Finboard Configuration
#
# Environment variables override these settings:
# - FINBOARD_DATA_DIR
# - FINBOARD_STORAGE_BACKEND
# - FINBOARD_STORAGE_KEY
# - FINBOARD_FETCH_TIMEOUT_SECS
# - FINBOARD_LOG_LEVEL
# - FINBOARD_LOG_FORMAT

[storage]
# Where widgets are saved: file, sqlite, or memory
backend = "file"

# Directory for the saved dashboard
data_dir = "~/.local/share/finboard"

# Key the widget collection is stored under
key = "finboard-storage"

[fetch]
# Request timeout in seconds (unset: no explicit timeout)
# timeout_secs = 30

# User-Agent sent to data sources
user_agent = "Finboard/0.1"

[refresh]
# Chart samples kept per widget (in memory only)
history_capacity = 20

# Refresh interval for new widgets (seconds, minimum 5)
default_interval_secs = 60

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/finboard/finboard.log"
"#
    .to_string()
}

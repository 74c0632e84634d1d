//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::client::ClientConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Telemetry backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_login_url")]
    pub login_url: String,

    /// Per-request timeout; unset leaves the transport default
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_login_url() -> String {
    "http://localhost:5000/login".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            login_url: default_login_url(),
            request_timeout_secs: None,
        }
    }
}

impl ApiConfig {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_base: self.base_url.clone(),
            login_url: self.login_url.clone(),
            request_timeout_ms: self.request_timeout_secs.map(|secs| secs * 1000),
        }
    }
}

/// Refresh cycle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

fn default_interval() -> u64 {
    30
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// Session file configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_file")]
    pub file: String,
}

fn default_session_file() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("nodewatch").join("session.json").to_string_lossy().to_string())
        .unwrap_or_else(|| "./nodewatch_session.json".to_string())
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            file: default_session_file(),
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

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
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
            dirs::config_dir().map(|p| p.join("nodewatch").join("config.toml")),
            Some(PathBuf::from("/etc/nodewatch/config.toml")),
            Some(PathBuf::from("./config.toml")),
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

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // API overrides
        if let Some(url) = var("NODEWATCH_API_BASE") {
            self.api.base_url = url;
        }
        if let Some(url) = var("NODEWATCH_LOGIN_URL") {
            self.api.login_url = url;
        }
        if let Some(secs) = var("NODEWATCH_REQUEST_TIMEOUT_SECS") {
            match secs.parse() {
                Ok(s) => self.api.request_timeout_secs = Some(s),
                Err(_) => tracing::warn!("Ignoring invalid NODEWATCH_REQUEST_TIMEOUT_SECS={}", secs),
            }
        }

        // Refresh overrides
        if let Some(secs) = var("NODEWATCH_REFRESH_SECS") {
            match secs.parse() {
                Ok(s) => self.refresh.interval_secs = s,
                Err(_) => tracing::warn!("Ignoring invalid NODEWATCH_REFRESH_SECS={}", secs),
            }
        }

        // Session overrides
        if let Some(file) = var("NODEWATCH_SESSION_FILE") {
            self.session.file = file;
        }

        // Logging overrides
        if let Some(level) = var("NODEWATCH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("NODEWATCH_LOG_FORMAT") {
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

/// Initialise the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_logging(logging: &LoggingConfig) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("nodewatch={}", logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("Logging already initialised: {}", e);
    }
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Nodewatch Configuration
#
# Environment variables override these settings:
# - NODEWATCH_API_BASE
# - NODEWATCH_LOGIN_URL
# - NODEWATCH_REQUEST_TIMEOUT_SECS
# - NODEWATCH_REFRESH_SECS
# - NODEWATCH_SESSION_FILE
# - NODEWATCH_LOG_LEVEL
# - NODEWATCH_LOG_FORMAT

[api]
# Base URL of the telemetry API; endpoints are appended to it
base_url = "http://localhost:5000/api"

# Where to sign in again when the session expires
login_url = "http://localhost:5000/login"

# Request timeout in seconds (default: none; a refresh is abandoned
# after one interval regardless)
# request_timeout_secs = 10

[refresh]
# Seconds between dashboard refreshes
interval_secs = 30

[session]
# JSON file holding the bearer token and the user profile
# file = "~/.local/share/nodewatch/session.json"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

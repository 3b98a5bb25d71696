use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::database::options::{
    ConnectionConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_POOL_SIZE, DEFAULT_MIN_POOL_SIZE,
    DEFAULT_PING_TIMEOUT, DEFAULT_SERVER_SELECTION_TIMEOUT, redact_uri,
};
use crate::global::error::ConfigError;

/// Environment variables override file values, e.g. `MEERKAT__DATABASE__URI`.
pub const ENV_PREFIX: &str = "MEERKAT";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppSettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub log_to_file: bool,
    #[serde(default = "default_log_directory")]
    pub log_directory: String,
    #[serde(default = "default_log_file_prefix")]
    pub log_file_prefix: String,
    #[serde(default = "default_log_rotation")]
    pub log_rotation: LogRotation,
    #[serde(default = "default_log_to_console")]
    pub log_to_console: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Daily,
    Hourly,
    Never,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> String {
    "./logs".to_string()
}

fn default_log_file_prefix() -> String {
    "meerkat".to_string()
}

fn default_log_rotation() -> LogRotation {
    LogRotation::Daily
}

fn default_log_to_console() -> bool {
    true
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_to_file: false,
            log_directory: default_log_directory(),
            log_file_prefix: default_log_file_prefix(),
            log_rotation: default_log_rotation(),
            log_to_console: default_log_to_console(),
        }
    }
}

/// `[database]` section. `Debug` output masks credentials in the URI.
#[derive(Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_database_name")]
    pub name: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_server_selection_timeout_ms")]
    pub server_selection_timeout_ms: u64,
    #[serde(default = "default_ping_timeout_ms")]
    pub ping_timeout_ms: u64,
    #[serde(default = "default_min_pool_size")]
    pub min_pool_size: u32,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database_name() -> String {
    "meerkat".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_millis() as u64
}

fn default_server_selection_timeout_ms() -> u64 {
    DEFAULT_SERVER_SELECTION_TIMEOUT.as_millis() as u64
}

fn default_ping_timeout_ms() -> u64 {
    DEFAULT_PING_TIMEOUT.as_millis() as u64
}

fn default_min_pool_size() -> u32 {
    DEFAULT_MIN_POOL_SIZE
}

fn default_max_pool_size() -> u32 {
    DEFAULT_MAX_POOL_SIZE
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            name: default_database_name(),
            connect_timeout_ms: default_connect_timeout_ms(),
            server_selection_timeout_ms: default_server_selection_timeout_ms(),
            ping_timeout_ms: default_ping_timeout_ms(),
            min_pool_size: default_min_pool_size(),
            max_pool_size: default_max_pool_size(),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("uri", &redact_uri(&self.uri))
            .field("name", &self.name)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("server_selection_timeout_ms", &self.server_selection_timeout_ms)
            .field("ping_timeout_ms", &self.ping_timeout_ms)
            .field("min_pool_size", &self.min_pool_size)
            .field("max_pool_size", &self.max_pool_size)
            .finish()
    }
}

impl DatabaseConfig {
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(&self.uri, &self.name)
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .with_server_selection_timeout(Duration::from_millis(self.server_selection_timeout_ms))
            .with_ping_timeout(Duration::from_millis(self.ping_timeout_ms))
            .with_pool_size(self.min_pool_size, self.max_pool_size)
    }
}

impl AppConfig {
    /// Load configuration from config.toml (optional) and `MEERKAT__*` variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Same as [`load`](Self::load) with a different file stem
    pub fn load_from(name: &str) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(name).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        Self::finish(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        Self::finish(config)
    }

    fn finish(config: config::Config) -> Result<Self, ConfigError> {
        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Reject settings the connector could never use
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.connection_config().validate()
    }
}

//! Configuration management for the scene prefab bridge
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `SP_*` environment variables, then command line overrides applied by the
//! binary.

use crate::core::error::{Error, Result, SerializationError};
use crate::prefab::PrefabInfoStyle;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default configuration file looked up by [`Config::load`]
pub const DEFAULT_CONFIG_FILE: &str = "scene-prefab.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Automation server configuration
    pub server: ServerConfig,

    /// Scene inspector configuration
    pub inspector: InspectorConfig,

    /// Asset store configuration
    pub storage: StorageConfig,

    /// Prefab output configuration
    pub prefab: PrefabConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Automation server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP server bind address
    pub http_addr: SocketAddr,

    /// Request timeout
    #[serde(with = "duration_format")]
    pub request_timeout: Duration,
}

/// Scene inspector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    /// Deadline for the supplementary per-node component query
    #[serde(with = "duration_format")]
    pub component_fetch_timeout: Duration,

    /// Maximum subtree depth fetched below the root
    pub max_depth: usize,

    /// Maximum number of inspector queries in flight at once
    pub fetch_concurrency: usize,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Keep assets in memory (tests, dry runs)
    Memory,
    /// Write assets below `data_dir`
    Disk,
}

/// Asset store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend
    pub storage_type: StorageType,

    /// Data directory path, used by the disk backend
    pub data_dir: PathBuf,
}

/// Prefab output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefabConfig {
    /// Serialize the node's descendants
    pub include_children: bool,

    /// Serialize components attached to each node
    pub include_components: bool,

    /// Shape of the root PrefabInfo override lists
    pub prefab_info_style: PrefabInfoStyle,

    /// Version tag written into the metadata record
    pub meta_version: String,

    /// Importer tag written into the metadata record
    pub importer: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty)
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            component_fetch_timeout: Duration::from_secs(5),
            max_depth: 64,
            fetch_concurrency: 8,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Memory,
            data_dir: PathBuf::from("./assets"),
        }
    }
}

impl Default for PrefabConfig {
    fn default() -> Self {
        Self {
            include_children: true,
            include_components: true,
            prefab_info_style: PrefabInfoStyle::Null,
            meta_version: "1.1.50".to_string(),
            importer: "prefab".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default file (if present) and environment variables
    pub fn load() -> Result<Self> {
        let mut config = if std::path::Path::new(DEFAULT_CONFIG_FILE).exists() {
            Self::from_file(DEFAULT_CONFIG_FILE)?
        } else {
            Config::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config = toml::from_str(contents).map_err(SerializationError::Toml)?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        use std::env;

        if let Ok(addr) = env::var("SP_HTTP_ADDR") {
            self.server.http_addr = addr
                .parse()
                .map_err(|e| Error::config(format!("Invalid HTTP address: {}", e)))?;
        }

        if let Ok(timeout) = env::var("SP_COMPONENT_FETCH_TIMEOUT") {
            self.inspector.component_fetch_timeout =
                parse_duration(&timeout).map_err(Error::config)?;
        }

        if let Ok(storage_type) = env::var("SP_STORAGE_TYPE") {
            self.storage.storage_type = parse_storage_type(&storage_type)?;
        }

        if let Ok(data_dir) = env::var("SP_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(level) = env::var("SP_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(format) = env::var("SP_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.inspector.fetch_concurrency == 0 {
            return Err(Error::config("Fetch concurrency must be at least 1"));
        }

        if self.inspector.max_depth == 0 {
            return Err(Error::config("Max depth must be at least 1"));
        }

        if self.inspector.component_fetch_timeout.is_zero() {
            return Err(Error::config("Component fetch timeout must be positive"));
        }

        if self.prefab.meta_version.is_empty() || self.prefab.importer.is_empty() {
            return Err(Error::config("Meta version and importer tag are required"));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => return Err(Error::config("Invalid log level")),
        }

        Ok(())
    }
}

/// Parse a storage backend name
pub fn parse_storage_type(s: &str) -> Result<StorageType> {
    match s {
        "memory" => Ok(StorageType::Memory),
        "disk" => Ok(StorageType::Disk),
        other => Err(Error::config(format!(
            "Invalid storage type: {}. Valid options: memory, disk",
            other
        ))),
    }
}

// Simple duration parser for common formats
pub(crate) fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        let ms: u64 = ms.parse().map_err(|_| "Invalid milliseconds")?;
        Ok(Duration::from_millis(ms))
    } else if let Some(secs) = s.strip_suffix('s') {
        let secs: u64 = secs.parse().map_err(|_| "Invalid seconds")?;
        Ok(Duration::from_secs(secs))
    } else if let Some(mins) = s.strip_suffix('m') {
        let mins: u64 = mins.parse().map_err(|_| "Invalid minutes")?;
        Ok(Duration::from_secs(mins * 60))
    } else {
        let secs: u64 = s.parse().map_err(|_| "Invalid duration format")?;
        Ok(Duration::from_secs(secs))
    }
}

/// Durations are written as `"250ms"`, `"5s"` or `"2m"` in config files
mod duration_format {
    use super::parse_duration;
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", value.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", value.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_duration(&raw).map_err(de::Error::custom)
    }
}

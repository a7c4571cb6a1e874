//! Application configuration.
//!
//! Loaded from YAML files and `EVENTSTORAGE__*` environment variables.

mod storage;

pub use storage::{MongodbConfig, SqliteConfig, StorageConfig, StorageType, TableNames};

use serde::Deserialize;

use crate::outbox::OutboxConfig;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "EVENTSTORAGE_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "EVENTSTORAGE";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "EVENTSTORAGE_LOG";

/// Main configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub outbox: OutboxConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix, e.g.
    ///    `EVENTSTORAGE__STORAGE__SNAPSHOT_COUNT=50`
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

//! Storage configuration types.

use std::time::Duration;

use serde::Deserialize;

/// Storage type discriminator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Sqlite,
    Mongodb,
}

/// Storage configuration (discriminated union).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// SQLite-specific configuration.
    pub sqlite: SqliteConfig,
    /// MongoDB-specific configuration.
    pub mongodb: MongodbConfig,
    /// Physical table/collection names.
    pub tables: TableNames,
    /// Events between two snapshots. Default: 100
    pub snapshot_count: u64,
    /// Deadline for one transactional operation. Default: 5
    pub operation_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Sqlite,
            sqlite: SqliteConfig::default(),
            mongodb: MongodbConfig::default(),
            tables: TableNames::default(),
            snapshot_count: 100,
            operation_timeout_secs: 5,
        }
    }
}

impl StorageConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

/// SQLite-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file, or `:memory:`.
    pub path: String,
    pub max_connections: u32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "data/eventstorage.db".to_string(),
            max_connections: 5,
        }
    }
}

/// MongoDB-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MongodbConfig {
    /// MongoDB connection URI. Transactions need a replica set.
    pub uri: String,
    /// Database name.
    pub database: String,
}

impl Default for MongodbConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017/?replicaSet=rs0".to_string(),
            database: "eventstorage".to_string(),
        }
    }
}

/// Names of the fixed tables/collections. Relation targets are named after
/// aggregate types and are not configured here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub aggregate: String,
    pub event: String,
    pub snapshot: String,
    pub message: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            aggregate: "ddd_aggregate".to_string(),
            event: "ddd_event".to_string(),
            snapshot: "ddd_snapshot".to_string(),
            message: "ddd_message".to_string(),
        }
    }
}

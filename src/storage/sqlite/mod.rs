//! SQLite implementations of the storage traits.

mod aggregate_store;
mod dao;
mod event_store;
mod message_store;
mod relation_store;
mod session;
mod snapshot_store;

pub use aggregate_store::SqliteAggregateStore;
pub use event_store::SqliteEventStore;
pub use message_store::SqliteMessageStore;
pub use relation_store::SqliteRelationStore;
pub use session::SqliteSession;
pub use snapshot_store::SqliteSnapshotStore;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sea_query::{IndexCreateStatement, SqliteQueryBuilder, TableCreateStatement};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::config::{SqliteConfig, StorageConfig, TableNames};
use crate::error::Result;
use crate::publish::Publisher;
use crate::service::{EventStorage, StorageOptions};
use crate::storage::schema::{aggregate_table, event_table, message_table, snapshot_table};
use crate::storage::Stores;

const MEMORY_PATH: &str = ":memory:";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Run one table definition and its indexes.
pub(crate) async fn execute_ddl(
    conn: &mut SqliteConnection,
    (table, indexes): (TableCreateStatement, Vec<IndexCreateStatement>),
) -> Result<()> {
    sqlx::query(&table.to_string(SqliteQueryBuilder))
        .execute(&mut *conn)
        .await?;
    for index in indexes {
        sqlx::query(&index.to_string(SqliteQueryBuilder))
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Open a connection pool for `config.path`.
///
/// File databases use WAL with a busy timeout so concurrent writers wait
/// for each other. An in-memory database lives in exactly one connection,
/// which is never recycled.
pub async fn open_pool(config: &SqliteConfig) -> Result<SqlitePool> {
    if config.path == MEMORY_PATH {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        info!("SQLite in-memory database opened");
        return Ok(pool);
    }

    if let Some(parent) = Path::new(&config.path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let options = SqliteConnectOptions::new()
        .filename(&config.path)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .connect_with(options)
        .await?;
    info!(
        path = %config.path,
        max_connections = config.max_connections,
        "SQLite database opened"
    );
    Ok(pool)
}

/// Create the fixed tables and their indexes. Idempotent.
pub async fn init_schema(pool: &SqlitePool, tables: &TableNames) -> Result<()> {
    let mut conn = pool.acquire().await?;
    execute_ddl(&mut conn, aggregate_table(&tables.aggregate)).await?;
    execute_ddl(&mut conn, event_table(&tables.event)).await?;
    execute_ddl(&mut conn, snapshot_table(&tables.snapshot)).await?;
    execute_ddl(&mut conn, message_table(&tables.message)).await?;
    info!("SQLite schema initialized");
    Ok(())
}

/// SQLite stores over the configured tables.
pub fn stores(tables: &TableNames) -> Stores<SqliteConnection> {
    Stores {
        aggregates: Arc::new(SqliteAggregateStore::new(&tables.aggregate)),
        events: Arc::new(SqliteEventStore::new(&tables.event)),
        snapshots: Arc::new(SqliteSnapshotStore::new(&tables.snapshot)),
        relations: Arc::new(SqliteRelationStore::new()),
        messages: Arc::new(SqliteMessageStore::new(&tables.message)),
    }
}

/// Open the database, create the schema and assemble an [`EventStorage`].
pub async fn connect(
    config: &StorageConfig,
    options: StorageOptions,
    publisher: Arc<dyn Publisher>,
) -> Result<EventStorage<SqliteSession>> {
    let pool = open_pool(&config.sqlite).await?;
    init_schema(&pool, &config.tables).await?;
    Ok(EventStorage::new(
        SqliteSession::new(pool),
        stores(&config.tables),
        publisher,
        options,
    ))
}

//! Pooled SQLite connections and transactions.

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::error::Result;
use crate::storage::Session;

/// [`Session`] over an `SqlitePool`.
///
/// Transactions begin deferred. Every write path issues a write statement
/// first, so a transaction never upgrades from a read lock to a write lock
/// and concurrent writers queue on the busy timeout instead of failing.
#[derive(Clone)]
pub struct SqliteSession {
    pool: SqlitePool,
}

impl SqliteSession {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Session for SqliteSession {
    type Conn = SqliteConnection;
    type Handle = PoolConnection<Sqlite>;
    type Tx = Transaction<'static, Sqlite>;

    async fn acquire(&self) -> Result<Self::Handle> {
        Ok(self.pool.acquire().await?)
    }

    async fn begin(&self) -> Result<Self::Tx> {
        Ok(self.pool.begin().await?)
    }

    async fn commit(&self, tx: Self::Tx) -> Result<()> {
        Ok(tx.commit().await?)
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<()> {
        Ok(tx.rollback().await?)
    }
}

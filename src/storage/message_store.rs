//! MessageStore trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::Message;

/// Transactional outbox.
///
/// A row exists while its event is committed but not yet acknowledged by
/// the publisher. Rows are staged in the event's transaction and removed
/// only after a confirmed publish.
///
/// Implementations:
/// - `SqliteMessageStore`: SQLite storage
/// - `MongoMessageStore`: MongoDB storage
#[async_trait]
pub trait MessageStore<C: Send>: Send + Sync {
    async fn create(&self, conn: &mut C, message: &Message) -> Result<()>;

    async fn delete(&self, conn: &mut C, tenant_id: &str, id: &str) -> Result<()>;

    async fn delete_by_aggregate_id(
        &self,
        conn: &mut C,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<()>;

    /// Pending messages of every tenant, oldest first.
    async fn find_all(&self, conn: &mut C, limit: u64) -> Result<Vec<Message>>;

    /// Pending messages created before `older_than` with fewer than
    /// `max_retries` failed attempts, oldest first.
    async fn find_pending(
        &self,
        conn: &mut C,
        older_than: DateTime<Utc>,
        max_retries: u32,
        limit: u64,
    ) -> Result<Vec<Message>>;

    /// Record one failed publish attempt.
    async fn increment_retry(&self, conn: &mut C, tenant_id: &str, id: &str) -> Result<()>;
}

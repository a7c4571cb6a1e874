//! EventStore trait definition.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Event;
use crate::paging::{PagingQuery, PagingResult};

/// Interface for event persistence.
///
/// `(tenant_id, aggregate_id, sequence_number)` and `event_id` are unique;
/// a violation of either surfaces as `StorageError::DuplicateEvent`.
///
/// Implementations:
/// - `SqliteEventStore`: SQLite storage
/// - `MongoEventStore`: MongoDB storage
#[async_trait]
pub trait EventStore<C: Send>: Send + Sync {
    /// Validate and insert one event.
    async fn create(&self, conn: &mut C, event: &Event) -> Result<()>;

    /// Replace an event by id. Administrative use only.
    async fn update(&self, conn: &mut C, event: &Event) -> Result<()>;

    async fn find_by_id(&self, conn: &mut C, tenant_id: &str, id: &str) -> Result<Option<Event>>;

    /// Full history of an aggregate, ascending by sequence number.
    async fn find_by_aggregate_id(
        &self,
        conn: &mut C,
        tenant_id: &str,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<Vec<Event>>;

    /// Events with `sequence_number > after`, ascending. Replay query used
    /// after loading a snapshot.
    async fn find_by_sequence_number(
        &self,
        conn: &mut C,
        tenant_id: &str,
        aggregate_id: &str,
        aggregate_type: &str,
        after: u64,
    ) -> Result<Vec<Event>>;

    async fn delete_by_aggregate_id(
        &self,
        conn: &mut C,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<()>;

    async fn find_paging(&self, conn: &mut C, query: &PagingQuery) -> Result<PagingResult<Event>>;
}

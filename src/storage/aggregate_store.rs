//! AggregateStore trait definition.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Aggregate;

/// A contiguous range of sequence numbers reserved for one append.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceReservation {
    /// Aggregate state before the counter moved.
    pub aggregate: Aggregate,
    /// First usable sequence number of the range.
    pub first: u64,
}

/// Owner of the per-aggregate sequence counter and soft-delete flag.
///
/// Counter updates are single atomic read-modify-write statements, so
/// concurrent appliers never receive overlapping ranges, even across
/// processes.
///
/// Implementations:
/// - `SqliteAggregateStore`: SQLite storage
/// - `MongoAggregateStore`: MongoDB storage
#[async_trait]
pub trait AggregateStore<C: Send>: Send + Sync {
    /// Insert a new aggregate. Fails with `AlreadyExists` when
    /// `(tenant_id, aggregate_id)` is taken.
    async fn create(&self, conn: &mut C, aggregate: &Aggregate) -> Result<()>;

    async fn find_by_id(
        &self,
        conn: &mut C,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<Option<Aggregate>>;

    async fn exists(&self, conn: &mut C, tenant_id: &str, aggregate_id: &str) -> Result<bool> {
        Ok(self.find_by_id(conn, tenant_id, aggregate_id).await?.is_some())
    }

    /// Atomically add `count` to the counter.
    ///
    /// Returns `None` when the aggregate does not exist. The counter moves
    /// even for a deleted aggregate; callers check `aggregate.deleted` and
    /// abort the transaction.
    async fn next_sequence_number(
        &self,
        conn: &mut C,
        tenant_id: &str,
        aggregate_id: &str,
        count: u64,
    ) -> Result<Option<SequenceReservation>>;

    /// Atomically flag the aggregate deleted and add one to the counter.
    ///
    /// Returns the state before the update, so a caller racing another
    /// delete sees `deleted == true`.
    async fn delete_and_next_sequence_number(
        &self,
        conn: &mut C,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<Option<Aggregate>>;

    /// Flag the aggregate deleted without touching the counter. Returns the
    /// state before the update.
    async fn set_deleted(
        &self,
        conn: &mut C,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<Option<Aggregate>>;

    /// Physically remove the aggregate row.
    async fn delete_by_aggregate_id(
        &self,
        conn: &mut C,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<()>;
}

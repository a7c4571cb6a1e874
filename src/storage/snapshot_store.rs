//! SnapshotStore trait definition.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Snapshot;

/// Interface for snapshot persistence.
///
/// Snapshots bound replay cost: a reader loads the snapshot with the
/// greatest sequence number and replays only the events after it. Several
/// snapshots may exist per aggregate.
///
/// Implementations:
/// - `SqliteSnapshotStore`: SQLite storage
/// - `MongoSnapshotStore`: MongoDB storage
#[async_trait]
pub trait SnapshotStore<C: Send>: Send + Sync {
    async fn create(&self, conn: &mut C, snapshot: &Snapshot) -> Result<()>;

    /// Replace a snapshot by id. Administrative use only.
    async fn update(&self, conn: &mut C, snapshot: &Snapshot) -> Result<()>;

    /// Latest snapshot, or `None` when replay starts from sequence 0.
    async fn find_by_max_sequence_number(
        &self,
        conn: &mut C,
        tenant_id: &str,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<Option<Snapshot>>;

    /// All snapshots of an aggregate, ascending by sequence number.
    async fn find_by_aggregate_id(
        &self,
        conn: &mut C,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<Vec<Snapshot>>;

    async fn delete_by_aggregate_id(
        &self,
        conn: &mut C,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<()>;
}

//! RelationStore trait definition.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Relation;
use crate::paging::{PagingQuery, PagingResult};

/// Secondary index of named relation values.
///
/// Rows live in one physical target per aggregate type, named by
/// [`crate::rsql::as_target_name`]. Targets are created lazily and cached.
///
/// Implementations:
/// - `SqliteRelationStore`: one table per aggregate type
/// - `MongoRelationStore`: one collection per aggregate type
#[async_trait]
pub trait RelationStore<C: Send>: Send + Sync {
    /// Create the target for `aggregate_type` if needed and return its name.
    ///
    /// Schema changes may not be transactional, so the service calls this
    /// before opening the write transaction.
    async fn ensure_target(&self, conn: &mut C, aggregate_type: &str) -> Result<String>;

    /// Insert a batch. Every relation is validated first; one invalid row
    /// rejects the whole batch. An empty batch is a no-op.
    async fn create_many(&self, conn: &mut C, tenant_id: &str, relations: &[Relation])
        -> Result<()>;

    async fn delete_by_aggregate_id(
        &self,
        conn: &mut C,
        tenant_id: &str,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<()>;

    async fn find_paging(
        &self,
        conn: &mut C,
        aggregate_type: &str,
        query: &PagingQuery,
    ) -> Result<PagingResult<Relation>>;
}

//! SQLite AggregateStore implementation.

use async_trait::async_trait;
use sea_query::{Condition, Expr, SimpleExpr};
use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;
use tracing::debug;

use super::dao::{get_bool, get_text, get_u64, on_unique_violation, to_i64, SqlRecord, SqlTable};
use crate::error::{Result, StorageError};
use crate::model::Aggregate;
use crate::storage::schema::AggregateColumn;
use crate::storage::{AggregateStore, SequenceReservation};

impl SqlRecord for Aggregate {
    type Column = AggregateColumn;

    const ID: AggregateColumn = AggregateColumn::Id;
    const TENANT_ID: AggregateColumn = AggregateColumn::TenantId;

    fn columns() -> Vec<AggregateColumn> {
        use AggregateColumn::*;
        vec![Id, TenantId, AggregateId, AggregateType, SequenceNumber, Deleted]
    }

    fn values(&self) -> Result<Vec<SimpleExpr>> {
        Ok(vec![
            self.id.clone().into(),
            self.tenant_id.clone().into(),
            self.aggregate_id.clone().into(),
            self.aggregate_type.clone().into(),
            to_i64(self.sequence_number).into(),
            self.deleted.into(),
        ])
    }

    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: get_text(row, "id")?,
            tenant_id: get_text(row, "tenant_id")?,
            aggregate_id: get_text(row, "aggregate_id")?,
            aggregate_type: get_text(row, "aggregate_type")?,
            sequence_number: get_u64(row, "sequence_number")?,
            deleted: get_bool(row, "deleted")?,
        })
    }
}

/// SQLite implementation of AggregateStore.
///
/// Counter moves are `UPDATE ... RETURNING` statements: one atomic
/// read-modify-write each.
pub struct SqliteAggregateStore {
    table: SqlTable<Aggregate>,
}

impl SqliteAggregateStore {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: SqlTable::new(table),
        }
    }

    fn by_aggregate(tenant_id: &str, aggregate_id: &str) -> Condition {
        Condition::all()
            .add(Expr::col(AggregateColumn::TenantId).eq(tenant_id))
            .add(Expr::col(AggregateColumn::AggregateId).eq(aggregate_id))
    }

    /// Flag a live aggregate deleted, optionally bumping the counter, and
    /// rebuild the state it had before.
    async fn mark_deleted(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        aggregate_id: &str,
        bump: u64,
    ) -> Result<Option<Aggregate>> {
        let mut assignments: Vec<(AggregateColumn, SimpleExpr)> =
            vec![(AggregateColumn::Deleted, true.into())];
        if bump > 0 {
            assignments.push((
                AggregateColumn::SequenceNumber,
                Expr::col(AggregateColumn::SequenceNumber).add(to_i64(bump)),
            ));
        }
        let live = Self::by_aggregate(tenant_id, aggregate_id)
            .add(Expr::col(AggregateColumn::Deleted).eq(false));

        match self.table.update_returning(conn, assignments, live).await? {
            Some(mut aggregate) => {
                aggregate.deleted = false;
                aggregate.sequence_number -= bump;
                debug!(
                    tenant_id = %tenant_id,
                    aggregate_id = %aggregate_id,
                    sequence_number = aggregate.sequence_number + bump,
                    "Aggregate marked deleted"
                );
                Ok(Some(aggregate))
            }
            // Absent, or deleted before this call.
            None => self.find_by_id(conn, tenant_id, aggregate_id).await,
        }
    }
}

#[async_trait]
impl AggregateStore<SqliteConnection> for SqliteAggregateStore {
    async fn create(&self, conn: &mut SqliteConnection, aggregate: &Aggregate) -> Result<()> {
        self.table.insert(conn, aggregate).await.map_err(|e| {
            on_unique_violation(e, || StorageError::AlreadyExists {
                tenant_id: aggregate.tenant_id.clone(),
                aggregate_id: aggregate.aggregate_id.clone(),
            })
        })?;
        debug!(
            tenant_id = %aggregate.tenant_id,
            aggregate_id = %aggregate.aggregate_id,
            sequence_number = aggregate.sequence_number,
            "Aggregate created"
        );
        Ok(())
    }

    async fn find_by_id(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<Option<Aggregate>> {
        self.table
            .find_one(conn, Self::by_aggregate(tenant_id, aggregate_id))
            .await
    }

    async fn next_sequence_number(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        aggregate_id: &str,
        count: u64,
    ) -> Result<Option<SequenceReservation>> {
        let assignments = vec![(
            AggregateColumn::SequenceNumber,
            Expr::col(AggregateColumn::SequenceNumber).add(to_i64(count)),
        )];
        let updated = self
            .table
            .update_returning(conn, assignments, Self::by_aggregate(tenant_id, aggregate_id))
            .await?;

        Ok(updated.map(|mut aggregate| {
            aggregate.sequence_number -= count;
            let first = aggregate.sequence_number + 1;
            debug!(
                tenant_id = %tenant_id,
                aggregate_id = %aggregate_id,
                first = first,
                count = count,
                "Sequence numbers reserved"
            );
            SequenceReservation { aggregate, first }
        }))
    }

    async fn delete_and_next_sequence_number(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<Option<Aggregate>> {
        self.mark_deleted(conn, tenant_id, aggregate_id, 1).await
    }

    async fn set_deleted(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<Option<Aggregate>> {
        self.mark_deleted(conn, tenant_id, aggregate_id, 0).await
    }

    async fn delete_by_aggregate_id(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<()> {
        self.table
            .delete(conn, Self::by_aggregate(tenant_id, aggregate_id))
            .await?;
        Ok(())
    }
}

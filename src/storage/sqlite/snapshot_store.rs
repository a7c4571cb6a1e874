//! SQLite SnapshotStore implementation.

use async_trait::async_trait;
use sea_query::{Condition, Expr, Order, SimpleExpr};
use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;
use tracing::debug;

use super::dao::{get_json, get_text, get_time, get_u64, to_i64, SqlRecord, SqlTable};
use crate::error::Result;
use crate::model::{timestamp, Snapshot};
use crate::storage::schema::SnapshotColumn;
use crate::storage::SnapshotStore;

impl SqlRecord for Snapshot {
    type Column = SnapshotColumn;

    const ID: SnapshotColumn = SnapshotColumn::Id;
    const TENANT_ID: SnapshotColumn = SnapshotColumn::TenantId;

    fn columns() -> Vec<SnapshotColumn> {
        use SnapshotColumn::*;
        vec![
            Id,
            TenantId,
            AggregateId,
            AggregateType,
            SequenceNumber,
            AggregateData,
            AggregateVersion,
            Metadata,
            TimeStamp,
        ]
    }

    fn values(&self) -> Result<Vec<SimpleExpr>> {
        Ok(vec![
            self.id.clone().into(),
            self.tenant_id.clone().into(),
            self.aggregate_id.clone().into(),
            self.aggregate_type.clone().into(),
            to_i64(self.sequence_number).into(),
            serde_json::to_string(&self.aggregate_data)?.into(),
            self.aggregate_version.clone().into(),
            serde_json::to_string(&self.metadata)?.into(),
            timestamp::format(&self.time_stamp).into(),
        ])
    }

    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: get_text(row, "id")?,
            tenant_id: get_text(row, "tenant_id")?,
            aggregate_id: get_text(row, "aggregate_id")?,
            aggregate_type: get_text(row, "aggregate_type")?,
            sequence_number: get_u64(row, "sequence_number")?,
            aggregate_data: get_json(row, "aggregate_data")?,
            aggregate_version: get_text(row, "aggregate_version")?,
            metadata: get_json(row, "metadata")?,
            time_stamp: get_time(row, "time_stamp")?,
        })
    }
}

/// SQLite implementation of SnapshotStore.
pub struct SqliteSnapshotStore {
    table: SqlTable<Snapshot>,
}

impl SqliteSnapshotStore {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: SqlTable::new(table),
        }
    }

    fn by_aggregate(tenant_id: &str, aggregate_id: &str) -> Condition {
        Condition::all()
            .add(Expr::col(SnapshotColumn::TenantId).eq(tenant_id))
            .add(Expr::col(SnapshotColumn::AggregateId).eq(aggregate_id))
    }
}

#[async_trait]
impl SnapshotStore<SqliteConnection> for SqliteSnapshotStore {
    async fn create(&self, conn: &mut SqliteConnection, snapshot: &Snapshot) -> Result<()> {
        self.table.insert(conn, snapshot).await?;
        debug!(
            tenant_id = %snapshot.tenant_id,
            aggregate_id = %snapshot.aggregate_id,
            sequence_number = snapshot.sequence_number,
            "Snapshot stored"
        );
        Ok(())
    }

    async fn update(&self, conn: &mut SqliteConnection, snapshot: &Snapshot) -> Result<()> {
        self.table.update(conn, snapshot).await
    }

    async fn find_by_max_sequence_number(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<Option<Snapshot>> {
        let condition = Self::by_aggregate(tenant_id, aggregate_id)
            .add(Expr::col(SnapshotColumn::AggregateType).eq(aggregate_type));
        let mut latest = self
            .table
            .find_many(
                conn,
                condition,
                Some((SnapshotColumn::SequenceNumber, Order::Desc)),
                Some(1),
            )
            .await?;
        Ok(latest.pop())
    }

    async fn find_by_aggregate_id(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<Vec<Snapshot>> {
        self.table
            .find_many(
                conn,
                Self::by_aggregate(tenant_id, aggregate_id),
                Some((SnapshotColumn::SequenceNumber, Order::Asc)),
                None,
            )
            .await
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

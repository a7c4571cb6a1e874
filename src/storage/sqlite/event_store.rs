//! SQLite EventStore implementation.

use async_trait::async_trait;
use sea_query::{Condition, Expr, Order, SimpleExpr};
use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;
use tracing::debug;

use super::dao::{get_json, get_text, get_time, get_u64, on_unique_violation, to_i64, SqlRecord, SqlTable};
use crate::error::{Result, StorageError};
use crate::model::{timestamp, Event};
use crate::paging::{PagingQuery, PagingResult};
use crate::storage::schema::EventColumn;
use crate::storage::EventStore;

impl SqlRecord for Event {
    type Column = EventColumn;

    const ID: EventColumn = EventColumn::Id;
    const TENANT_ID: EventColumn = EventColumn::TenantId;

    fn columns() -> Vec<EventColumn> {
        use EventColumn::*;
        vec![
            Id,
            TenantId,
            CommandId,
            EventId,
            AggregateId,
            AggregateType,
            EventType,
            EventVersion,
            SequenceNumber,
            EventData,
            Metadata,
            Topic,
            PubsubName,
            TimeStamp,
        ]
    }

    fn values(&self) -> Result<Vec<SimpleExpr>> {
        Ok(vec![
            self.id.clone().into(),
            self.tenant_id.clone().into(),
            self.command_id.clone().into(),
            self.event_id.clone().into(),
            self.aggregate_id.clone().into(),
            self.aggregate_type.clone().into(),
            self.event_type.clone().into(),
            self.event_version.clone().into(),
            to_i64(self.sequence_number).into(),
            serde_json::to_string(&self.event_data)?.into(),
            serde_json::to_string(&self.metadata)?.into(),
            self.topic.clone().into(),
            self.pubsub_name.clone().into(),
            timestamp::format(&self.time_stamp).into(),
        ])
    }

    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: get_text(row, "id")?,
            tenant_id: get_text(row, "tenant_id")?,
            command_id: get_text(row, "command_id")?,
            event_id: get_text(row, "event_id")?,
            aggregate_id: get_text(row, "aggregate_id")?,
            aggregate_type: get_text(row, "aggregate_type")?,
            event_type: get_text(row, "event_type")?,
            event_version: get_text(row, "event_version")?,
            sequence_number: get_u64(row, "sequence_number")?,
            event_data: get_json(row, "event_data")?,
            metadata: get_json(row, "metadata")?,
            topic: get_text(row, "topic")?,
            pubsub_name: get_text(row, "pubsub_name")?,
            time_stamp: get_time(row, "time_stamp")?,
        })
    }
}

/// SQLite implementation of EventStore.
pub struct SqliteEventStore {
    table: SqlTable<Event>,
}

impl SqliteEventStore {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: SqlTable::new(table),
        }
    }

    fn by_aggregate(tenant_id: &str, aggregate_id: &str) -> Condition {
        Condition::all()
            .add(Expr::col(EventColumn::TenantId).eq(tenant_id))
            .add(Expr::col(EventColumn::AggregateId).eq(aggregate_id))
    }
}

#[async_trait]
impl EventStore<SqliteConnection> for SqliteEventStore {
    async fn create(&self, conn: &mut SqliteConnection, event: &Event) -> Result<()> {
        self.table.insert(conn, event).await.map_err(|e| {
            on_unique_violation(e, || StorageError::DuplicateEvent {
                event_id: event.event_id.clone(),
            })
        })?;
        debug!(
            tenant_id = %event.tenant_id,
            aggregate_id = %event.aggregate_id,
            event_id = %event.event_id,
            sequence_number = event.sequence_number,
            "Event appended"
        );
        Ok(())
    }

    async fn update(&self, conn: &mut SqliteConnection, event: &Event) -> Result<()> {
        self.table.update(conn, event).await
    }

    async fn find_by_id(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
    ) -> Result<Option<Event>> {
        self.table
            .find_one(conn, SqlTable::<Event>::by_id(tenant_id, id))
            .await
    }

    async fn find_by_aggregate_id(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<Vec<Event>> {
        self.find_by_sequence_number(conn, tenant_id, aggregate_id, aggregate_type, 0)
            .await
    }

    async fn find_by_sequence_number(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        aggregate_id: &str,
        aggregate_type: &str,
        after: u64,
    ) -> Result<Vec<Event>> {
        let condition = Self::by_aggregate(tenant_id, aggregate_id)
            .add(Expr::col(EventColumn::AggregateType).eq(aggregate_type))
            .add(Expr::col(EventColumn::SequenceNumber).gt(to_i64(after)));
        self.table
            .find_many(
                conn,
                condition,
                Some((EventColumn::SequenceNumber, Order::Asc)),
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

    async fn find_paging(
        &self,
        conn: &mut SqliteConnection,
        query: &PagingQuery,
    ) -> Result<PagingResult<Event>> {
        self.table.find_paging(conn, query).await
    }
}

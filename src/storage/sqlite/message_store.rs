//! SQLite MessageStore implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{Condition, Expr, Order, SimpleExpr};
use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;
use tracing::debug;

use super::dao::{get_json, get_text, get_time, get_u64, on_unique_violation, SqlRecord, SqlTable};
use crate::error::{Result, StorageError};
use crate::model::{timestamp, Message};
use crate::storage::schema::MessageColumn;
use crate::storage::MessageStore;

impl SqlRecord for Message {
    type Column = MessageColumn;

    const ID: MessageColumn = MessageColumn::Id;
    const TENANT_ID: MessageColumn = MessageColumn::TenantId;

    fn columns() -> Vec<MessageColumn> {
        use MessageColumn::*;
        vec![Id, TenantId, AggregateId, EventId, CreateTime, RetryCount, Event]
    }

    fn values(&self) -> Result<Vec<SimpleExpr>> {
        Ok(vec![
            self.id.clone().into(),
            self.tenant_id.clone().into(),
            self.aggregate_id.clone().into(),
            self.event_id.clone().into(),
            timestamp::format(&self.create_time).into(),
            i64::from(self.retry_count).into(),
            serde_json::to_string(&self.event)?.into(),
        ])
    }

    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: get_text(row, "id")?,
            tenant_id: get_text(row, "tenant_id")?,
            aggregate_id: get_text(row, "aggregate_id")?,
            event_id: get_text(row, "event_id")?,
            create_time: get_time(row, "create_time")?,
            retry_count: u32::try_from(get_u64(row, "retry_count")?).unwrap_or(u32::MAX),
            event: get_json(row, "event")?,
        })
    }
}

/// SQLite implementation of MessageStore.
pub struct SqliteMessageStore {
    table: SqlTable<Message>,
}

impl SqliteMessageStore {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: SqlTable::new(table),
        }
    }
}

#[async_trait]
impl MessageStore<SqliteConnection> for SqliteMessageStore {
    async fn create(&self, conn: &mut SqliteConnection, message: &Message) -> Result<()> {
        self.table.insert(conn, message).await.map_err(|e| {
            on_unique_violation(e, || StorageError::DuplicateEvent {
                event_id: message.event_id.clone(),
            })
        })?;
        debug!(
            tenant_id = %message.tenant_id,
            event_id = %message.event_id,
            "Message staged"
        );
        Ok(())
    }

    async fn delete(&self, conn: &mut SqliteConnection, tenant_id: &str, id: &str) -> Result<()> {
        self.table
            .delete(conn, SqlTable::<Message>::by_id(tenant_id, id))
            .await?;
        Ok(())
    }

    async fn delete_by_aggregate_id(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<()> {
        let condition = Condition::all()
            .add(Expr::col(MessageColumn::TenantId).eq(tenant_id))
            .add(Expr::col(MessageColumn::AggregateId).eq(aggregate_id));
        self.table.delete(conn, condition).await?;
        Ok(())
    }

    async fn find_all(&self, conn: &mut SqliteConnection, limit: u64) -> Result<Vec<Message>> {
        self.table
            .find_many(
                conn,
                Condition::all(),
                Some((MessageColumn::CreateTime, Order::Asc)),
                Some(limit),
            )
            .await
    }

    async fn find_pending(
        &self,
        conn: &mut SqliteConnection,
        older_than: DateTime<Utc>,
        max_retries: u32,
        limit: u64,
    ) -> Result<Vec<Message>> {
        let condition = Condition::all()
            .add(Expr::col(MessageColumn::CreateTime).lt(timestamp::format(&older_than)))
            .add(Expr::col(MessageColumn::RetryCount).lt(i64::from(max_retries)));
        self.table
            .find_many(
                conn,
                condition,
                Some((MessageColumn::CreateTime, Order::Asc)),
                Some(limit),
            )
            .await
    }

    async fn increment_retry(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
    ) -> Result<()> {
        let assignments = vec![(
            MessageColumn::RetryCount,
            Expr::col(MessageColumn::RetryCount).add(1),
        )];
        let updated = self
            .table
            .update_returning(conn, assignments, SqlTable::<Message>::by_id(tenant_id, id))
            .await?;
        if let Some(message) = updated {
            debug!(
                tenant_id = %tenant_id,
                event_id = %message.event_id,
                retry_count = message.retry_count,
                "Message retry recorded"
            );
        }
        Ok(())
    }
}

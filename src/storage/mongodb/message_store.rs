//! MongoDB MessageStore implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{doc, Document};
use mongodb::options::ReturnDocument;
use mongodb::{ClientSession, Collection};
use tracing::debug;

use super::dao::MongoTable;
use super::on_duplicate_key;
use crate::error::{Result, StorageError};
use crate::model::{timestamp, Message};
use crate::storage::MessageStore;

/// MongoDB implementation of MessageStore.
pub struct MongoMessageStore {
    table: MongoTable<Message>,
}

impl MongoMessageStore {
    pub fn new(collection: Collection<Document>) -> Self {
        Self {
            table: MongoTable::new(collection),
        }
    }
}

fn to_limit(limit: u64) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl MessageStore<ClientSession> for MongoMessageStore {
    async fn create(&self, conn: &mut ClientSession, message: &Message) -> Result<()> {
        self.table.insert(conn, message).await.map_err(|e| {
            on_duplicate_key(e, || StorageError::DuplicateEvent {
                event_id: message.event_id.clone(),
            })
        })
    }

    async fn delete(&self, conn: &mut ClientSession, tenant_id: &str, id: &str) -> Result<()> {
        self.table
            .delete_many(conn, MongoTable::<Message>::by_id(tenant_id, id))
            .await?;
        Ok(())
    }

    async fn delete_by_aggregate_id(
        &self,
        conn: &mut ClientSession,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<()> {
        self.table
            .delete_many(conn, doc! { "tenant_id": tenant_id, "aggregate_id": aggregate_id })
            .await?;
        Ok(())
    }

    async fn find_all(&self, conn: &mut ClientSession, limit: u64) -> Result<Vec<Message>> {
        self.table
            .find_many(
                conn,
                Document::new(),
                Some(doc! { "create_time": 1 }),
                Some(to_limit(limit)),
            )
            .await
    }

    async fn find_pending(
        &self,
        conn: &mut ClientSession,
        older_than: DateTime<Utc>,
        max_retries: u32,
        limit: u64,
    ) -> Result<Vec<Message>> {
        let filter = doc! {
            "create_time": { "$lt": timestamp::format(&older_than) },
            "retry_count": { "$lt": i64::from(max_retries) },
        };
        self.table
            .find_many(
                conn,
                filter,
                Some(doc! { "create_time": 1 }),
                Some(to_limit(limit)),
            )
            .await
    }

    async fn increment_retry(
        &self,
        conn: &mut ClientSession,
        tenant_id: &str,
        id: &str,
    ) -> Result<()> {
        let updated = self
            .table
            .find_one_and_update(
                conn,
                MongoTable::<Message>::by_id(tenant_id, id),
                doc! { "$inc": { "retry_count": 1_i64 } },
                ReturnDocument::After,
            )
            .await?;
        if let Some(message) = updated {
            debug!(
                event_id = %message.event_id,
                retry_count = message.retry_count,
                "Message retry recorded"
            );
        }
        Ok(())
    }
}

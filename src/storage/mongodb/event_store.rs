//! MongoDB EventStore implementation.

use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::{ClientSession, Collection};

use super::dao::MongoTable;
use super::on_duplicate_key;
use crate::error::{Result, StorageError};
use crate::model::Event;
use crate::paging::{PagingQuery, PagingResult};
use crate::storage::EventStore;

/// MongoDB implementation of EventStore.
///
/// Unique indexes on `(tenant_id, aggregate_id, sequence_number)` and on
/// `event_id` turn a duplicate append into `DuplicateEvent`.
pub struct MongoEventStore {
    table: MongoTable<Event>,
}

impl MongoEventStore {
    pub fn new(collection: Collection<Document>) -> Self {
        Self {
            table: MongoTable::new(collection),
        }
    }
}

#[async_trait]
impl EventStore<ClientSession> for MongoEventStore {
    async fn create(&self, conn: &mut ClientSession, event: &Event) -> Result<()> {
        self.table.insert(conn, event).await.map_err(|e| {
            on_duplicate_key(e, || StorageError::DuplicateEvent {
                event_id: event.event_id.clone(),
            })
        })
    }

    async fn update(&self, conn: &mut ClientSession, event: &Event) -> Result<()> {
        self.table.replace(conn, event).await
    }

    async fn find_by_id(
        &self,
        conn: &mut ClientSession,
        tenant_id: &str,
        id: &str,
    ) -> Result<Option<Event>> {
        self.table
            .find_one(conn, MongoTable::<Event>::by_id(tenant_id, id))
            .await
    }

    async fn find_by_aggregate_id(
        &self,
        conn: &mut ClientSession,
        tenant_id: &str,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<Vec<Event>> {
        self.find_by_sequence_number(conn, tenant_id, aggregate_id, aggregate_type, 0)
            .await
    }

    async fn find_by_sequence_number(
        &self,
        conn: &mut ClientSession,
        tenant_id: &str,
        aggregate_id: &str,
        aggregate_type: &str,
        after: u64,
    ) -> Result<Vec<Event>> {
        let after = i64::try_from(after).unwrap_or(i64::MAX);
        let filter = doc! {
            "tenant_id": tenant_id,
            "aggregate_id": aggregate_id,
            "aggregate_type": aggregate_type,
            "sequence_number": { "$gt": after },
        };
        self.table
            .find_many(conn, filter, Some(doc! { "sequence_number": 1 }), None)
            .await
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

    async fn find_paging(
        &self,
        conn: &mut ClientSession,
        query: &PagingQuery,
    ) -> Result<PagingResult<Event>> {
        self.table.find_paging(conn, query).await
    }
}

//! MongoDB AggregateStore implementation.

use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::options::ReturnDocument;
use mongodb::{ClientSession, Collection};
use tracing::debug;

use super::dao::MongoTable;
use super::on_duplicate_key;
use crate::error::{Result, StorageError};
use crate::model::Aggregate;
use crate::storage::{AggregateStore, SequenceReservation};

/// MongoDB implementation of AggregateStore.
///
/// Counter and flag updates are single `find_one_and_update` calls
/// returning the document as it was before the update.
pub struct MongoAggregateStore {
    table: MongoTable<Aggregate>,
}

impl MongoAggregateStore {
    pub fn new(collection: Collection<Document>) -> Self {
        Self {
            table: MongoTable::new(collection),
        }
    }

    fn by_aggregate(tenant_id: &str, aggregate_id: &str) -> Document {
        doc! { "tenant_id": tenant_id, "aggregate_id": aggregate_id }
    }

    async fn mark_deleted(
        &self,
        conn: &mut ClientSession,
        tenant_id: &str,
        aggregate_id: &str,
        bump: i64,
    ) -> Result<Option<Aggregate>> {
        let mut live = Self::by_aggregate(tenant_id, aggregate_id);
        live.insert("deleted", false);
        let mut update = doc! { "$set": { "deleted": true } };
        if bump > 0 {
            update.insert("$inc", doc! { "sequence_number": bump });
        }

        let prior = self
            .table
            .find_one_and_update(conn, live, update, ReturnDocument::Before)
            .await?;
        match prior {
            Some(aggregate) => {
                debug!(
                    tenant_id = %tenant_id,
                    aggregate_id = %aggregate_id,
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
impl AggregateStore<ClientSession> for MongoAggregateStore {
    async fn create(&self, conn: &mut ClientSession, aggregate: &Aggregate) -> Result<()> {
        self.table.insert(conn, aggregate).await.map_err(|e| {
            on_duplicate_key(e, || StorageError::AlreadyExists {
                tenant_id: aggregate.tenant_id.clone(),
                aggregate_id: aggregate.aggregate_id.clone(),
            })
        })
    }

    async fn find_by_id(
        &self,
        conn: &mut ClientSession,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<Option<Aggregate>> {
        self.table
            .find_one(conn, Self::by_aggregate(tenant_id, aggregate_id))
            .await
    }

    async fn next_sequence_number(
        &self,
        conn: &mut ClientSession,
        tenant_id: &str,
        aggregate_id: &str,
        count: u64,
    ) -> Result<Option<SequenceReservation>> {
        let count = i64::try_from(count)
            .map_err(|_| StorageError::InvalidRequest(format!("too many events: {count}")))?;
        let prior = self
            .table
            .find_one_and_update(
                conn,
                Self::by_aggregate(tenant_id, aggregate_id),
                doc! { "$inc": { "sequence_number": count } },
                ReturnDocument::Before,
            )
            .await?;

        Ok(prior.map(|aggregate| {
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
        conn: &mut ClientSession,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<Option<Aggregate>> {
        self.mark_deleted(conn, tenant_id, aggregate_id, 1).await
    }

    async fn set_deleted(
        &self,
        conn: &mut ClientSession,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<Option<Aggregate>> {
        self.mark_deleted(conn, tenant_id, aggregate_id, 0).await
    }

    async fn delete_by_aggregate_id(
        &self,
        conn: &mut ClientSession,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<()> {
        self.table
            .delete_many(conn, Self::by_aggregate(tenant_id, aggregate_id))
            .await?;
        Ok(())
    }
}

//! MongoDB SnapshotStore implementation.

use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::{ClientSession, Collection};

use super::dao::MongoTable;
use crate::error::Result;
use crate::model::Snapshot;
use crate::storage::SnapshotStore;

/// MongoDB implementation of SnapshotStore.
pub struct MongoSnapshotStore {
    table: MongoTable<Snapshot>,
}

impl MongoSnapshotStore {
    pub fn new(collection: Collection<Document>) -> Self {
        Self {
            table: MongoTable::new(collection),
        }
    }
}

#[async_trait]
impl SnapshotStore<ClientSession> for MongoSnapshotStore {
    async fn create(&self, conn: &mut ClientSession, snapshot: &Snapshot) -> Result<()> {
        self.table.insert(conn, snapshot).await
    }

    async fn update(&self, conn: &mut ClientSession, snapshot: &Snapshot) -> Result<()> {
        self.table.replace(conn, snapshot).await
    }

    async fn find_by_max_sequence_number(
        &self,
        conn: &mut ClientSession,
        tenant_id: &str,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<Option<Snapshot>> {
        let filter = doc! {
            "tenant_id": tenant_id,
            "aggregate_id": aggregate_id,
            "aggregate_type": aggregate_type,
        };
        let mut latest = self
            .table
            .find_many(conn, filter, Some(doc! { "sequence_number": -1 }), Some(1))
            .await?;
        Ok(latest.pop())
    }

    async fn find_by_aggregate_id(
        &self,
        conn: &mut ClientSession,
        tenant_id: &str,
        aggregate_id: &str,
    ) -> Result<Vec<Snapshot>> {
        self.table
            .find_many(
                conn,
                doc! { "tenant_id": tenant_id, "aggregate_id": aggregate_id },
                Some(doc! { "sequence_number": 1 }),
                None,
            )
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
}

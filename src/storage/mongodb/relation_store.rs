//! MongoDB RelationStore implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::{ClientSession, Collection, Database};
use tracing::{debug, info};

use super::dao::MongoTable;
use super::init_relation_indexes;
use crate::error::Result;
use crate::model::{Entity, Relation};
use crate::paging::{PagingQuery, PagingResult};
use crate::rsql::as_target_name;
use crate::storage::{RelationStore, TargetCache};

/// MongoDB implementation of RelationStore: one collection per aggregate
/// type.
pub struct MongoRelationStore {
    database: Database,
    targets: TargetCache<Collection<Document>>,
}

impl MongoRelationStore {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            targets: TargetCache::new(),
        }
    }

    /// Cached handle, or a plain one when the collection has not been
    /// prepared by this process. Inserting into a missing collection
    /// creates it.
    async fn table(&self, name: &str) -> MongoTable<Relation> {
        let collection = match self.targets.get(name).await {
            Some(collection) => collection,
            None => self.database.collection(name),
        };
        MongoTable::new(collection)
    }
}

#[async_trait]
impl RelationStore<ClientSession> for MongoRelationStore {
    async fn ensure_target(&self, conn: &mut ClientSession, aggregate_type: &str) -> Result<String> {
        let name = as_target_name(aggregate_type)?;
        let collection: Collection<Document> = self.database.collection(&name);
        let created = self
            .targets
            .get_or_create(&name, || async move {
                init_relation_indexes(&collection, conn).await?;
                info!(collection = %collection.name(), "Relation collection ready");
                Ok(collection)
            })
            .await?;
        Ok(created.name().to_string())
    }

    async fn create_many(
        &self,
        conn: &mut ClientSession,
        tenant_id: &str,
        relations: &[Relation],
    ) -> Result<()> {
        if relations.is_empty() {
            return Ok(());
        }
        for relation in relations {
            relation.validate()?;
        }

        let mut by_collection: BTreeMap<&str, Vec<Relation>> = BTreeMap::new();
        for relation in relations {
            by_collection
                .entry(relation.table_name.as_str())
                .or_default()
                .push(relation.clone());
        }
        for (name, rows) in by_collection {
            self.table(name).await.insert_many(conn, &rows).await?;
        }

        debug!(tenant_id = %tenant_id, count = relations.len(), "Relations stored");
        Ok(())
    }

    async fn delete_by_aggregate_id(
        &self,
        conn: &mut ClientSession,
        tenant_id: &str,
        aggregate_id: &str,
        aggregate_type: &str,
    ) -> Result<()> {
        let name = as_target_name(aggregate_type)?;
        self.table(&name)
            .await
            .delete_many(conn, doc! { "tenant_id": tenant_id, "aggregate_id": aggregate_id })
            .await?;
        Ok(())
    }

    async fn find_paging(
        &self,
        conn: &mut ClientSession,
        aggregate_type: &str,
        query: &PagingQuery,
    ) -> Result<PagingResult<Relation>> {
        let name = as_target_name(aggregate_type)?;
        self.table(&name).await.find_paging(conn, query).await
    }
}

//! Generic collection access shared by the MongoDB stores.

use std::marker::PhantomData;

use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{ClientSession, Collection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{from_document, to_document};
use crate::error::{Result, StorageError};
use crate::model::Entity;
use crate::paging::{PagingQuery, PagingResult, SortOrder};
use crate::rsql::mongo::mongo_field;
use crate::rsql::{compile, MongoFilterVisitor};

/// One collection holding records of type `T`.
pub(crate) struct MongoTable<T> {
    collection: Collection<Document>,
    _record: PhantomData<fn() -> T>,
}

impl<T> MongoTable<T>
where
    T: Entity + Serialize + DeserializeOwned,
{
    pub fn new(collection: Collection<Document>) -> Self {
        Self {
            collection,
            _record: PhantomData,
        }
    }

    pub fn collection(&self) -> &Collection<Document> {
        &self.collection
    }

    pub fn name(&self) -> &str {
        self.collection.name()
    }

    /// Filter matching one record by tenant and id.
    pub fn by_id(tenant_id: &str, id: &str) -> Document {
        doc! { "tenant_id": tenant_id, "_id": id }
    }

    pub async fn insert(&self, conn: &mut ClientSession, record: &T) -> Result<()> {
        record.validate()?;
        self.collection
            .insert_one(to_document(record)?)
            .session(&mut *conn)
            .await?;
        debug!(collection = %self.name(), kind = T::KIND, id = %record.id(), "Record inserted");
        Ok(())
    }

    /// Validate and insert `records`. Empty input is a no-op.
    pub async fn insert_many(&self, conn: &mut ClientSession, records: &[T]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        for record in records {
            record.validate()?;
        }
        let documents = records
            .iter()
            .map(to_document)
            .collect::<Result<Vec<_>>>()?;
        self.collection
            .insert_many(documents)
            .session(&mut *conn)
            .await?;
        debug!(collection = %self.name(), kind = T::KIND, count = records.len(), "Records inserted");
        Ok(())
    }

    /// Replace the record with the same tenant and id.
    pub async fn replace(&self, conn: &mut ClientSession, record: &T) -> Result<()> {
        record.validate()?;
        let result = self
            .collection
            .replace_one(
                Self::by_id(record.tenant_id(), record.id()),
                to_document(record)?,
            )
            .session(&mut *conn)
            .await?;
        if result.matched_count == 0 {
            return Err(StorageError::InvalidRequest(format!(
                "{} '{}' not found",
                T::KIND,
                record.id()
            )));
        }
        debug!(collection = %self.name(), id = %record.id(), "Record replaced");
        Ok(())
    }

    pub async fn find_one(&self, conn: &mut ClientSession, filter: Document) -> Result<Option<T>> {
        self.collection
            .find_one(filter)
            .session(&mut *conn)
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn find_many(
        &self,
        conn: &mut ClientSession,
        filter: Document,
        sort: Option<Document>,
        limit: Option<i64>,
    ) -> Result<Vec<T>> {
        let options = FindOptions::builder().sort(sort).limit(limit).build();
        self.fetch(conn, filter, options).await
    }

    async fn fetch(
        &self,
        conn: &mut ClientSession,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<T>> {
        let mut cursor = self
            .collection
            .find(filter)
            .with_options(options)
            .session(&mut *conn)
            .await?;
        let documents: Vec<Document> = cursor.stream(&mut *conn).try_collect().await?;
        documents.into_iter().map(from_document).collect()
    }

    /// Atomically apply `update` to the first match and return it as it was
    /// before (`ReturnDocument::Before`) or after the update.
    pub async fn find_one_and_update(
        &self,
        conn: &mut ClientSession,
        filter: Document,
        update: Document,
        returned: ReturnDocument,
    ) -> Result<Option<T>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(returned)
            .build();
        self.collection
            .find_one_and_update(filter, update)
            .with_options(options)
            .session(&mut *conn)
            .await?
            .map(from_document)
            .transpose()
    }

    /// Delete matching documents; returns how many were removed.
    pub async fn delete_many(&self, conn: &mut ClientSession, filter: Document) -> Result<u64> {
        let result = self
            .collection
            .delete_many(filter)
            .session(&mut *conn)
            .await?;
        debug!(collection = %self.name(), deleted = result.deleted_count, "Records deleted");
        Ok(result.deleted_count)
    }

    /// Filter, sort and page through the collection within one tenant.
    pub async fn find_paging(
        &self,
        conn: &mut ClientSession,
        query: &PagingQuery,
    ) -> Result<PagingResult<T>> {
        let filter = compile(&query.filter, MongoFilterVisitor::new(), &query.tenant_id)?;

        let mut sort = Document::new();
        for field in query.sort_fields()? {
            let direction = match field.order {
                SortOrder::Asc => 1,
                SortOrder::Desc => -1,
            };
            sort.insert(mongo_field(&field.field), direction);
        }
        let (limit, skip) = match query.window() {
            Some((limit, offset)) => (Some(i64::try_from(limit).unwrap_or(i64::MAX)), Some(offset)),
            None => (None, None),
        };
        let options = FindOptions::builder()
            .sort((!sort.is_empty()).then_some(sort))
            .limit(limit)
            .skip(skip)
            .build();

        let data = self.fetch(conn, filter.clone(), options).await?;
        let total_rows = if query.is_total_rows {
            Some(
                self.collection
                    .count_documents(filter)
                    .session(&mut *conn)
                    .await?,
            )
        } else {
            None
        };

        debug!(
            collection = %self.name(),
            tenant_id = %query.tenant_id,
            rows = data.len(),
            "Paged query executed"
        );
        PagingResult::new(query, data, total_rows)
    }
}

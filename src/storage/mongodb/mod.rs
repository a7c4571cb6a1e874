//! MongoDB implementations of the storage traits.

mod aggregate_store;
mod dao;
mod event_store;
mod message_store;
mod relation_store;
mod session;
mod snapshot_store;

pub use aggregate_store::MongoAggregateStore;
pub use event_store::MongoEventStore;
pub use message_store::MongoMessageStore;
pub use relation_store::MongoRelationStore;
pub use session::{MongoSession, OwnedSession};
pub use snapshot_store::MongoSnapshotStore;

use std::sync::Arc;

use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, ClientSession, Collection, Database, IndexModel};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::config::{StorageConfig, TableNames};
use crate::error::{Result, StorageError};
use crate::publish::Publisher;
use crate::service::{EventStorage, StorageOptions};
use crate::storage::Stores;

const DUPLICATE_KEY: i32 = 11000;

/// Serialize a record, storing its `id` as the document `_id`.
pub(crate) fn to_document<T: Serialize>(record: &T) -> Result<Document> {
    let mut document = mongodb::bson::to_document(record)?;
    if let Some(id) = document.remove("id") {
        document.insert("_id", id);
    }
    Ok(document)
}

pub(crate) fn from_document<T: DeserializeOwned>(mut document: Document) -> Result<T> {
    if let Some(id) = document.remove("_id") {
        document.insert("id", id);
    }
    Ok(mongodb::bson::from_document(document)?)
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_err)) => write_err.code == DUPLICATE_KEY,
        ErrorKind::Command(command_err) => command_err.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Replace a duplicate-key error with `mapped()`.
pub(crate) fn on_duplicate_key(
    err: StorageError,
    mapped: impl FnOnce() -> StorageError,
) -> StorageError {
    match &err {
        StorageError::Mongo(e) if is_duplicate_key(e) => mapped(),
        _ => err,
    }
}

async fn create_index(
    collection: &Collection<Document>,
    conn: Option<&mut ClientSession>,
    keys: Document,
    unique: bool,
) -> Result<()> {
    let index = IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(unique).build())
        .build();
    match conn {
        Some(conn) => collection.create_index(index).session(conn).await?,
        None => collection.create_index(index).await?,
    };
    Ok(())
}

/// Create the indexes of the fixed collections. Idempotent.
pub async fn init_indexes(database: &Database, tables: &TableNames) -> Result<()> {
    let aggregates = database.collection::<Document>(&tables.aggregate);
    create_index(&aggregates, None, doc! { "tenant_id": 1, "aggregate_id": 1 }, true).await?;

    let events = database.collection::<Document>(&tables.event);
    create_index(
        &events,
        None,
        doc! { "tenant_id": 1, "aggregate_id": 1, "sequence_number": 1 },
        true,
    )
    .await?;
    create_index(&events, None, doc! { "event_id": 1 }, true).await?;

    let snapshots = database.collection::<Document>(&tables.snapshot);
    create_index(
        &snapshots,
        None,
        doc! { "tenant_id": 1, "aggregate_id": 1, "aggregate_type": 1, "sequence_number": -1 },
        false,
    )
    .await?;

    let messages = database.collection::<Document>(&tables.message);
    create_index(&messages, None, doc! { "create_time": 1 }, false).await?;
    create_index(&messages, None, doc! { "tenant_id": 1, "aggregate_id": 1 }, false).await?;

    info!(database = %database.name(), "MongoDB indexes ready");
    Ok(())
}

/// Relation collection indexes, created with the collection.
pub(crate) async fn init_relation_indexes(
    collection: &Collection<Document>,
    conn: &mut ClientSession,
) -> Result<()> {
    create_index(
        collection,
        Some(&mut *conn),
        doc! { "tenant_id": 1, "rel_name": 1, "rel_value": 1 },
        false,
    )
    .await?;
    create_index(
        collection,
        Some(&mut *conn),
        doc! { "tenant_id": 1, "aggregate_id": 1 },
        false,
    )
    .await
}

/// MongoDB stores over the configured collections.
pub fn stores(database: &Database, tables: &TableNames) -> Stores<ClientSession> {
    Stores {
        aggregates: Arc::new(MongoAggregateStore::new(database.collection(&tables.aggregate))),
        events: Arc::new(MongoEventStore::new(database.collection(&tables.event))),
        snapshots: Arc::new(MongoSnapshotStore::new(database.collection(&tables.snapshot))),
        relations: Arc::new(MongoRelationStore::new(database.clone())),
        messages: Arc::new(MongoMessageStore::new(database.collection(&tables.message))),
    }
}

/// Connect, create the indexes and assemble an [`EventStorage`].
pub async fn connect(
    config: &StorageConfig,
    options: StorageOptions,
    publisher: Arc<dyn Publisher>,
) -> Result<EventStorage<MongoSession>> {
    let client = Client::with_uri_str(&config.mongodb.uri).await?;
    let database = client.database(&config.mongodb.database);
    init_indexes(&database, &config.tables).await?;
    info!(database = %config.mongodb.database, "MongoDB connected");

    Ok(EventStorage::new(
        MongoSession::new(client),
        stores(&database, &config.tables),
        publisher,
        options,
    ))
}

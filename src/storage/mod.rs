//! Storage layer.
//!
//! One trait per record kind, generic over the backend connection type,
//! plus the [`Session`] that hands out connections and transactions.
//! Backends live behind cargo features.

mod aggregate_store;
mod event_store;
mod message_store;
mod relation_store;
mod session;
mod snapshot_store;
mod targets;

#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "mongodb")]
pub mod mongodb;

use std::sync::Arc;

pub use aggregate_store::{AggregateStore, SequenceReservation};
pub use event_store::EventStore;
pub use message_store::MessageStore;
pub use relation_store::RelationStore;
pub use session::{use_transaction, Session};
pub use snapshot_store::SnapshotStore;
pub use targets::TargetCache;

/// The five stores of one backend, all operating on connection type `C`.
pub struct Stores<C: Send + 'static> {
    pub aggregates: Arc<dyn AggregateStore<C>>,
    pub events: Arc<dyn EventStore<C>>,
    pub snapshots: Arc<dyn SnapshotStore<C>>,
    pub relations: Arc<dyn RelationStore<C>>,
    pub messages: Arc<dyn MessageStore<C>>,
}

impl<C: Send + 'static> Clone for Stores<C> {
    fn clone(&self) -> Self {
        Self {
            aggregates: Arc::clone(&self.aggregates),
            events: Arc::clone(&self.events),
            snapshots: Arc::clone(&self.snapshots),
            relations: Arc::clone(&self.relations),
            messages: Arc::clone(&self.messages),
        }
    }
}

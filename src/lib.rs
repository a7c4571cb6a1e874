//! eventstorage - multi-tenant event-sourcing storage engine
//!
//! Persists aggregates, events, snapshots and relation indexes, stages
//! every event in a transactional outbox, and publishes it after commit.
//! Paged queries take RSQL filters compiled for SQLite or MongoDB.

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod outbox;
pub mod paging;
pub mod publish;
pub mod response;
pub mod rsql;
pub mod service;
pub mod storage;

pub use error::{Result, StorageError};
pub use service::{EventStorage, StorageOptions};

//! Persisted records.
//!
//! Every record is scoped by `tenant_id` and carries a globally unique `id`.
//! Field names serialize in snake_case, which is also what filter
//! identifiers map to.

mod aggregate;
mod event;
mod message;
mod relation;
mod snapshot;
pub mod timestamp;

pub use aggregate::Aggregate;
pub use event::Event;
pub use message::Message;
pub use relation::Relation;
pub use snapshot::Snapshot;

use crate::error::{Result, StorageError};

/// Common accessors of a stored record.
///
/// Lets one generic data-access layer per backend serve every record type.
pub trait Entity: Send + Sync {
    /// Short name used in validation errors and logs.
    const KIND: &'static str;

    fn id(&self) -> &str;

    fn tenant_id(&self) -> &str;

    /// Check required fields before any I/O.
    fn validate(&self) -> Result<()> {
        require(Self::KIND, "id", self.id())?;
        require(Self::KIND, "tenant_id", self.tenant_id())
    }
}

/// Fail with a validation error when `value` is empty.
pub(crate) fn require(entity: &'static str, field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        Err(StorageError::validation(entity, field))
    } else {
        Ok(())
    }
}

/// Fresh random identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

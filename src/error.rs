//! Error types shared by every layer of the storage engine.

use crate::response::ResponseStatus;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
///
/// Absence is never an error: lookups return `Ok(None)` (or a paged result
/// with `is_found == false`) when nothing matches.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{entity}: field '{field}' must not be empty")]
    Validation {
        entity: &'static str,
        field: &'static str,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Aggregate already exists: tenant_id={tenant_id}, aggregate_id={aggregate_id}")]
    AlreadyExists {
        tenant_id: String,
        aggregate_id: String,
    },

    #[error("Aggregate not found: tenant_id={tenant_id}, aggregate_id={aggregate_id}")]
    AggregateNotFound {
        tenant_id: String,
        aggregate_id: String,
    },

    #[error("Aggregate already deleted: tenant_id={tenant_id}, aggregate_id={aggregate_id}")]
    AlreadyDeleted {
        tenant_id: String,
        aggregate_id: String,
    },

    #[error("Duplicate event: event_id={event_id}")]
    DuplicateEvent { event_id: String },

    #[error("Lex error at position {position}: {message}")]
    Lex { position: usize, message: String },

    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Invalid sort '{0}': order must be asc or desc")]
    InvalidSort(String),

    #[error("Invalid storage target name: '{0}'")]
    InvalidTargetName(String),

    #[error("Publish failed for event {event_id}: {message}")]
    Publish { event_id: String, message: String },

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Operation panicked: {0}")]
    Panicked(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "mongodb")]
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON encode error: {0}")]
    BsonEncode(#[from] mongodb::bson::ser::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON decode error: {0}")]
    BsonDecode(#[from] mongodb::bson::de::Error),
}

impl StorageError {
    /// Caller-visible status for this error.
    ///
    /// Duplicates are reported separately so a caller can treat a replayed
    /// command as already applied.
    pub fn status(&self) -> ResponseStatus {
        match self {
            StorageError::DuplicateEvent { .. } => ResponseStatus::EventDuplicate,
            _ => ResponseStatus::Error,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, StorageError::DuplicateEvent { .. })
    }

    pub(crate) fn validation(entity: &'static str, field: &'static str) -> Self {
        StorageError::Validation { entity, field }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_maps_to_event_duplicate_status() {
        let err = StorageError::DuplicateEvent {
            event_id: "e-1".to_string(),
        };
        assert_eq!(err.status(), ResponseStatus::EventDuplicate);
        assert!(err.is_duplicate());
    }

    #[test]
    fn test_other_errors_map_to_error_status() {
        let err = StorageError::validation("event", "tenant_id");
        assert_eq!(err.status(), ResponseStatus::Error);
        assert_eq!(err.to_string(), "event: field 'tenant_id' must not be empty");
    }
}

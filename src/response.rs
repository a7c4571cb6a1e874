//! Caller-facing response envelope.
//!
//! Failures cross the service boundary as a status plus message so callers
//! can tell a replayed command apart from a real failure.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Outcome class of an operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    #[default]
    Success,
    Error,
    /// The event was already stored; safe to ignore.
    EventDuplicate,
}

/// Status and message returned with every response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub status: ResponseStatus,
    pub message: String,
}

impl ResponseHeader {
    pub fn success() -> Self {
        Self::default()
    }

    /// Build the header describing `result`.
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::success(),
            Err(e) => Self {
                status: e.status(),
                message: e.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

/// Split a result into a response header and its value.
pub fn respond<T>(result: Result<T>) -> (ResponseHeader, Option<T>) {
    let header = ResponseHeader::from_result(&result);
    (header, result.ok())
}

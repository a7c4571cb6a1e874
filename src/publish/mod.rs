//! Publish boundary.
//!
//! After the write transaction commits, every staged event is handed to a
//! [`Publisher`]. Success lets the outbox row go; failure leaves it staged
//! for republish.

mod channel;
mod mock;

pub use channel::ChannelPublisher;
pub use mock::MockPublisher;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::Event;

/// Content type of every published payload.
pub const CONTENT_TYPE_JSON: &str = "json";

/// Errors a publisher can report.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Publish rejected: {0}")]
    Rejected(String),

    #[error("No subscribers for topic '{0}'")]
    NoSubscribers(String),
}

/// One message for the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    pub pubsub_name: String,
    pub topic: String,
    pub metadata: HashMap<String, String>,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Wire body of a published event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub event_id: String,
    pub event_data: serde_json::Value,
    pub event_type: String,
    pub event_version: String,
    pub sequence_number: u64,
}

impl PublishRequest {
    /// Request publishing `event` to its pubsub/topic with its metadata.
    pub fn from_event(event: &Event) -> serde_json::Result<Self> {
        let payload = EventPayload {
            event_id: event.event_id.clone(),
            event_data: event.event_data.clone(),
            event_type: event.event_type.clone(),
            event_version: event.event_version.clone(),
            sequence_number: event.sequence_number,
        };
        Ok(Self {
            pubsub_name: event.pubsub_name.clone(),
            topic: event.topic.clone(),
            metadata: event.metadata.clone(),
            content_type: CONTENT_TYPE_JSON.to_string(),
            data: serde_json::to_vec(&payload)?,
        })
    }

    pub fn payload(&self) -> serde_json::Result<EventPayload> {
        serde_json::from_slice(&self.data)
    }
}

/// Outbound message sink.
///
/// Implementations:
/// - `ChannelPublisher`: in-process tokio broadcast channel
/// - `MockPublisher`: records requests for tests
///
/// Consumers must be idempotent on `eventId`: a staged event may be
/// published more than once.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, request: PublishRequest) -> Result<(), PublishError>;
}

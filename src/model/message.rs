use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require, timestamp, Entity, Event};
use crate::error::Result;

/// Outbox row: an event committed but not yet acknowledged as published.
///
/// `id` equals the wrapped event's `event_id`, so staging the same event
/// twice is a duplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub tenant_id: String,
    pub aggregate_id: String,
    pub event_id: String,
    #[serde(with = "timestamp")]
    pub create_time: DateTime<Utc>,
    /// Failed republish attempts so far.
    #[serde(default)]
    pub retry_count: u32,
    pub event: Event,
}

impl Message {
    pub fn new(event: Event) -> Self {
        Self {
            id: event.event_id.clone(),
            tenant_id: event.tenant_id.clone(),
            aggregate_id: event.aggregate_id.clone(),
            event_id: event.event_id.clone(),
            create_time: timestamp::now(),
            retry_count: 0,
            event,
        }
    }
}

impl Entity for Message {
    const KIND: &'static str = "message";

    fn id(&self) -> &str {
        &self.id
    }

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn validate(&self) -> Result<()> {
        require(Self::KIND, "id", &self.id)?;
        require(Self::KIND, "tenant_id", &self.tenant_id)?;
        require(Self::KIND, "aggregate_id", &self.aggregate_id)?;
        require(Self::KIND, "event_id", &self.event_id)
    }
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require, timestamp, Entity};
use crate::error::Result;

/// Immutable domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub tenant_id: String,
    pub command_id: String,
    pub event_id: String,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub event_type: String,
    pub event_version: String,
    /// Unique and strictly increasing per `(tenant_id, aggregate_id)`.
    pub sequence_number: u64,
    pub event_data: serde_json::Value,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub topic: String,
    pub pubsub_name: String,
    #[serde(with = "timestamp")]
    pub time_stamp: DateTime<Utc>,
}

impl Entity for Event {
    const KIND: &'static str = "event";

    fn id(&self) -> &str {
        &self.id
    }

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn validate(&self) -> Result<()> {
        require(Self::KIND, "id", &self.id)?;
        require(Self::KIND, "tenant_id", &self.tenant_id)?;
        require(Self::KIND, "event_id", &self.event_id)?;
        require(Self::KIND, "event_version", &self.event_version)?;
        require(Self::KIND, "topic", &self.topic)?;
        require(Self::KIND, "aggregate_type", &self.aggregate_type)?;
        require(Self::KIND, "aggregate_id", &self.aggregate_id)?;
        require(Self::KIND, "pubsub_name", &self.pubsub_name)
    }
}

//! Request and response types of [`super::EventStorage`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{new_id, timestamp, Aggregate, Event, Snapshot};

/// One event as submitted by a caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventDto {
    pub command_id: String,
    pub event_id: String,
    pub event_type: String,
    pub event_version: String,
    pub event_data: serde_json::Value,
    pub metadata: HashMap<String, String>,
    /// Relation name to value. Empty values are not indexed.
    pub relations: HashMap<String, String>,
    /// Defaults to the time of the write.
    pub event_time: Option<DateTime<Utc>>,
    pub pubsub_name: String,
    pub topic: String,
}

impl EventDto {
    /// Stored form of this event at `sequence_number`.
    pub fn to_event(
        &self,
        tenant_id: &str,
        aggregate_id: &str,
        aggregate_type: &str,
        sequence_number: u64,
    ) -> Event {
        Event {
            id: new_id(),
            tenant_id: tenant_id.to_string(),
            command_id: self.command_id.clone(),
            event_id: self.event_id.clone(),
            aggregate_id: aggregate_id.to_string(),
            aggregate_type: aggregate_type.to_string(),
            event_type: self.event_type.clone(),
            event_version: self.event_version.clone(),
            sequence_number,
            event_data: self.event_data.clone(),
            metadata: self.metadata.clone(),
            topic: self.topic.clone(),
            pubsub_name: self.pubsub_name.clone(),
            time_stamp: self.event_time.unwrap_or_else(timestamp::now),
        }
    }
}

/// Create an aggregate together with its first events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateEventRequest {
    pub tenant_id: String,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub events: Vec<EventDto>,
}

/// Append events to an existing aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplyEventsRequest {
    pub tenant_id: String,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub events: Vec<EventDto>,
}

/// Mark an aggregate deleted and append the event recording it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteEventRequest {
    pub tenant_id: String,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub event: EventDto,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveSnapshotRequest {
    pub tenant_id: String,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub aggregate_data: serde_json::Value,
    pub aggregate_version: String,
    pub sequence_number: u64,
    pub metadata: HashMap<String, String>,
}

impl SaveSnapshotRequest {
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            id: new_id(),
            tenant_id: self.tenant_id.clone(),
            aggregate_id: self.aggregate_id.clone(),
            aggregate_type: self.aggregate_type.clone(),
            sequence_number: self.sequence_number,
            aggregate_data: self.aggregate_data.clone(),
            aggregate_version: self.aggregate_version.clone(),
            metadata: self.metadata.clone(),
            time_stamp: timestamp::now(),
        }
    }
}

/// Everything needed to rebuild an aggregate: the latest snapshot and the
/// events recorded after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadEventsResponse {
    pub tenant_id: String,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub aggregate: Option<Aggregate>,
    pub snapshot: Option<Snapshot>,
    pub events: Vec<Event>,
}

impl LoadEventsResponse {
    pub fn is_found(&self) -> bool {
        self.aggregate.is_some()
    }

    /// Sequence number the replay starts after.
    pub fn replay_from(&self) -> u64 {
        self.snapshot.as_ref().map_or(0, |s| s.sequence_number)
    }
}

//! Shared storage contract tests.
//!
//! Tests every store trait against all backends. Each backend test binary
//! imports these functions and runs them through the `run_*_tests!` macros.

#![allow(dead_code)]

pub mod aggregate_store_tests;
pub mod event_store_tests;
pub mod message_store_tests;
pub mod relation_store_tests;
pub mod snapshot_store_tests;

use std::collections::HashMap;

use eventstorage::model::{new_id, timestamp, Aggregate, Event, Message, Relation, Snapshot};

pub const AGGREGATE_TYPE: &str = "OrderItem";

/// Fresh id with a readable prefix, so runs never collide.
pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", new_id())
}

pub fn make_aggregate(tenant_id: &str, aggregate_id: &str, sequence_number: u64) -> Aggregate {
    Aggregate::new(tenant_id, aggregate_id, AGGREGATE_TYPE, sequence_number)
}

/// Create a test event at `sequence_number`.
pub fn make_event(tenant_id: &str, aggregate_id: &str, sequence_number: u64, event_type: &str) -> Event {
    Event {
        id: new_id(),
        tenant_id: tenant_id.to_string(),
        command_id: unique("cmd"),
        event_id: unique("evt"),
        aggregate_id: aggregate_id.to_string(),
        aggregate_type: AGGREGATE_TYPE.to_string(),
        event_type: event_type.to_string(),
        event_version: "1.0".to_string(),
        sequence_number,
        event_data: serde_json::json!({
            "amount": sequence_number * 10,
            "customer": { "name": "bob" },
        }),
        metadata: HashMap::from([("source".to_string(), "contract-test".to_string())]),
        topic: "orders".to_string(),
        pubsub_name: "pubsub".to_string(),
        time_stamp: timestamp::now(),
    }
}

/// Create events `1..=count`.
pub fn make_events(tenant_id: &str, aggregate_id: &str, count: u64) -> Vec<Event> {
    (1..=count)
        .map(|seq| make_event(tenant_id, aggregate_id, seq, &format!("Event{seq}")))
        .collect()
}

pub fn make_snapshot(tenant_id: &str, aggregate_id: &str, sequence_number: u64) -> Snapshot {
    Snapshot {
        id: new_id(),
        tenant_id: tenant_id.to_string(),
        aggregate_id: aggregate_id.to_string(),
        aggregate_type: AGGREGATE_TYPE.to_string(),
        sequence_number,
        aggregate_data: serde_json::json!({ "total": sequence_number * 10 }),
        aggregate_version: "1.0".to_string(),
        metadata: HashMap::new(),
        time_stamp: timestamp::now(),
    }
}

pub fn make_relations(tenant_id: &str, aggregate_id: &str, customer: &str) -> Vec<Relation> {
    let relations = HashMap::from([
        ("customerId".to_string(), customer.to_string()),
        ("warehouse".to_string(), "north".to_string()),
    ]);
    Relation::expand(
        tenant_id,
        &unique("evt"),
        "ItemAdded",
        aggregate_id,
        AGGREGATE_TYPE,
        &relations,
    )
    .expect("expand should succeed")
}

pub fn make_message(tenant_id: &str, aggregate_id: &str) -> Message {
    Message::new(make_event(tenant_id, aggregate_id, 1, "Created"))
}

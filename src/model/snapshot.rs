use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require, timestamp, Entity};
use crate::error::Result;

/// Materialized aggregate state as of `sequence_number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub tenant_id: String,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub sequence_number: u64,
    pub aggregate_data: serde_json::Value,
    pub aggregate_version: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(with = "timestamp")]
    pub time_stamp: DateTime<Utc>,
}

impl Entity for Snapshot {
    const KIND: &'static str = "snapshot";

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
        require(Self::KIND, "aggregate_type", &self.aggregate_type)
    }
}

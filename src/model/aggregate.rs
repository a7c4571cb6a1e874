use serde::{Deserialize, Serialize};

use super::{new_id, require, Entity};
use crate::error::Result;

/// Per-aggregate sequence counter and soft-delete flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub id: String,
    pub tenant_id: String,
    pub aggregate_id: String,
    pub aggregate_type: String,
    /// Highest sequence number handed out so far.
    pub sequence_number: u64,
    pub deleted: bool,
}

impl Aggregate {
    pub fn new(
        tenant_id: impl Into<String>,
        aggregate_id: impl Into<String>,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
    ) -> Self {
        Self {
            id: new_id(),
            tenant_id: tenant_id.into(),
            aggregate_id: aggregate_id.into(),
            aggregate_type: aggregate_type.into(),
            sequence_number,
            deleted: false,
        }
    }
}

impl Entity for Aggregate {
    const KIND: &'static str = "aggregate";

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

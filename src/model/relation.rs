use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{new_id, require, Entity};
use crate::error::Result;
use crate::rsql::{as_storage_name, as_target_name};

/// One named relation value of an aggregate, indexed for lookup.
///
/// Stored in a table/collection named after the aggregate type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    pub tenant_id: String,
    pub table_name: String,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub event_id: String,
    pub event_type: String,
    pub is_deleted: bool,
    pub rel_name: String,
    pub rel_value: String,
}

impl Relation {
    /// One relation per non-empty entry of `relations`, sorted by name.
    pub fn expand(
        tenant_id: &str,
        event_id: &str,
        event_type: &str,
        aggregate_id: &str,
        aggregate_type: &str,
        relations: &HashMap<String, String>,
    ) -> Result<Vec<Relation>> {
        if relations.is_empty() {
            return Ok(Vec::new());
        }
        let table_name = as_target_name(aggregate_type)?;
        let mut names: Vec<&String> = relations.keys().collect();
        names.sort();

        Ok(names
            .into_iter()
            .filter_map(|name| {
                let value = &relations[name];
                (!value.is_empty()).then(|| Relation {
                    id: new_id(),
                    tenant_id: tenant_id.to_string(),
                    table_name: table_name.clone(),
                    aggregate_id: aggregate_id.to_string(),
                    aggregate_type: aggregate_type.to_string(),
                    event_id: event_id.to_string(),
                    event_type: event_type.to_string(),
                    is_deleted: false,
                    rel_name: as_storage_name(name),
                    rel_value: value.clone(),
                })
            })
            .collect())
    }
}

impl Entity for Relation {
    const KIND: &'static str = "relation";

    fn id(&self) -> &str {
        &self.id
    }

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn validate(&self) -> Result<()> {
        require(Self::KIND, "table_name", &self.table_name)?;
        require(Self::KIND, "tenant_id", &self.tenant_id)?;
        require(Self::KIND, "aggregate_id", &self.aggregate_id)?;
        require(Self::KIND, "aggregate_type", &self.aggregate_type)?;
        require(Self::KIND, "id", &self.id)
    }
}

//! Access-control grants attached to a dataset.
//!
//! On the wire an entry is a flat record: an optional `role` plus exactly one
//! key naming the entity type, e.g. `{"role": "OWNER", "userByEmail": "a@b.c"}`
//! or `{"view": {"projectId": ..., "datasetId": ..., "tableId": ...}}`.

use crate::{
    errors::{DatasetError, DatasetResult},
    models::reference::TableReference,
};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

/// Kind of principal an [`AccessEntry`] grants access to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityType {
    UserByEmail,
    GroupByEmail,
    Domain,
    SpecialGroup,
    /// An authorized view; the only kind that carries no role.
    View,
}

impl EntityType {
    pub const ALL: [EntityType; 5] = [
        EntityType::UserByEmail,
        EntityType::GroupByEmail,
        EntityType::Domain,
        EntityType::SpecialGroup,
        EntityType::View,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::UserByEmail => "userByEmail",
            EntityType::GroupByEmail => "groupByEmail",
            EntityType::Domain => "domain",
            EntityType::SpecialGroup => "specialGroup",
            EntityType::View => "view",
        }
    }
}

impl FromStr for EntityType {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == s)
            .ok_or_else(|| DatasetError::invalid(format!("entity type `{s}` is not recognized")))
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One grant of a role to an identity, or of access to a view.
///
/// Immutable once built. A `view` entry never has a role and every other
/// entry always has one; both constructors enforce this.
#[derive(Clone, Debug, PartialEq)]
pub struct AccessEntry {
    role: Option<String>,
    entity_type: EntityType,
    entity_id: Value,
}

impl AccessEntry {
    /// Build an entry from its loose parts.
    ///
    /// Fails with `InvalidArgument` for an unknown entity type, a `view` with
    /// a role, or any other entity type without one.
    pub fn new(
        role: Option<&str>,
        entity_type: &str,
        entity_id: impl Into<Value>,
    ) -> DatasetResult<Self> {
        let entity_type = entity_type.parse::<EntityType>()?;
        Self::from_parts(role.map(str::to_string), entity_type, entity_id.into())
    }

    pub fn from_parts(
        role: Option<String>,
        entity_type: EntityType,
        entity_id: Value,
    ) -> DatasetResult<Self> {
        match (&role, entity_type) {
            (Some(role), EntityType::View) => {
                return Err(DatasetError::invalid(format!(
                    "role must be unset for view entries, got `{role}`"
                )));
            }
            (None, other) if other != EntityType::View => {
                return Err(DatasetError::invalid(format!(
                    "role must be set for `{other}` entries"
                )));
            }
            _ => {}
        }
        Ok(Self {
            role,
            entity_type,
            entity_id,
        })
    }

    pub fn user_by_email(role: impl Into<String>, email: impl Into<String>) -> Self {
        Self::with_role(role, EntityType::UserByEmail, email)
    }

    pub fn group_by_email(role: impl Into<String>, email: impl Into<String>) -> Self {
        Self::with_role(role, EntityType::GroupByEmail, email)
    }

    pub fn domain(role: impl Into<String>, domain: impl Into<String>) -> Self {
        Self::with_role(role, EntityType::Domain, domain)
    }

    pub fn special_group(role: impl Into<String>, group: impl Into<String>) -> Self {
        Self::with_role(role, EntityType::SpecialGroup, group)
    }

    /// Grant the given view read access to the dataset.
    pub fn view(table: &TableReference) -> Self {
        let entity_id = Value::Object(Map::from_iter([
            ("projectId".to_string(), Value::from(table.project.clone())),
            ("datasetId".to_string(), Value::from(table.dataset_id.clone())),
            ("tableId".to_string(), Value::from(table.table_id.clone())),
        ]));
        Self {
            role: None,
            entity_type: EntityType::View,
            entity_id,
        }
    }

    fn with_role(role: impl Into<String>, entity_type: EntityType, id: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            entity_type,
            entity_id: Value::String(id.into()),
        }
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn entity_id(&self) -> &Value {
        &self.entity_id
    }

    /// Parse one wire record.
    ///
    /// After removing `role`, exactly one key must remain and it must name a
    /// recognized entity type.
    pub fn from_api_repr(record: &Map<String, Value>) -> DatasetResult<Self> {
        let role = match record.get("role") {
            None | Some(Value::Null) => None,
            Some(Value::String(role)) => Some(role.clone()),
            Some(other) => {
                return Err(DatasetError::invalid(format!(
                    "access entry role must be a string, got {other}"
                )));
            }
        };

        let mut remaining = record.iter().filter(|(key, _)| key.as_str() != "role");
        let (entity_type, entity_id) = match (remaining.next(), remaining.next()) {
            (Some(pair), None) => pair,
            _ => {
                return Err(DatasetError::invalid(format!(
                    "access entry must name exactly one entity: {}",
                    Value::Object(record.clone())
                )));
            }
        };

        Self::from_parts(role, entity_type.parse()?, entity_id.clone())
    }

    /// Flatten back into `{role?, <entity_type>: <entity_id>}`.
    pub fn to_api_repr(&self) -> Map<String, Value> {
        let mut record = Map::new();
        if let Some(role) = &self.role {
            record.insert("role".into(), Value::String(role.clone()));
        }
        record.insert(self.entity_type.as_str().into(), self.entity_id.clone());
        record
    }
}

/// Parse the `access` list of a dataset resource, preserving order.
pub fn parse_access_entries(records: &[Value]) -> DatasetResult<Vec<AccessEntry>> {
    records
        .iter()
        .map(|record| match record {
            Value::Object(map) => AccessEntry::from_api_repr(map),
            other => Err(DatasetError::invalid(format!(
                "access entry must be an object, got {other}"
            ))),
        })
        .collect()
}

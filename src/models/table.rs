//! Tables: children of a dataset.

use crate::{
    errors::{DatasetError, DatasetResult},
    models::reference::{DatasetReference, TableReference},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A column in a table schema.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    pub name: String,

    /// Column type (e.g. STRING, INTEGER, RECORD).
    #[serde(rename = "type")]
    pub field_type: String,

    /// NULLABLE, REQUIRED or REPEATED.
    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Sub-fields of a RECORD column.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<SchemaField>,
}

fn default_mode() -> String {
    "NULLABLE".into()
}

impl SchemaField {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            mode: default_mode(),
            description: None,
            fields: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }
}

/// A table inside a dataset.
///
/// Holds the parent's identity, never the parent itself.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    reference: TableReference,
    pub schema: Vec<SchemaField>,
    full_table_id: Option<String>,
    table_type: Option<String>,
}

impl Table {
    pub fn new(reference: TableReference, schema: Vec<SchemaField>) -> Self {
        Self {
            reference,
            schema,
            full_table_id: None,
            table_type: None,
        }
    }

    pub fn table_id(&self) -> &str {
        &self.reference.table_id
    }

    pub fn reference(&self) -> &TableReference {
        &self.reference
    }

    /// The dataset this table belongs to.
    pub fn dataset(&self) -> DatasetReference {
        self.reference.dataset()
    }

    /// `{project}:{dataset_id}.{table_id}`, as reported by the service.
    pub fn full_table_id(&self) -> Option<&str> {
        self.full_table_id.as_deref()
    }

    /// TABLE, VIEW or EXTERNAL, as reported by the service.
    pub fn table_type(&self) -> Option<&str> {
        self.table_type.as_deref()
    }

    pub fn path(&self) -> String {
        self.reference.path()
    }

    /// Build a table from one item of a table listing.
    ///
    /// `tableReference.tableId` is required; a missing project or dataset id
    /// falls back to `dataset`.
    pub fn from_api_repr(resource: &Value, dataset: &DatasetReference) -> DatasetResult<Self> {
        let reference = resource
            .get("tableReference")
            .ok_or_else(|| DatasetError::missing_key("tableReference"))?;
        let table_id = reference
            .get("tableId")
            .and_then(Value::as_str)
            .ok_or_else(|| DatasetError::missing_key("tableId"))?;
        let project = reference
            .get("projectId")
            .and_then(Value::as_str)
            .unwrap_or(dataset.project.as_str());
        let dataset_id = reference
            .get("datasetId")
            .and_then(Value::as_str)
            .unwrap_or(dataset.dataset_id.as_str());

        let schema = match resource.pointer("/schema/fields") {
            Some(fields) => serde_json::from_value(fields.clone())?,
            None => Vec::new(),
        };

        Ok(Self {
            reference: DatasetReference::new(project, dataset_id).table(table_id),
            schema,
            full_table_id: resource.get("id").and_then(Value::as_str).map(str::to_string),
            table_type: resource.get("type").and_then(Value::as_str).map(str::to_string),
        })
    }
}

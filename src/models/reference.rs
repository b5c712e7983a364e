//! Identity values for datasets and tables.

use serde::{Deserialize, Serialize};

/// Identifies a dataset within a project.
///
/// Tables and table listings hold one of these instead of the `Dataset`
/// itself, so a dataset can be dropped while children are still around.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct DatasetReference {
    #[serde(rename = "projectId")]
    pub project: String,
    pub dataset_id: String,
}

impl DatasetReference {
    pub fn new(project: impl Into<String>, dataset_id: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            dataset_id: dataset_id.into(),
        }
    }

    /// `/projects/{project}/datasets/{dataset_id}`
    pub fn path(&self) -> String {
        format!("/projects/{}/datasets/{}", self.project, self.dataset_id)
    }

    pub fn table(&self, table_id: impl Into<String>) -> TableReference {
        TableReference {
            project: self.project.clone(),
            dataset_id: self.dataset_id.clone(),
            table_id: table_id.into(),
        }
    }
}

/// Identifies a table within a dataset. Also the payload of a `view` access entry.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct TableReference {
    #[serde(rename = "projectId")]
    pub project: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl TableReference {
    pub fn dataset(&self) -> DatasetReference {
        DatasetReference::new(self.project.clone(), self.dataset_id.clone())
    }

    pub fn path(&self) -> String {
        format!(
            "/projects/{}/datasets/{}/tables/{}",
            self.project, self.dataset_id, self.table_id
        )
    }
}

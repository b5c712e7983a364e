//! Partial updates to a dataset.

use crate::{
    errors::{DatasetError, DatasetResult},
    models::dataset::Dataset,
};
use serde_json::{Map, Value};

/// Named overrides for [`Dataset::patch`].
///
/// Each field is independently optional. An outer `None` leaves the field out
/// of the request; `Some(None)` clears it on the server (sent as `null`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatasetPatch {
    default_table_expiration_ms: Option<Option<i64>>,
    description: Option<Option<String>>,
    friendly_name: Option<Option<String>>,
    location: Option<Option<String>>,
}

impl DatasetPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_table_expiration_ms(mut self, ms: i64) -> Self {
        self.default_table_expiration_ms = Some(Some(ms));
        self
    }

    pub fn clear_default_table_expiration_ms(mut self) -> Self {
        self.default_table_expiration_ms = Some(None);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Some(description.into()));
        self
    }

    pub fn clear_description(mut self) -> Self {
        self.description = Some(None);
        self
    }

    pub fn friendly_name(mut self, friendly_name: impl Into<String>) -> Self {
        self.friendly_name = Some(Some(friendly_name.into()));
        self
    }

    pub fn clear_friendly_name(mut self) -> Self {
        self.friendly_name = Some(None);
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(Some(location.into()));
        self
    }

    pub fn clear_location(mut self) -> Self {
        self.location = Some(None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Read overrides from a JSON object keyed by field name
    /// (`default_table_expiration_ms`, `description`, `friendly_name`,
    /// `location`). A `null` value clears the field.
    ///
    /// Unknown names and wrongly typed values fail with `InvalidArgument`.
    pub fn from_json(overrides: &Value) -> DatasetResult<Self> {
        let Value::Object(fields) = overrides else {
            return Err(DatasetError::invalid(format!(
                "patch overrides must be an object, got {overrides}"
            )));
        };

        let mut patch = Self::new();
        for (name, value) in fields {
            match name.as_str() {
                "default_table_expiration_ms" => {
                    patch.default_table_expiration_ms = Some(match value {
                        Value::Null => None,
                        other => Some(other.as_i64().ok_or_else(|| {
                            DatasetError::invalid(format!(
                                "default_table_expiration_ms must be an integer, got {other}"
                            ))
                        })?),
                    });
                }
                "description" => patch.description = Some(string_override(name, value)?),
                "friendly_name" => patch.friendly_name = Some(string_override(name, value)?),
                "location" => patch.location = Some(string_override(name, value)?),
                unknown => {
                    return Err(DatasetError::invalid(format!(
                        "`{unknown}` cannot be patched"
                    )));
                }
            }
        }
        Ok(patch)
    }

    /// Apply the overrides through the dataset's setters.
    pub(crate) fn apply(&self, dataset: &mut Dataset) {
        if let Some(ms) = self.default_table_expiration_ms {
            dataset.set_default_table_expiration_ms(ms);
        }
        if let Some(description) = &self.description {
            dataset.set_description(description.as_deref());
        }
        if let Some(friendly_name) = &self.friendly_name {
            dataset.set_friendly_name(friendly_name.as_deref());
        }
        if let Some(location) = &self.location {
            dataset.set_location(location.as_deref());
        }
    }

    /// Request body holding only the given overrides.
    pub fn to_api_repr(&self) -> Value {
        let mut body = Map::new();
        if let Some(ms) = self.default_table_expiration_ms {
            body.insert("defaultTableExpirationMs".into(), ms.into());
        }
        if let Some(description) = &self.description {
            body.insert("description".into(), description.clone().into());
        }
        if let Some(friendly_name) = &self.friendly_name {
            body.insert("friendlyName".into(), friendly_name.clone().into());
        }
        if let Some(location) = &self.location {
            body.insert("location".into(), location.clone().into());
        }
        Value::Object(body)
    }
}

fn string_override(name: &str, value: &Value) -> DatasetResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(DatasetError::invalid(format!(
            "{name} must be a string, got {other}"
        ))),
    }
}

//! Represents a dataset: a named container of tables with its own access list.
//!
//! A `Dataset` mirrors the service's resource. Mutable fields are edited
//! locally and pushed with `create`/`update`/`patch`; server-assigned fields
//! are only ever filled from a response, replacing the whole local snapshot.

use crate::{
    client::Client,
    errors::{DatasetError, DatasetResult},
    models::{
        access_entry::{AccessEntry, parse_access_entries},
        reference::DatasetReference,
        table::{SchemaField, Table},
    },
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A dataset bound to a client.
#[derive(Clone, Debug)]
pub struct Dataset {
    client: Client,
    dataset_id: String,
    project: String,

    access_entries: Vec<AccessEntry>,
    default_table_expiration_ms: Option<i64>,
    description: Option<String>,
    friendly_name: Option<String>,
    location: Option<String>,

    server: ServerFields,
}

/// Fields only the service assigns.
#[derive(Clone, Debug, Default, PartialEq)]
struct ServerFields {
    created: Option<DateTime<Utc>>,
    full_dataset_id: Option<String>,
    etag: Option<String>,
    modified: Option<DateTime<Utc>>,
    self_link: Option<String>,
}

impl Dataset {
    /// A local handle in the client's project. No request is made.
    pub fn new(dataset_id: impl Into<String>, client: &Client) -> Self {
        Self {
            client: client.clone(),
            dataset_id: dataset_id.into(),
            project: client.project().to_string(),
            access_entries: Vec::new(),
            default_table_expiration_ms: None,
            description: None,
            friendly_name: None,
            location: None,
            server: ServerFields::default(),
        }
    }

    /// Place the dataset in another project than the client's.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    pub fn with_access_entries(mut self, entries: impl IntoIterator<Item = AccessEntry>) -> Self {
        self.set_access_entries(entries);
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// `/projects/{project}/datasets/{dataset_id}`
    pub fn path(&self) -> String {
        self.reference().path()
    }

    pub fn reference(&self) -> DatasetReference {
        DatasetReference::new(self.project.clone(), self.dataset_id.clone())
    }

    pub fn access_entries(&self) -> &[AccessEntry] {
        &self.access_entries
    }

    /// Replace the access list with a copy of `entries`.
    pub fn set_access_entries(&mut self, entries: impl IntoIterator<Item = AccessEntry>) {
        self.access_entries = entries.into_iter().collect();
    }

    pub fn default_table_expiration_ms(&self) -> Option<i64> {
        self.default_table_expiration_ms
    }

    pub fn set_default_table_expiration_ms(&mut self, ms: Option<i64>) {
        self.default_table_expiration_ms = ms;
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: Option<&str>) {
        self.description = description.map(str::to_string);
    }

    pub fn friendly_name(&self) -> Option<&str> {
        self.friendly_name.as_deref()
    }

    pub fn set_friendly_name(&mut self, friendly_name: Option<&str>) {
        self.friendly_name = friendly_name.map(str::to_string);
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn set_location(&mut self, location: Option<&str>) {
        self.location = location.map(str::to_string);
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.server.created
    }

    /// `{project}:{dataset_id}`, once the service has reported it.
    pub fn full_dataset_id(&self) -> Option<&str> {
        self.server.full_dataset_id.as_deref()
    }

    pub fn etag(&self) -> Option<&str> {
        self.server.etag.as_deref()
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.server.modified
    }

    pub fn self_link(&self) -> Option<&str> {
        self.server.self_link.as_deref()
    }

    /// A table in this dataset. No request is made.
    pub fn table(&self, table_id: impl Into<String>, schema: Vec<SchemaField>) -> Table {
        Table::new(self.reference().table(table_id), schema)
    }

    /// Build a dataset from a resource returned by the service.
    ///
    /// `datasetReference.projectId` and `datasetReference.datasetId` are
    /// required; everything else is optional.
    pub fn from_api_repr(resource: &Value, client: &Client) -> DatasetResult<Self> {
        let parsed = DatasetResource::parse(resource)?;
        let identity = parsed
            .dataset_reference
            .as_ref()
            .ok_or_else(|| DatasetError::missing_key("datasetReference"))?;
        let project = identity
            .project_id
            .clone()
            .ok_or_else(|| DatasetError::missing_key("projectId"))?;
        let dataset_id = identity
            .dataset_id
            .clone()
            .ok_or_else(|| DatasetError::missing_key("datasetId"))?;

        let mut dataset = Dataset::new(dataset_id, client).with_project(project);
        dataset.apply_resource(parsed)?;
        Ok(dataset)
    }

    /// Replace every field but the identity with the contents of `resource`.
    ///
    /// Nothing is changed if the resource fails to parse.
    pub(crate) fn set_properties(&mut self, resource: &Value) -> DatasetResult<()> {
        let parsed = DatasetResource::parse(resource)?;
        self.apply_resource(parsed)
    }

    fn apply_resource(&mut self, resource: DatasetResource) -> DatasetResult<()> {
        let access_entries = match &resource.access {
            Some(records) => parse_access_entries(records)?,
            None => Vec::new(),
        };
        let server = ServerFields {
            created: resource.creation_time,
            full_dataset_id: resource.id,
            etag: resource.etag,
            modified: resource.last_modified_time,
            self_link: resource.self_link,
        };

        self.access_entries = access_entries;
        self.default_table_expiration_ms = resource.default_table_expiration_ms;
        self.description = resource.description;
        self.friendly_name = resource.friendly_name;
        self.location = resource.location;
        self.server = server;
        Ok(())
    }

    /// Resource body for `create` and `update`.
    ///
    /// Always carries the identity block; optional fields appear only when
    /// set locally, never as explicit nulls.
    pub fn to_api_repr(&self) -> DatasetResult<Value> {
        let access = (!self.access_entries.is_empty()).then(|| {
            self.access_entries
                .iter()
                .map(AccessEntry::to_api_repr)
                .collect::<Vec<_>>()
        });
        let body = DatasetBody {
            dataset_reference: self.reference(),
            default_table_expiration_ms: self.default_table_expiration_ms,
            description: self.description.as_deref(),
            friendly_name: self.friendly_name.as_deref(),
            location: self.location.as_deref(),
            access,
        };
        Ok(serde_json::to_value(body)?)
    }
}

/// Outbound resource body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DatasetBody<'a> {
    dataset_reference: DatasetReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_table_expiration_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    friendly_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    access: Option<Vec<Map<String, Value>>>,
}

/// Inbound resource, every field optional so missing identity can be
/// reported by name.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetResource {
    dataset_reference: Option<IdentityBlock>,
    id: Option<String>,
    etag: Option<String>,
    self_link: Option<String>,
    #[serde(default, deserialize_with = "timestamp_opt")]
    creation_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp_opt")]
    last_modified_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "int64_opt")]
    default_table_expiration_ms: Option<i64>,
    description: Option<String>,
    friendly_name: Option<String>,
    location: Option<String>,
    access: Option<Vec<Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityBlock {
    project_id: Option<String>,
    dataset_id: Option<String>,
}

impl DatasetResource {
    fn parse(resource: &Value) -> DatasetResult<Self> {
        match resource {
            Value::Object(_) => Ok(serde_json::from_value(resource.clone())?),
            other => Err(DatasetError::invalid(format!(
                "dataset resource must be an object, got {other}"
            ))),
        }
    }
}

/// An int64 field as it arrived on the wire.
enum WireInt {
    Int(i64),
    Float(f64),
}

/// The service encodes int64 fields as decimal strings; older responses and
/// hand-built fixtures use plain numbers, sometimes with a fraction.
fn wire_int_opt<'de, D>(deserializer: D) -> Result<Option<WireInt>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let parsed = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(WireInt::Int)
            .or_else(|| n.as_f64().map(WireInt::Float))
            .ok_or_else(|| D::Error::custom(format!("expected int64, got {n}")))?,
        Some(Value::String(s)) => match s.parse::<i64>() {
            Ok(i) => WireInt::Int(i),
            Err(_) => s
                .parse::<f64>()
                .map(WireInt::Float)
                .map_err(|_| D::Error::custom(format!("expected int64, got `{s}`")))?,
        },
        Some(other) => return Err(D::Error::custom(format!("expected int64, got {other}"))),
    };
    Ok(Some(parsed))
}

/// Exact conversion: the float must be whole and inside i64 range.
fn float_to_i64(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then_some(f as i64)
}

fn int64_opt<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match wire_int_opt(deserializer)? {
        None => Ok(None),
        Some(WireInt::Int(i)) => Ok(Some(i)),
        Some(WireInt::Float(f)) => float_to_i64(f)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected int64, got {f}"))),
    }
}

/// Epoch milliseconds to UTC. Fractional values keep microsecond precision.
fn timestamp_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let when = match wire_int_opt(deserializer)? {
        None => return Ok(None),
        Some(WireInt::Int(ms)) => DateTime::<Utc>::from_timestamp_millis(ms),
        Some(WireInt::Float(ms)) => {
            float_to_i64((ms * 1000.0).round()).and_then(DateTime::<Utc>::from_timestamp_micros)
        }
    };
    when.map(Some)
        .ok_or_else(|| D::Error::custom("timestamp is out of range"))
}

//! src/services/memory.rs
//!
//! MemoryConnection: an in-process stand-in for the dataset service. It
//! answers the same paths and verbs the client issues, keeps datasets and
//! their tables in memory, and assigns the server-side fields (`id`, `etag`,
//! timestamps, `selfLink`) the way the real service does. Nothing is
//! persisted.

use crate::{
    client::{ApiRequest, Connection, Method},
    errors::ApiError,
};
use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use futures::future::BoxFuture;
use serde_json::{Map, Value, json};
use std::{
    collections::BTreeMap,
    ops::Bound::{Excluded, Unbounded},
};
use tokio::sync::Mutex;
use tracing::debug;

const DEFAULT_MAX_RESULTS: usize = 50;
const MAX_RESULTS_LIMIT: usize = 1000;
const MAX_ID_LEN: usize = 1024;

/// Keys only the service may set; dropped from incoming bodies.
const READ_ONLY_KEYS: [&str; 6] = [
    "kind",
    "id",
    "etag",
    "selfLink",
    "creationTime",
    "lastModifiedTime",
];

type DatasetKey = (String, String);

#[derive(Debug)]
struct StoredDataset {
    resource: Map<String, Value>,
    tables: BTreeMap<String, Value>,
}

/// Which collection or resource a request path names.
#[derive(Debug, PartialEq, Eq)]
enum Route {
    Datasets { project: String },
    Dataset { project: String, dataset_id: String },
    Tables { project: String, dataset_id: String },
}

pub struct MemoryConnection {
    /// Prefix for generated `selfLink` values.
    base_url: String,
    datasets: Mutex<BTreeMap<DatasetKey, StoredDataset>>,
}

impl Default for MemoryConnection {
    fn default() -> Self {
        Self::new("memory://datasets/v2")
    }
}

impl MemoryConnection {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            datasets: Mutex::new(BTreeMap::new()),
        }
    }

    /// Seed a table into an existing dataset.
    ///
    /// Returns 404 if the dataset is missing and 409 if the table exists.
    pub async fn insert_table(
        &self,
        project: &str,
        dataset_id: &str,
        table_id: &str,
        table_type: &str,
    ) -> Result<(), ApiError> {
        ensure_id_safe("table", table_id)?;
        let mut datasets = self.datasets.lock().await;
        let stored = datasets
            .get_mut(&(project.to_string(), dataset_id.to_string()))
            .ok_or_else(|| not_found_dataset(project, dataset_id))?;
        if stored.tables.contains_key(table_id) {
            return Err(ApiError::conflict(format!(
                "Already Exists: Table {project}:{dataset_id}.{table_id}"
            )));
        }

        stored.tables.insert(
            table_id.to_string(),
            json!({
                "kind": "bigquery#table",
                "id": format!("{project}:{dataset_id}.{table_id}"),
                "tableReference": {
                    "projectId": project,
                    "datasetId": dataset_id,
                    "tableId": table_id,
                },
                "type": table_type,
                "creationTime": Utc::now().timestamp_millis().to_string(),
            }),
        );
        debug!("inserted table {}:{}.{}", project, dataset_id, table_id);
        Ok(())
    }

    /// Number of stored datasets across all projects.
    pub async fn dataset_count(&self) -> usize {
        self.datasets.lock().await.len()
    }

    async fn handle(&self, request: ApiRequest) -> Result<Value, ApiError> {
        debug!("{} {} {:?}", request.method, request.path, request.query);
        match (request.method, parse_route(&request.path)?) {
            (Method::Post, Route::Datasets { project }) => {
                self.create_dataset(&project, request.body).await
            }
            (Method::Get, Route::Dataset { project, dataset_id }) => {
                self.get_dataset(&project, &dataset_id, request.query.get("fields"))
                    .await
            }
            (Method::Put, Route::Dataset { project, dataset_id }) => {
                self.replace_dataset(&project, &dataset_id, request.body)
                    .await
            }
            (Method::Patch, Route::Dataset { project, dataset_id }) => {
                self.patch_dataset(&project, &dataset_id, request.body).await
            }
            (Method::Delete, Route::Dataset { project, dataset_id }) => {
                self.delete_dataset(&project, &dataset_id).await
            }
            (Method::Get, Route::Tables { project, dataset_id }) => {
                self.list_tables(&project, &dataset_id, &request).await
            }
            (method, _) => Err(ApiError::bad_request(format!(
                "{} is not supported on {}",
                method, request.path
            ))),
        }
    }

    /// Insert a new dataset. Returns 409 if it already exists.
    async fn create_dataset(&self, project: &str, body: Option<Value>) -> Result<Value, ApiError> {
        let mut resource = body_object(body)?;
        let dataset_id = body_identity(&resource, project)?;

        let mut datasets = self.datasets.lock().await;
        let key = (project.to_string(), dataset_id.clone());
        if datasets.contains_key(&key) {
            return Err(ApiError::conflict(format!(
                "Already Exists: Dataset {project}:{dataset_id}"
            )));
        }

        strip_read_only(&mut resource);
        let now = Utc::now().timestamp_millis().to_string();
        resource.insert("creationTime".into(), Value::String(now));
        self.stamp(&mut resource, project, &dataset_id);

        let stored = StoredDataset {
            resource,
            tables: BTreeMap::new(),
        };
        let out = Value::Object(stored.resource.clone());
        datasets.insert(key, stored);
        debug!("created dataset {}:{}", project, dataset_id);
        Ok(out)
    }

    async fn get_dataset(
        &self,
        project: &str,
        dataset_id: &str,
        fields: Option<&String>,
    ) -> Result<Value, ApiError> {
        let datasets = self.datasets.lock().await;
        let stored = datasets
            .get(&(project.to_string(), dataset_id.to_string()))
            .ok_or_else(|| not_found_dataset(project, dataset_id))?;

        match fields.map(String::as_str) {
            Some("id") => Ok(json!({ "id": stored.resource.get("id") })),
            _ => Ok(Value::Object(stored.resource.clone())),
        }
    }

    /// Full replacement: every mutable field comes from `body`.
    async fn replace_dataset(
        &self,
        project: &str,
        dataset_id: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let mut resource = body_object(body)?;
        if body_identity(&resource, project)? != dataset_id {
            return Err(ApiError::bad_request(
                "datasetReference does not match the request path",
            ));
        }

        let mut datasets = self.datasets.lock().await;
        let stored = datasets
            .get_mut(&(project.to_string(), dataset_id.to_string()))
            .ok_or_else(|| not_found_dataset(project, dataset_id))?;

        strip_read_only(&mut resource);
        if let Some(created) = stored.resource.get("creationTime") {
            resource.insert("creationTime".into(), created.clone());
        }
        self.stamp(&mut resource, project, dataset_id);
        stored.resource = resource;
        Ok(Value::Object(stored.resource.clone()))
    }

    /// Merge `body` into the stored resource; a `null` value removes the key.
    async fn patch_dataset(
        &self,
        project: &str,
        dataset_id: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let mut changes = body_object(body)?;
        if changes.contains_key("datasetReference")
            && body_identity(&changes, project)? != dataset_id
        {
            return Err(ApiError::bad_request(
                "datasetReference does not match the request path",
            ));
        }
        strip_read_only(&mut changes);

        let mut datasets = self.datasets.lock().await;
        let stored = datasets
            .get_mut(&(project.to_string(), dataset_id.to_string()))
            .ok_or_else(|| not_found_dataset(project, dataset_id))?;

        for (key, value) in changes {
            if value.is_null() {
                stored.resource.remove(&key);
            } else {
                stored.resource.insert(key, value);
            }
        }
        self.stamp(&mut stored.resource, project, dataset_id);
        Ok(Value::Object(stored.resource.clone()))
    }

    /// Remove a dataset together with its tables.
    async fn delete_dataset(&self, project: &str, dataset_id: &str) -> Result<Value, ApiError> {
        let removed = self
            .datasets
            .lock()
            .await
            .remove(&(project.to_string(), dataset_id.to_string()))
            .ok_or_else(|| not_found_dataset(project, dataset_id))?;
        debug!(
            "deleted dataset {}:{} with {} tables",
            project,
            dataset_id,
            removed.tables.len()
        );
        Ok(json!({}))
    }

    /// List tables ordered by id.
    ///
    /// Fetches one entry past the page size to decide whether another page
    /// exists; the last id on the page becomes the (encoded) next token.
    async fn list_tables(
        &self,
        project: &str,
        dataset_id: &str,
        request: &ApiRequest,
    ) -> Result<Value, ApiError> {
        let max_results = match request.query.get("maxResults") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| ApiError::bad_request(format!("invalid maxResults `{raw}`")))?,
            None => DEFAULT_MAX_RESULTS,
        }
        .clamp(1, MAX_RESULTS_LIMIT);
        let start_after = request
            .query
            .get("pageToken")
            .map(|token| decode_page_token(token))
            .transpose()?;

        let datasets = self.datasets.lock().await;
        let stored = datasets
            .get(&(project.to_string(), dataset_id.to_string()))
            .ok_or_else(|| not_found_dataset(project, dataset_id))?;

        let lower = match &start_after {
            Some(after) => Excluded(after.as_str()),
            None => Unbounded,
        };
        let mut rows: Vec<(&String, &Value)> = stored
            .tables
            .range::<str, _>((lower, Unbounded))
            .take(max_results + 1)
            .collect();

        let mut next_page_token = None;
        if rows.len() > max_results {
            rows.truncate(max_results);
            if let Some((last, _)) = rows.last() {
                next_page_token = Some(encode_page_token(last));
            }
        }

        let mut body = Map::new();
        body.insert("kind".into(), json!("bigquery#tableList"));
        body.insert(
            "tables".into(),
            Value::Array(rows.into_iter().map(|(_, table)| table.clone()).collect()),
        );
        body.insert("totalItems".into(), json!(stored.tables.len()));
        if let Some(token) = next_page_token {
            body.insert("nextPageToken".into(), Value::String(token));
        }
        Ok(Value::Object(body))
    }

    /// Assign the server-owned fields after a write.
    fn stamp(&self, resource: &mut Map<String, Value>, project: &str, dataset_id: &str) {
        resource.insert("kind".into(), json!("bigquery#dataset"));
        resource.insert("id".into(), json!(format!("{project}:{dataset_id}")));
        resource.insert(
            "selfLink".into(),
            json!(format!(
                "{}/projects/{}/datasets/{}",
                self.base_url, project, dataset_id
            )),
        );
        resource.insert(
            "lastModifiedTime".into(),
            json!(Utc::now().timestamp_millis().to_string()),
        );
        resource.remove("etag");
        let digest = md5::compute(Value::Object(resource.clone()).to_string());
        resource.insert("etag".into(), json!(format!("{:x}", digest)));
    }
}

impl Connection for MemoryConnection {
    fn request(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value, ApiError>> {
        Box::pin(self.handle(request))
    }
}

/// Split `/projects/{p}/datasets[/{d}[/tables]]` into a route.
fn parse_route(path: &str) -> Result<Route, ApiError> {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    match segments.as_slice() {
        ["projects", project, "datasets"] => Ok(Route::Datasets {
            project: project.to_string(),
        }),
        ["projects", project, "datasets", dataset_id] => Ok(Route::Dataset {
            project: project.to_string(),
            dataset_id: dataset_id.to_string(),
        }),
        ["projects", project, "datasets", dataset_id, "tables"] => Ok(Route::Tables {
            project: project.to_string(),
            dataset_id: dataset_id.to_string(),
        }),
        _ => Err(ApiError::bad_request(format!("unknown path {path}"))),
    }
}

fn body_object(body: Option<Value>) -> Result<Map<String, Value>, ApiError> {
    match body {
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(ApiError::bad_request(format!(
            "request body must be an object, got {other}"
        ))),
        None => Err(ApiError::bad_request("request body is required")),
    }
}

/// Dataset id named by the body's `datasetReference`, checked against the
/// project in the path.
fn body_identity(resource: &Map<String, Value>, project: &str) -> Result<String, ApiError> {
    let reference = resource
        .get("datasetReference")
        .ok_or_else(|| ApiError::bad_request("datasetReference is required"))?;
    let body_project = reference.get("projectId").and_then(Value::as_str);
    if body_project != Some(project) {
        return Err(ApiError::bad_request(format!(
            "datasetReference.projectId must be `{project}`"
        )));
    }
    let dataset_id = reference
        .get("datasetId")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("datasetReference.datasetId is required"))?;
    ensure_id_safe("dataset", dataset_id)?;
    Ok(dataset_id.to_string())
}

/// Dataset and table ids: 1-1024 letters, digits or underscores.
fn ensure_id_safe(kind: &str, id: &str) -> Result<(), ApiError> {
    if id.is_empty() || id.len() > MAX_ID_LEN {
        return Err(ApiError::bad_request(format!(
            "{kind} id must be between 1 and {MAX_ID_LEN} characters"
        )));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ApiError::bad_request(format!(
            "invalid {kind} id `{id}`: allowed characters are letters, digits and underscores"
        )));
    }
    Ok(())
}

fn strip_read_only(resource: &mut Map<String, Value>) {
    for key in READ_ONLY_KEYS {
        resource.remove(key);
    }
}

fn not_found_dataset(project: &str, dataset_id: &str) -> ApiError {
    ApiError::not_found(format!("Not found: Dataset {project}:{dataset_id}"))
}

fn encode_page_token(last_table_id: &str) -> String {
    general_purpose::STANDARD.encode(last_table_id)
}

fn decode_page_token(token: &str) -> Result<String, ApiError> {
    general_purpose::STANDARD
        .decode(token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| ApiError::bad_request(format!("invalid pageToken `{token}`")))
}

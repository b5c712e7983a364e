//! The request collaborator and the client handle that carries it.
//!
//! Transport, authentication and retries live behind [`Connection`]; this
//! crate only builds paths, query parameters and JSON bodies.

use crate::{
    config::ClientConfig,
    errors::{ApiError, DatasetResult},
    models::dataset::Dataset,
};
use futures::future::BoxFuture;
use serde_json::Value;
use std::{collections::BTreeMap, fmt, sync::Arc};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request against the service. `path` is relative to the API root.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: BTreeMap::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Request transport used by datasets and table listings.
///
/// Implementations must report a missing resource with status 404 so that
/// [`Dataset::exists`] can tell it apart from other failures.
pub trait Connection: Send + Sync {
    fn request(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value, ApiError>>;
}

/// Shared handle to a project and its connection. Cloning is cheap.
#[derive(Clone)]
pub struct Client {
    project: String,
    page_size: Option<u32>,
    connection: Arc<dyn Connection>,
}

impl Client {
    pub fn new(project: impl Into<String>, connection: Arc<dyn Connection>) -> Self {
        Self {
            project: project.into(),
            page_size: None,
            connection,
        }
    }

    pub fn from_config(cfg: &ClientConfig, connection: Arc<dyn Connection>) -> Self {
        Self {
            project: cfg.project.clone(),
            page_size: cfg.page_size,
            connection,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    /// A dataset handle bound to this client. No request is made.
    pub fn dataset(&self, dataset_id: impl Into<String>) -> Dataset {
        Dataset::new(dataset_id, self)
    }

    pub(crate) async fn execute(&self, request: ApiRequest) -> DatasetResult<Value> {
        Ok(self.connection.request(request).await?)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("project", &self.project)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

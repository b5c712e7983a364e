#![allow(dead_code)]

use dataset_client::{ApiError, ApiRequest, Client, Connection};
use futures::future::BoxFuture;
use serde_json::{Value, json};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

pub const PROJECT: &str = "project";
pub const DS_ID: &str = "dataset-id";
pub const WHEN_MS: i64 = 1_437_767_599_006;
pub const ETAG: &str = "ETAG";
pub const RESOURCE_URL: &str = "http://example.com/path/to/resource";

/// Answers with canned responses in order and records every request.
/// Once the responses run out it answers 404.
#[derive(Default)]
pub struct RecordingConnection {
    responses: Mutex<VecDeque<Value>>,
    requested: Mutex<Vec<ApiRequest>>,
}

impl RecordingConnection {
    pub fn new(responses: impl IntoIterator<Item = Value>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requested: Mutex::new(Vec::new()),
        })
    }

    pub fn requested(&self) -> Vec<ApiRequest> {
        self.requested.lock().unwrap().clone()
    }
}

impl Connection for RecordingConnection {
    fn request(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value, ApiError>> {
        self.requested.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        Box::pin(async move { next.ok_or_else(|| ApiError::not_found("miss")) })
    }
}

/// Always fails with the given status.
pub struct FailingConnection(pub u16);

impl Connection for FailingConnection {
    fn request(&self, _request: ApiRequest) -> BoxFuture<'_, Result<Value, ApiError>> {
        let status = self.0;
        Box::pin(async move { Err(ApiError::new(status, "boom")) })
    }
}

pub fn client(conn: Arc<RecordingConnection>) -> Client {
    dataset_client::telemetry::init();
    Client::new(PROJECT, conn)
}

pub fn make_resource() -> Value {
    json!({
        "creationTime": WHEN_MS.to_string(),
        "datasetReference": {"projectId": PROJECT, "datasetId": DS_ID},
        "etag": ETAG,
        "id": format!("{PROJECT}:{DS_ID}"),
        "lastModifiedTime": WHEN_MS.to_string(),
        "location": "US",
        "selfLink": RESOURCE_URL,
        "access": [
            {"role": "OWNER", "userByEmail": "phred@example.com"},
            {"role": "OWNER", "groupByEmail": "group-name@lists.example.com"},
            {"role": "WRITER", "specialGroup": "projectWriters"},
            {"role": "READER", "specialGroup": "projectReaders"},
        ],
    })
}

pub fn identity() -> Value {
    json!({"projectId": PROJECT, "datasetId": DS_ID})
}

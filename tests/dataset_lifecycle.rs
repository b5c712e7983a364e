mod common;

use chrono::{TimeZone, Utc};
use common::*;
use dataset_client::{
    AccessEntry, Client, DatasetError, DatasetPatch, DatasetReference, Method,
};
use serde_json::{Value, json};
use std::sync::Arc;

fn assert_matches_resource(dataset: &dataset_client::Dataset, resource: &Value) {
    let when = Utc.timestamp_millis_opt(WHEN_MS).unwrap();
    assert_eq!(dataset.dataset_id(), DS_ID);
    assert_eq!(
        dataset.created(),
        resource.get("creationTime").map(|_| when)
    );
    assert_eq!(
        dataset.modified(),
        resource.get("lastModifiedTime").map(|_| when)
    );
    assert_eq!(dataset.etag(), resource.get("etag").and_then(Value::as_str));
    assert_eq!(dataset.self_link(), resource.get("selfLink").and_then(Value::as_str));
    assert_eq!(dataset.description(), resource.get("description").and_then(Value::as_str));
    assert_eq!(
        dataset.friendly_name(),
        resource.get("friendlyName").and_then(Value::as_str)
    );
    assert_eq!(dataset.location(), resource.get("location").and_then(Value::as_str));

    let flattened: Vec<Value> = dataset
        .access_entries()
        .iter()
        .map(|entry| Value::Object(entry.to_api_repr()))
        .collect();
    let expected = resource
        .get("access")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    assert_eq!(flattened, expected);
}

#[tokio::test]
async fn create_with_bound_client() {
    let resource = make_resource();
    let conn = RecordingConnection::new([resource.clone()]);
    let mut dataset = client(conn.clone()).dataset(DS_ID);

    dataset.create().await.unwrap();

    let requested = conn.requested();
    assert_eq!(requested.len(), 1);
    assert_eq!(requested[0].method, Method::Post);
    assert_eq!(requested[0].path, "/projects/project/datasets");
    assert_eq!(requested[0].body, Some(json!({"datasetReference": identity()})));
    assert_matches_resource(&dataset, &resource);
}

#[tokio::test]
async fn create_with_alternate_client_sends_only_set_fields() {
    let mut resource = make_resource();
    resource["description"] = json!("DESCRIPTION");
    resource["friendlyName"] = json!("TITLE");
    let conn1 = RecordingConnection::new([]);
    let conn2 = RecordingConnection::new([resource.clone()]);
    let client2 = client(conn2.clone());
    let mut dataset = client(conn1.clone()).dataset(DS_ID);

    dataset.set_friendly_name(Some("TITLE"));
    dataset.set_description(Some("DESCRIPTION"));
    let view = DatasetReference::new("my-proj", "starry-skies").table("northern-hemisphere");
    dataset.set_access_entries([
        AccessEntry::user_by_email("OWNER", "phred@example.com"),
        AccessEntry::group_by_email("OWNER", "group-name@lists.example.com"),
        AccessEntry::domain("READER", "foo.com"),
        AccessEntry::special_group("READER", "projectReaders"),
        AccessEntry::special_group("WRITER", "projectWriters"),
        AccessEntry::view(&view),
    ]);

    dataset.create_with(&client2).await.unwrap();

    assert!(conn1.requested().is_empty());
    let requested = conn2.requested();
    assert_eq!(requested.len(), 1);
    assert_eq!(requested[0].method, Method::Post);
    assert_eq!(requested[0].path, "/projects/project/datasets");
    assert_eq!(
        requested[0].body,
        Some(json!({
            "datasetReference": identity(),
            "description": "DESCRIPTION",
            "friendlyName": "TITLE",
            "access": [
                {"role": "OWNER", "userByEmail": "phred@example.com"},
                {"role": "OWNER", "groupByEmail": "group-name@lists.example.com"},
                {"role": "READER", "domain": "foo.com"},
                {"role": "READER", "specialGroup": "projectReaders"},
                {"role": "WRITER", "specialGroup": "projectWriters"},
                {"view": {
                    "projectId": "my-proj",
                    "datasetId": "starry-skies",
                    "tableId": "northern-hemisphere",
                }},
            ],
        }))
    );
    assert_matches_resource(&dataset, &resource);
}

#[tokio::test]
async fn create_tolerates_missing_timestamps() {
    let mut resource = make_resource();
    resource.as_object_mut().unwrap().remove("creationTime");
    resource.as_object_mut().unwrap().remove("lastModifiedTime");
    let conn = RecordingConnection::new([resource.clone()]);
    let mut dataset = client(conn.clone()).dataset(DS_ID);

    dataset.create().await.unwrap();

    assert_eq!(dataset.created(), None);
    assert_eq!(dataset.modified(), None);
    assert_matches_resource(&dataset, &resource);
}

#[tokio::test]
async fn create_propagates_conflict() {
    let client = Client::new(PROJECT, Arc::new(FailingConnection(409)));
    let mut dataset = client.dataset(DS_ID);

    let err = dataset.create().await.unwrap_err();

    assert!(matches!(err, DatasetError::Api(api) if api.status == 409));
    assert_eq!(dataset.etag(), None);
}

#[tokio::test]
async fn exists_miss() {
    let conn = RecordingConnection::new([]);
    let dataset = client(conn.clone()).dataset(DS_ID);

    assert!(!dataset.exists().await.unwrap());

    let requested = conn.requested();
    assert_eq!(requested.len(), 1);
    assert_eq!(requested[0].method, Method::Get);
    assert_eq!(requested[0].path, "/projects/project/datasets/dataset-id");
    assert_eq!(requested[0].query.get("fields").map(String::as_str), Some("id"));
    assert_eq!(requested[0].query.len(), 1);
}

#[tokio::test]
async fn exists_hit_with_alternate_client() {
    let conn1 = RecordingConnection::new([]);
    let conn2 = RecordingConnection::new([json!({})]);
    let dataset = client(conn1.clone()).dataset(DS_ID);

    assert!(dataset.exists_with(&client(conn2.clone())).await.unwrap());

    assert!(conn1.requested().is_empty());
    assert_eq!(conn2.requested().len(), 1);
}

#[tokio::test]
async fn exists_propagates_other_errors() {
    let client = Client::new(PROJECT, Arc::new(FailingConnection(500)));
    let err = client.dataset(DS_ID).exists().await.unwrap_err();
    assert!(matches!(err, DatasetError::Api(api) if api.status == 500));
}

#[tokio::test]
async fn reload_with_bound_and_alternate_client() {
    let resource = make_resource();
    let conn = RecordingConnection::new([resource.clone()]);
    let mut dataset = client(conn.clone()).dataset(DS_ID);
    dataset.reload().await.unwrap();
    assert_eq!(conn.requested()[0].method, Method::Get);
    assert_eq!(conn.requested()[0].path, "/projects/project/datasets/dataset-id");
    assert!(conn.requested()[0].body.is_none());
    assert_matches_resource(&dataset, &resource);

    let conn1 = RecordingConnection::new([]);
    let conn2 = RecordingConnection::new([resource.clone()]);
    let mut dataset = client(conn1.clone()).dataset(DS_ID);
    dataset.reload_with(&client(conn2.clone())).await.unwrap();
    assert!(conn1.requested().is_empty());
    assert_eq!(conn2.requested().len(), 1);
    assert_matches_resource(&dataset, &resource);
}

#[tokio::test]
async fn reload_missing_dataset_is_not_found() {
    let conn = RecordingConnection::new([]);
    let mut dataset = client(conn).dataset(DS_ID);
    let err = dataset.reload().await.unwrap_err();
    assert!(matches!(err, DatasetError::NotFound(_)));
}

#[tokio::test]
async fn patch_rejects_bogus_expiration_before_sending() {
    let conn = RecordingConnection::new([make_resource()]);
    let mut dataset = client(conn.clone()).dataset(DS_ID);
    dataset.set_description(Some("LOCAL"));

    let err = dataset
        .patch_json(&json!({"default_table_expiration_ms": "BOGUS", "location": "EU"}))
        .await
        .unwrap_err();

    assert!(matches!(err, DatasetError::InvalidArgument(_)));
    assert!(conn.requested().is_empty());
    assert_eq!(dataset.description(), Some("LOCAL"));
    assert_eq!(dataset.location(), None);
}

#[tokio::test]
async fn failed_patch_keeps_local_state() {
    let mut dataset =
        Client::new(PROJECT, Arc::new(FailingConnection(500))).dataset(DS_ID);
    dataset.set_description(Some("server value"));

    let err = dataset
        .patch(&DatasetPatch::new().description("never accepted").location("EU"))
        .await
        .unwrap_err();

    assert!(matches!(err, DatasetError::Api(api) if api.status == 500));
    assert_eq!(dataset.description(), Some("server value"));
    assert_eq!(dataset.location(), None);
}

#[tokio::test]
async fn patch_json_sends_overrides() {
    let mut resource = make_resource();
    resource["location"] = json!("EU");
    let conn = RecordingConnection::new([resource]);
    let mut dataset = client(conn.clone()).dataset(DS_ID);

    dataset
        .patch_json(&json!({"location": "EU", "description": null}))
        .await
        .unwrap();

    let requested = conn.requested();
    assert_eq!(requested.len(), 1);
    assert_eq!(requested[0].method, Method::Patch);
    assert_eq!(
        requested[0].body,
        Some(json!({"location": "EU", "description": null}))
    );
    assert_eq!(dataset.location(), Some("EU"));
}

#[tokio::test]
async fn patch_with_bound_client() {
    let mut resource = make_resource();
    resource["description"] = json!("DESCRIPTION");
    resource["friendlyName"] = json!("TITLE");
    let conn = RecordingConnection::new([resource.clone()]);
    let mut dataset = client(conn.clone()).dataset(DS_ID);

    dataset
        .patch(&DatasetPatch::new().description("DESCRIPTION").friendly_name("TITLE"))
        .await
        .unwrap();

    let requested = conn.requested();
    assert_eq!(requested.len(), 1);
    assert_eq!(requested[0].method, Method::Patch);
    assert_eq!(requested[0].path, "/projects/project/datasets/dataset-id");
    assert_eq!(
        requested[0].body,
        Some(json!({"description": "DESCRIPTION", "friendlyName": "TITLE"}))
    );
    assert_matches_resource(&dataset, &resource);
}

#[tokio::test]
async fn patch_sends_only_overrides() {
    let mut resource = make_resource();
    resource["defaultTableExpirationMs"] = json!("12345");
    resource["location"] = json!("EU");
    let conn1 = RecordingConnection::new([]);
    let conn2 = RecordingConnection::new([resource.clone()]);
    let mut dataset = client(conn1.clone()).dataset(DS_ID);
    dataset.set_description(Some("left alone"));

    dataset
        .patch_with(
            &client(conn2.clone()),
            &DatasetPatch::new()
                .default_table_expiration_ms(12345)
                .location("EU"),
        )
        .await
        .unwrap();

    assert!(conn1.requested().is_empty());
    let requested = conn2.requested();
    assert_eq!(requested[0].method, Method::Patch);
    assert_eq!(
        requested[0].body,
        Some(json!({"defaultTableExpirationMs": 12345, "location": "EU"}))
    );
    assert_eq!(dataset.default_table_expiration_ms(), Some(12345));
    assert_matches_resource(&dataset, &resource);
}

#[tokio::test]
async fn update_with_bound_client() {
    let mut resource = make_resource();
    resource["description"] = json!("DESCRIPTION");
    resource["friendlyName"] = json!("TITLE");
    let conn = RecordingConnection::new([resource.clone()]);
    let mut dataset = client(conn.clone()).dataset(DS_ID);
    dataset.set_description(Some("DESCRIPTION"));
    dataset.set_friendly_name(Some("TITLE"));

    dataset.update().await.unwrap();

    let requested = conn.requested();
    assert_eq!(requested.len(), 1);
    assert_eq!(requested[0].method, Method::Put);
    assert_eq!(requested[0].path, "/projects/project/datasets/dataset-id");
    assert_eq!(
        requested[0].body,
        Some(json!({
            "datasetReference": identity(),
            "description": "DESCRIPTION",
            "friendlyName": "TITLE",
        }))
    );
    assert_matches_resource(&dataset, &resource);
}

#[tokio::test]
async fn update_with_alternate_client() {
    let mut resource = make_resource();
    resource["defaultTableExpirationMs"] = json!(12345);
    resource["location"] = json!("EU");
    let conn1 = RecordingConnection::new([]);
    let conn2 = RecordingConnection::new([resource.clone()]);
    let mut dataset = client(conn1.clone()).dataset(DS_ID);
    dataset.set_default_table_expiration_ms(Some(12345));
    dataset.set_location(Some("EU"));

    dataset.update_with(&client(conn2.clone())).await.unwrap();

    assert!(conn1.requested().is_empty());
    let requested = conn2.requested();
    assert_eq!(requested[0].method, Method::Put);
    assert_eq!(
        requested[0].body,
        Some(json!({
            "datasetReference": identity(),
            "defaultTableExpirationMs": 12345,
            "location": "EU",
        }))
    );
    assert_matches_resource(&dataset, &resource);
}

#[tokio::test]
async fn delete_keeps_local_state() {
    let resource = make_resource();
    let conn = RecordingConnection::new([resource, json!({})]);
    let mut dataset = client(conn.clone()).dataset(DS_ID);
    dataset.reload().await.unwrap();

    dataset.delete().await.unwrap();

    let requested = conn.requested();
    assert_eq!(requested.len(), 2);
    assert_eq!(requested[1].method, Method::Delete);
    assert_eq!(requested[1].path, "/projects/project/datasets/dataset-id");
    assert_eq!(dataset.etag(), Some(ETAG));
}

#[tokio::test]
async fn delete_with_alternate_client() {
    let conn1 = RecordingConnection::new([]);
    let conn2 = RecordingConnection::new([json!({})]);
    let dataset = client(conn1.clone()).dataset(DS_ID);

    dataset.delete_with(&client(conn2.clone())).await.unwrap();

    assert!(conn1.requested().is_empty());
    assert_eq!(conn2.requested()[0].method, Method::Delete);
}

//! Device/setup resource endpoints: query building, pagination, and the
//! empty-body DELETE path.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wxcheckin_rs::{ApiClient, AppConfig, DeviceQuery, MemoryStore, SetupPatch};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(
        AppConfig::default().with_api_url(server.uri()),
        Arc::new(MemoryStore::new()),
    )
}

fn device_json(id: i64) -> serde_json::Value {
    json!({ "id": id, "uuid": format!("u-{id}"), "tag": "hall", "ip": "10.0.0.1" })
}

#[tokio::test]
async fn list_devices_builds_pagination_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/devices"))
        .and(query_param("expand", "admin"))
        .and(query_param("tag", "hall"))
        .and(query_param("page", "2"))
        .and(query_param("per-page", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([device_json(1)])))
        .expect(1)
        .mount(&server)
        .await;

    let query = DeviceQuery {
        tag: Some("hall".into()),
        page: Some(2),
        page_size: Some(10),
    };
    let devices = client_for(&server).list_devices(&query).await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, 1);
}

#[tokio::test]
async fn list_devices_omits_unset_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/devices"))
        .and(query_param("expand", "admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let devices = client_for(&server)
        .list_devices(&DeviceQuery::default())
        .await
        .unwrap();
    assert!(devices.is_empty());
}

#[tokio::test]
async fn get_device_with_setup_expands_the_relation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/devices/5"))
        .and(query_param("expand", "setup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5, "uuid": "u-5", "tag": "hall", "ip": "10.0.0.5",
            "setup": {
                "id": 9, "device_id": 5, "money": 300, "scene_id": null,
                "shots": [1, 5, 10, 20],
                "slogans": ["hello"],
                "thumbs": [], "pictures": [],
                "title": "lobby screen"
            }
        })))
        .mount(&server)
        .await;

    let device = client_for(&server).get_device_with_setup(5).await.unwrap();
    let setup = device.setup.unwrap();
    assert_eq!(setup.money, 300);
    assert_eq!(setup.shots, vec![1, 5, 10, 20]);
    assert!(setup.scene_id.is_none());
}

#[tokio::test]
async fn update_setup_puts_only_changed_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/setups/9"))
        .and(body_json(json!({ "money": 500, "title": "updated" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 9, "device_id": 5, "money": 500, "scene_id": null,
            "shots": [], "slogans": [], "thumbs": [], "pictures": [],
            "title": "updated"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let patch = SetupPatch {
        money: Some(500),
        title: Some("updated".into()),
        ..Default::default()
    };
    let setup = client_for(&server).update_setup(9, &patch).await.unwrap();
    assert_eq!(setup.money, 500);
}

#[tokio::test]
async fn delete_device_accepts_an_empty_no_content_response() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/devices/3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).delete_device(3).await.unwrap();
}

#[tokio::test]
async fn admin_assignment_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/devices/7/assign"))
        .and(body_json(json!({ "device_id": 7, "phone": "13800000000" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "assigned": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/devices/7/assign"))
        .and(body_json(json!({ "device_id": 7, "phone": "13800000000" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.assign_admin(7, "13800000000").await.unwrap();
    client.unassign_admin(7, "13800000000").await.unwrap();
}

#[tokio::test]
async fn managed_devices_expand_setups() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/devices/manage"))
        .and(query_param("expand", "setup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([device_json(2)])))
        .mount(&server)
        .await;

    let devices = client_for(&server).managed_devices().await.unwrap();
    assert_eq!(devices[0].id, 2);
}

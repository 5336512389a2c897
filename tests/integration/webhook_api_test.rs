// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_test_app, start_capture_server};
use axum::http::StatusCode;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_health_and_version() {
    let app = create_test_app().await;

    let response = app.server.get("/_health").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "OK");

    let response = app.server.get("/v1/version").await;
    assert_eq!(response.text(), env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_create_webhook_registers_listener() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/webhooks")
        .json(&json!({
            "name": "search index",
            "url": "http://example.test/hook",
            "headers": { "Authorization": "Bearer token" },
            "events": ["entry.create", "entry.publish"]
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["isEnabled"], json!(true));

    assert!(app.runner.has_listener("entry.create"));
    assert!(app.runner.has_listener("entry.publish"));

    let response = app.server.get(&format!("/webhooks/{id}")).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["name"], json!("search index"));

    let listed: Value = app.server.get("/webhooks").await.json();
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_rejects_unknown_events() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/webhooks")
        .json(&json!({
            "name": "bad",
            "url": "http://example.test/hook",
            "events": ["user.login"]
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["error"]
        .as_str()
        .unwrap()
        .contains("user.login"));
    assert!(app.runner.subscribed_events().is_empty());
}

#[tokio::test]
async fn test_missing_webhook_is_not_found() {
    let app = create_test_app().await;

    let response = app.server.get("/webhooks/does-not-exist").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = app.server.delete("/webhooks/does-not-exist").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_and_delete_keep_runner_in_sync() {
    let app = create_test_app().await;

    let created: Value = app
        .server
        .post("/webhooks")
        .json(&json!({
            "name": "sync",
            "url": "http://example.test/hook",
            "events": ["entry.create"]
        }))
        .await
        .json();
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .server
        .put(&format!("/webhooks/{id}"))
        .json(&json!({ "events": ["entry.delete"], "isEnabled": false }))
        .await;
    response.assert_status_ok();
    let updated: Value = response.json();
    assert_eq!(updated["data"]["name"], json!("sync"));
    assert_eq!(updated["data"]["isEnabled"], json!(false));

    assert_eq!(app.runner.subscribed_events(), vec!["entry.delete"]);
    assert!(!app.runner.webhooks_for("entry.delete")[0].is_enabled);

    app.server
        .delete(&format!("/webhooks/{id}"))
        .await
        .assert_status_ok();
    assert!(app.runner.subscribed_events().is_empty());
    assert!(app.store.find_webhooks().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_batch_delete_skips_unknown_ids() {
    let app = create_test_app().await;

    let mut ids = Vec::new();
    for event in ["entry.create", "entry.update"] {
        let created: Value = app
            .server
            .post("/webhooks")
            .json(&json!({
                "name": event,
                "url": "http://example.test/hook",
                "events": [event]
            }))
            .await
            .json();
        ids.push(created["data"]["id"].as_str().unwrap().to_string());
    }
    ids.push("unknown".to_string());

    let response = app
        .server
        .post("/webhooks/batch-delete")
        .json(&json!({ "ids": ids }))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"].as_array().unwrap().len(), 2);
    assert!(app.runner.subscribed_events().is_empty());
}

#[tokio::test]
async fn test_trigger_delivers_test_event() {
    let app = create_test_app().await;
    let (url, captured) = start_capture_server().await;

    let created = app
        .store
        .create_webhook(super::helpers::webhook_input(&url, &["entry.create"]))
        .await
        .unwrap();

    let response = app
        .server
        .post(&format!("/webhooks/{}/trigger", created.id))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["statusCode"], json!(200));

    let captured = captured.lock();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].0["x-strapi-event"], "trigger-test");
    assert_eq!(captured[0].1["event"], json!("trigger-test"));
}

#[tokio::test]
async fn test_trigger_reports_failed_delivery() {
    let app = create_test_app().await;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("x-strapi-event", "trigger-test"))
        .respond_with(ResponseTemplate::new(410).set_body_string("gone"))
        .expect(1)
        .mount(&server)
        .await;

    let created = app
        .store
        .create_webhook(super::helpers::webhook_input(
            &format!("{}/hook", server.uri()),
            &["entry.create"],
        ))
        .await
        .unwrap();

    let body: Value = app
        .server
        .post(&format!("/webhooks/{}/trigger", created.id))
        .await
        .json();

    assert_eq!(body["data"]["statusCode"], json!(410));
    assert_eq!(body["data"]["message"], json!("gone"));
}

#[tokio::test]
async fn test_allowed_events_endpoint_lists_plugin_events() {
    let app = create_test_app().await;
    app.store.add_allowed_event("MEDIA_CREATE", "media.create");

    let body: Value = app.server.get("/webhooks/events").await.json();
    let events: Vec<String> = serde_json::from_value(body["data"].clone()).unwrap();

    assert_eq!(events.first().map(String::as_str), Some("entry.create"));
    assert_eq!(events.last().map(String::as_str), Some("media.create"));
}

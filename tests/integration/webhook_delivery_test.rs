// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_test_app, start_capture_server, wait_until, webhook_input};
use serde_json::{json, Map, Value};
use strapi_core::application::use_cases::manage_webhooks::ManageWebhooksUseCase;
use strapi_core::domain::models::webhook::WebhookPatch;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn payload(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn test_emitted_event_reaches_subscribed_webhook() {
    let app = create_test_app().await;
    let (url, captured) = start_capture_server().await;
    let use_case = ManageWebhooksUseCase::new(app.store.clone(), app.runner.clone());

    use_case
        .create(webhook_input(&url, &["entry.create"]))
        .await
        .unwrap();

    app.strapi
        .event_hub()
        .emit(
            "entry.create",
            payload(json!({ "model": "article", "entry": { "id": 1, "title": "Hello" } })),
        )
        .await
        .unwrap();
    app.runner.wait_idle().await;

    let captured = captured.lock();
    assert_eq!(captured.len(), 1);
    let (headers, body) = &captured[0];
    assert_eq!(headers["x-strapi-event"], "entry.create");
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(body["event"], json!("entry.create"));
    assert_eq!(body["model"], json!("article"));
    assert_eq!(body["entry"]["title"], json!("Hello"));
    assert!(body["createdAt"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_unsubscribed_events_are_not_delivered() {
    let app = create_test_app().await;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let use_case = ManageWebhooksUseCase::new(app.store.clone(), app.runner.clone());

    use_case
        .create(webhook_input(&server.uri(), &["entry.delete"]))
        .await
        .unwrap();

    app.strapi
        .event_hub()
        .emit("entry.create", Map::new())
        .await
        .unwrap();
    app.runner.wait_idle().await;
}

#[tokio::test]
async fn test_broken_endpoint_does_not_fail_the_emitter() {
    let app = create_test_app().await;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/healthy"))
        .and(header("x-strapi-event", "entry.update"))
        .respond_with(ResponseTemplate::new(204))
        .expect(3)
        .mount(&server)
        .await;
    let use_case = ManageWebhooksUseCase::new(app.store.clone(), app.runner.clone());

    use_case
        .create(webhook_input("http://127.0.0.1:1/unreachable", &["entry.update"]))
        .await
        .unwrap();
    use_case
        .create(webhook_input(
            &format!("{}/healthy", server.uri()),
            &["entry.update"],
        ))
        .await
        .unwrap();

    for id in 0..3 {
        let result = app
            .strapi
            .event_hub()
            .emit("entry.update", payload(json!({ "id": id })))
            .await;
        assert!(result.is_ok());
    }
    app.runner.wait_idle().await;
}

#[tokio::test]
async fn test_disabling_a_webhook_stops_delivery_without_restart() {
    let app = create_test_app().await;
    let (url, captured) = start_capture_server().await;
    let use_case = ManageWebhooksUseCase::new(app.store.clone(), app.runner.clone());

    let webhook = use_case
        .create(webhook_input(&url, &["entry.publish"]))
        .await
        .unwrap();

    let hub = app.strapi.event_hub();
    hub.emit("entry.publish", Map::new()).await.unwrap();
    wait_until(|| captured.lock().len() == 1).await;

    use_case
        .update(
            &webhook.id,
            WebhookPatch {
                is_enabled: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    hub.emit("entry.publish", Map::new()).await.unwrap();
    app.runner.wait_idle().await;

    assert_eq!(captured.lock().len(), 1);
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use std::sync::Arc;
use strapi_core::config::settings::WebhookSettings;
use strapi_core::domain::services::allowed_events::AllowedEvents;
use strapi_core::domain::services::event_hub::EventHub;
use strapi_core::domain::services::webhook_store::WebhookStore;
use strapi_core::infrastructure::repositories::memory_webhook_repo::InMemoryWebhookRepository;
use strapi_core::presentation::routes;
use strapi_core::workers::webhook_runner::WebhookRunner;
use tower::util::ServiceExt;

fn app() -> Router {
    let store = WebhookStore::new(
        Arc::new(InMemoryWebhookRepository::new()),
        AllowedEvents::new(),
    );
    let runner = WebhookRunner::new(EventHub::new(), &WebhookSettings::default()).unwrap();
    routes::routes(store, runner)
}

/// 健康检查测试
///
/// 验证健康检查端点是否正常工作
#[tokio::test]
async fn health_check_works() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/_health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn version_reports_package_version() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/v1/version")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], env!("CARGO_PKG_VERSION").as_bytes());
}

/// 未知 Webhook 返回 404
#[tokio::test]
async fn unknown_webhook_returns_404() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/webhooks/missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

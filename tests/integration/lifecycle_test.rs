// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{start_capture_server, test_settings, wait_until, webhook_input};
use async_trait::async_trait;
use serde_json::Map;
use std::sync::Arc;
use std::time::Duration;
use strapi_core::application::module::Module;
use strapi_core::application::strapi::{LifecycleState, Strapi};
use strapi_core::domain::repositories::webhook_repository::WebhookRepository;
use strapi_core::infrastructure::repositories::memory_webhook_repo::InMemoryWebhookRepository;

/// 注册自定义事件并在启动后发布一次的插件
struct MediaPlugin;

#[async_trait]
impl Module for MediaPlugin {
    fn name(&self) -> &str {
        "media"
    }

    async fn register(&self, strapi: &Strapi) -> anyhow::Result<()> {
        strapi.allowed_events().add("MEDIA_CREATE", "media.create");
        Ok(())
    }

    async fn bootstrap(&self, strapi: &Strapi) -> anyhow::Result<()> {
        strapi.event_hub().emit("media.create", Map::new()).await
    }
}

#[tokio::test]
async fn test_started_application_serves_http_until_stopped() {
    let strapi = Strapi::new(test_settings());
    let addr = strapi.start().await.unwrap();

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/_health", addr))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");

    strapi.request_shutdown();
    tokio::time::timeout(Duration::from_secs(1), strapi.wait_for_shutdown())
        .await
        .unwrap();
    assert_eq!(strapi.stop(0).await, 0);
    assert_eq!(strapi.state(), LifecycleState::Destroyed);

    let refused = client
        .get(format!("http://{}/_health", addr))
        .timeout(Duration::from_secs(2))
        .send()
        .await;
    assert!(refused.is_err());
}

#[tokio::test]
async fn test_stored_webhooks_receive_plugin_events_emitted_during_bootstrap() {
    let (url, captured) = start_capture_server().await;
    let repository = Arc::new(InMemoryWebhookRepository::new());

    let strapi = Strapi::builder(test_settings())
        .webhook_repository(repository.clone())
        .module(MediaPlugin)
        .build();
    strapi.register().await.unwrap();

    assert!(strapi.webhook_store().is_none());
    assert!(strapi.allowed_events().contains("media.create"));
    repository
        .create(webhook_input(&url, &["media.create"]))
        .await
        .unwrap();

    strapi.bootstrap().await.unwrap();
    wait_until(|| captured.lock().len() == 1).await;

    let (headers, _) = captured.lock()[0].clone();
    assert_eq!(headers["x-strapi-event"], "media.create");

    strapi.destroy().await.unwrap();
}

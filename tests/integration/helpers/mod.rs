// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use axum_test::TestServer;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use strapi_core::application::strapi::Strapi;
use strapi_core::config::settings::Settings;
use strapi_core::domain::models::webhook::WebhookInput;
use strapi_core::domain::services::webhook_store::WebhookStore;
use strapi_core::infrastructure::repositories::memory_webhook_repo::InMemoryWebhookRepository;
use strapi_core::presentation::routes;
use strapi_core::workers::webhook_runner::WebhookRunner;
use tokio::net::TcpListener;

#[allow(dead_code)]
pub struct TestApp {
    pub server: TestServer,
    pub strapi: Strapi,
    pub store: WebhookStore,
    pub runner: WebhookRunner,
}

/// 监听随机端口、使用内存数据库的配置
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.server.host = "127.0.0.1".to_string();
    settings.server.port = 0;
    settings
}

pub fn webhook_input(url: &str, events: &[&str]) -> WebhookInput {
    WebhookInput {
        name: "integration".to_string(),
        url: url.to_string(),
        headers: HashMap::new(),
        events: events.iter().map(|e| e.to_string()).collect(),
        is_enabled: true,
    }
}

/// 加载完成（未监听）的应用，管理接口挂在 `TestServer` 上
pub async fn create_test_app() -> TestApp {
    let strapi = Strapi::builder(test_settings())
        .webhook_repository(Arc::new(InMemoryWebhookRepository::new()))
        .build();
    strapi.load().await.expect("Failed to load application");

    let store = strapi.webhook_store().cloned().expect("store is available");
    let runner = strapi.webhook_runner().cloned().expect("runner is available");
    let server = TestServer::new(routes::routes(store.clone(), runner.clone())).unwrap();

    TestApp {
        server,
        strapi,
        store,
        runner,
    }
}

pub type Captured = Arc<Mutex<Vec<(HeaderMap, Value)>>>;

/// 记录收到的请求头和 JSON 请求体的 Webhook 接收端
pub async fn start_capture_server() -> (String, Captured) {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route(
            "/webhook",
            post(
                |State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    captured.lock().push((headers, body));
                    "OK"
                },
            ),
        )
        .with_state(captured.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/webhook", addr), captured)
}

pub async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

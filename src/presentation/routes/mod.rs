// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::services::webhook_store::WebhookStore;
use crate::presentation::handlers::webhook_handler;
use crate::workers::webhook_runner::WebhookRunner;
use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::trace::TraceLayer;

/// 创建应用路由
///
/// # 参数
///
/// * `store` - Webhook 存储
/// * `runner` - 与存储保持同步的 Webhook 运行器
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes(store: WebhookStore, runner: WebhookRunner) -> Router {
    let public_routes = Router::new()
        .route("/_health", get(health_check))
        .route("/v1/version", get(version));

    let webhook_routes = Router::new()
        .route(
            "/webhooks",
            get(webhook_handler::list_webhooks).post(webhook_handler::create_webhook),
        )
        .route("/webhooks/events", get(webhook_handler::list_allowed_events))
        .route(
            "/webhooks/batch-delete",
            post(webhook_handler::delete_webhooks),
        )
        .route(
            "/webhooks/{id}",
            get(webhook_handler::get_webhook)
                .put(webhook_handler::update_webhook)
                .delete(webhook_handler::delete_webhook),
        )
        .route(
            "/webhooks/{id}/trigger",
            post(webhook_handler::trigger_webhook),
        )
        .layer(Extension(store))
        .layer(Extension(runner));

    Router::new()
        .merge(public_routes)
        .merge(webhook_routes)
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

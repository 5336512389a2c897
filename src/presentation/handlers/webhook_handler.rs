// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::use_cases::manage_webhooks::ManageWebhooksUseCase;
use crate::domain::models::webhook::{DeliveryResult, Webhook, WebhookInput, WebhookPatch};
use crate::domain::services::webhook_store::WebhookStore;
use crate::presentation::errors::AppError;
use crate::workers::webhook_runner::WebhookRunner;
use axum::{extract::Path, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct BatchDeletePayload {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

fn use_case(store: WebhookStore, runner: WebhookRunner) -> ManageWebhooksUseCase {
    ManageWebhooksUseCase::new(store, runner)
}

pub async fn list_webhooks(
    Extension(store): Extension<WebhookStore>,
    Extension(runner): Extension<WebhookRunner>,
) -> Result<Json<DataResponse<Vec<Webhook>>>, AppError> {
    let webhooks = use_case(store, runner).list().await?;
    Ok(Json(DataResponse { data: webhooks }))
}

pub async fn get_webhook(
    Extension(store): Extension<WebhookStore>,
    Extension(runner): Extension<WebhookRunner>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Webhook>>, AppError> {
    let webhook = use_case(store, runner).get(&id).await?;
    Ok(Json(DataResponse { data: webhook }))
}

pub async fn create_webhook(
    Extension(store): Extension<WebhookStore>,
    Extension(runner): Extension<WebhookRunner>,
    Json(payload): Json<WebhookInput>,
) -> Result<(StatusCode, Json<DataResponse<Webhook>>), AppError> {
    let webhook = use_case(store, runner).create(payload).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: webhook })))
}

pub async fn update_webhook(
    Extension(store): Extension<WebhookStore>,
    Extension(runner): Extension<WebhookRunner>,
    Path(id): Path<String>,
    Json(payload): Json<WebhookPatch>,
) -> Result<Json<DataResponse<Webhook>>, AppError> {
    let webhook = use_case(store, runner).update(&id, payload).await?;
    Ok(Json(DataResponse { data: webhook }))
}

pub async fn delete_webhook(
    Extension(store): Extension<WebhookStore>,
    Extension(runner): Extension<WebhookRunner>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<Webhook>>, AppError> {
    let webhook = use_case(store, runner).delete(&id).await?;
    Ok(Json(DataResponse { data: webhook }))
}

pub async fn delete_webhooks(
    Extension(store): Extension<WebhookStore>,
    Extension(runner): Extension<WebhookRunner>,
    Json(payload): Json<BatchDeletePayload>,
) -> Result<Json<DataResponse<Vec<Webhook>>>, AppError> {
    let deleted = use_case(store, runner).delete_many(&payload.ids).await?;
    Ok(Json(DataResponse { data: deleted }))
}

/// 立即向 Webhook 发送一次 `trigger-test` 事件
pub async fn trigger_webhook(
    Extension(store): Extension<WebhookStore>,
    Extension(runner): Extension<WebhookRunner>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<DeliveryResult>>, AppError> {
    let result = use_case(store, runner).trigger(&id).await?;
    Ok(Json(DataResponse { data: result }))
}

/// 列出当前可订阅的事件
pub async fn list_allowed_events(
    Extension(store): Extension<WebhookStore>,
    Extension(runner): Extension<WebhookRunner>,
) -> Json<DataResponse<Vec<String>>> {
    Json(DataResponse {
        data: use_case(store, runner).allowed_events(),
    })
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::event::EventPayload;
use crate::domain::models::webhook::{DeliveryResult, Webhook, WebhookInput, WebhookPatch};
use crate::domain::services::webhook_store::{StoreError, WebhookStore};
use crate::utils::errors::RepositoryError;
use crate::workers::webhook_runner::{DeliveryError, WebhookRunner};
use thiserror::Error;
use tracing::info;

/// 手动触发时使用的事件名称
pub const TRIGGER_TEST_EVENT: &str = "trigger-test";

#[derive(Error, Debug)]
pub enum WebhookUseCaseError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Webhook not found")]
    NotFound,
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

impl From<StoreError> for WebhookUseCaseError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(message) => Self::Validation(message),
            StoreError::Repository(e) => Self::Repository(e),
        }
    }
}

/// Webhook 管理用例
///
/// 每次写入存储成功后立即同步运行器的内存索引，无需重启即可生效。
/// 写入和同步在存储的写入锁内完成，并发的管理请求不会让两者失去一致。
pub struct ManageWebhooksUseCase {
    store: WebhookStore,
    runner: WebhookRunner,
}

impl ManageWebhooksUseCase {
    pub fn new(store: WebhookStore, runner: WebhookRunner) -> Self {
        Self { store, runner }
    }

    pub async fn list(&self) -> Result<Vec<Webhook>, WebhookUseCaseError> {
        Ok(self.store.find_webhooks().await?)
    }

    pub async fn get(&self, id: &str) -> Result<Webhook, WebhookUseCaseError> {
        self.store
            .find_webhook(id)
            .await?
            .ok_or(WebhookUseCaseError::NotFound)
    }

    pub async fn create(&self, input: WebhookInput) -> Result<Webhook, WebhookUseCaseError> {
        let _writes = self.store.lock_writes().await;
        let webhook = self.store.create_webhook(input).await?;
        self.runner.add(webhook.clone());
        info!(webhook_id = %webhook.id, "Webhook created");
        Ok(webhook)
    }

    /// 局部更新，未提供的字段保持原值
    pub async fn update(
        &self,
        id: &str,
        patch: WebhookPatch,
    ) -> Result<Webhook, WebhookUseCaseError> {
        let _writes = self.store.lock_writes().await;
        let existing = self.get(id).await?;
        let webhook = self
            .store
            .update_webhook(id, patch.apply_to(existing))
            .await?
            .ok_or(WebhookUseCaseError::NotFound)?;
        self.runner.update(webhook.clone());
        Ok(webhook)
    }

    pub async fn delete(&self, id: &str) -> Result<Webhook, WebhookUseCaseError> {
        let _writes = self.store.lock_writes().await;
        let webhook = self
            .store
            .delete_webhook(id)
            .await?
            .ok_or(WebhookUseCaseError::NotFound)?;
        self.runner.remove(&webhook);
        Ok(webhook)
    }

    /// 批量删除，跳过不存在的标识
    pub async fn delete_many(&self, ids: &[String]) -> Result<Vec<Webhook>, WebhookUseCaseError> {
        let _writes = self.store.lock_writes().await;
        let mut deleted = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(webhook) = self.store.delete_webhook(id).await? {
                self.runner.remove(&webhook);
                deleted.push(webhook);
            }
        }
        Ok(deleted)
    }

    /// 立即向指定 Webhook 投递一次测试事件并返回结果
    pub async fn trigger(&self, id: &str) -> Result<DeliveryResult, WebhookUseCaseError> {
        let webhook = self.get(id).await?;
        let result = self
            .runner
            .run(&webhook, TRIGGER_TEST_EVENT, &EventPayload::new())
            .await?;
        Ok(result)
    }

    pub fn allowed_events(&self) -> Vec<String> {
        self.store.list_allowed_events()
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::webhook::{Webhook, WebhookInput};
use crate::domain::repositories::webhook_repository::WebhookRepository;
use crate::domain::services::allowed_events::AllowedEvents;
use crate::utils::errors::RepositoryError;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;
use validator::Validate;

/// Webhook 存储错误
#[derive(Error, Debug)]
pub enum StoreError {
    /// 输入数据校验失败，应返回给调用方
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Webhook 存储服务
///
/// 持久化边界之上的领域服务：在写入前校验订阅的事件必须属于当前
/// 可订阅事件集合，并对外暴露可订阅事件注册表的操作。
///
/// 克隆共享同一把写入锁，需要把存储写入和运行器同步作为一个整体的
/// 调用方应先通过 [`WebhookStore::lock_writes`] 获取它。
#[derive(Clone)]
pub struct WebhookStore {
    repository: Arc<dyn WebhookRepository>,
    allowed_events: AllowedEvents,
    // Held across the repository write and the follow-up runner sync
    writes: Arc<Mutex<()>>,
}

impl WebhookStore {
    /// 创建新的 Webhook 存储服务
    ///
    /// # 参数
    ///
    /// * `repository` - 持久化实现
    /// * `allowed_events` - 共享的可订阅事件注册表
    pub fn new(repository: Arc<dyn WebhookRepository>, allowed_events: AllowedEvents) -> Self {
        Self {
            repository,
            allowed_events,
            writes: Arc::new(Mutex::new(())),
        }
    }

    /// 获取写入锁，持有期间其他管理写入会等待
    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().await
    }

    pub fn allowed_events(&self) -> &AllowedEvents {
        &self.allowed_events
    }

    pub fn add_allowed_event(&self, key: &str, value: &str) {
        self.allowed_events.add(key, value);
    }

    pub fn remove_allowed_event(&self, key: &str) -> Option<String> {
        self.allowed_events.remove(key)
    }

    pub fn list_allowed_events(&self) -> Vec<String> {
        self.allowed_events.list()
    }

    pub fn get_allowed_event(&self, key: &str) -> Option<String> {
        self.allowed_events.get(key)
    }

    pub async fn find_webhooks(&self) -> Result<Vec<Webhook>, StoreError> {
        Ok(self.repository.find_all().await?)
    }

    pub async fn find_webhook(&self, id: &str) -> Result<Option<Webhook>, StoreError> {
        Ok(self.repository.find_by_id(id).await?)
    }

    /// 创建 Webhook
    ///
    /// # 返回值
    ///
    /// * `Ok(Webhook)` - 创建成功的记录
    /// * `Err(StoreError::Validation)` - 输入非法或包含不可订阅的事件
    pub async fn create_webhook(&self, input: WebhookInput) -> Result<Webhook, StoreError> {
        self.validate(&input)?;
        let webhook = self.repository.create(input).await?;
        debug!(webhook_id = %webhook.id, "Webhook created");
        Ok(webhook)
    }

    /// 更新 Webhook，不存在时返回 `Ok(None)`
    pub async fn update_webhook(
        &self,
        id: &str,
        input: WebhookInput,
    ) -> Result<Option<Webhook>, StoreError> {
        self.validate(&input)?;
        let webhook = self.repository.update(id, input).await?;
        if webhook.is_some() {
            debug!(webhook_id = %id, "Webhook updated");
        }
        Ok(webhook)
    }

    /// 删除 Webhook，返回被删除的记录
    pub async fn delete_webhook(&self, id: &str) -> Result<Option<Webhook>, StoreError> {
        let webhook = self.repository.delete(id).await?;
        if webhook.is_some() {
            debug!(webhook_id = %id, "Webhook deleted");
        }
        Ok(webhook)
    }

    fn validate(&self, input: &WebhookInput) -> Result<(), StoreError> {
        input
            .validate()
            .map_err(|e| StoreError::Validation(e.to_string()))?;

        let disallowed = self.allowed_events.disallowed(&input.events);
        if !disallowed.is_empty() {
            return Err(StoreError::Validation(format!(
                "events must be one of the allowed events, got: {}",
                disallowed.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "webhook_store_test.rs"]
mod tests;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::webhook::{Webhook, WebhookInput};
use crate::domain::repositories::webhook_repository::WebhookRepository;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

/// 内存Webhook仓库
///
/// 用于嵌入式场景和测试，按插入顺序保存记录
#[derive(Clone, Default)]
pub struct InMemoryWebhookRepository {
    webhooks: Arc<RwLock<Vec<Webhook>>>,
}

impl InMemoryWebhookRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用已有记录初始化仓库，记录的ID原样保留
    pub fn with_webhooks(webhooks: Vec<Webhook>) -> Self {
        Self {
            webhooks: Arc::new(RwLock::new(webhooks)),
        }
    }
}

#[async_trait]
impl WebhookRepository for InMemoryWebhookRepository {
    async fn find_all(&self) -> Result<Vec<Webhook>, RepositoryError> {
        Ok(self.webhooks.read().clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Webhook>, RepositoryError> {
        Ok(self.webhooks.read().iter().find(|w| w.id == id).cloned())
    }

    async fn create(&self, input: WebhookInput) -> Result<Webhook, RepositoryError> {
        let webhook = Webhook::from_input(Uuid::new_v4().to_string(), input);
        self.webhooks.write().push(webhook.clone());
        Ok(webhook)
    }

    async fn update(
        &self,
        id: &str,
        input: WebhookInput,
    ) -> Result<Option<Webhook>, RepositoryError> {
        let mut webhooks = self.webhooks.write();
        let Some(existing) = webhooks.iter_mut().find(|w| w.id == id) else {
            return Ok(None);
        };
        *existing = Webhook::from_input(id, input);
        Ok(Some(existing.clone()))
    }

    async fn delete(&self, id: &str) -> Result<Option<Webhook>, RepositoryError> {
        let mut webhooks = self.webhooks.write();
        Ok(webhooks
            .iter()
            .position(|w| w.id == id)
            .map(|index| webhooks.remove(index)))
    }
}

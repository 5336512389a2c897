// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::webhook::{Webhook, WebhookInput};
use crate::domain::repositories::webhook_repository::WebhookRepository;
use crate::infrastructure::database::entities::webhook;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::*;
use std::sync::Arc;
use uuid::Uuid;

/// Webhook仓库实现
///
/// 基于 sea-orm 的 `strapi_webhooks` 表
#[derive(Clone)]
pub struct WebhookRepoImpl {
    db: Arc<DatabaseConnection>,
}

impl WebhookRepoImpl {
    /// 创建新的Webhook仓库实现
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WebhookRepository for WebhookRepoImpl {
    async fn find_all(&self) -> Result<Vec<Webhook>, RepositoryError> {
        let models = webhook::Entity::find()
            .order_by_asc(webhook::Column::CreatedAt)
            .order_by_asc(webhook::Column::Id)
            .all(self.db.as_ref())
            .await?;

        models.into_iter().map(Webhook::try_from).collect()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Webhook>, RepositoryError> {
        let model = webhook::Entity::find_by_id(id.to_string())
            .one(self.db.as_ref())
            .await?;

        model.map(Webhook::try_from).transpose()
    }

    async fn create(&self, input: WebhookInput) -> Result<Webhook, RepositoryError> {
        let webhook = Webhook::from_input(Uuid::new_v4().to_string(), input);
        let model = webhook::ActiveModel {
            id: Set(webhook.id.clone()),
            name: Set(webhook.name.clone()),
            url: Set(webhook.url.clone()),
            headers: Set(serde_json::to_value(&webhook.headers)?),
            events: Set(serde_json::to_value(&webhook.events)?),
            enabled: Set(webhook.is_enabled),
            created_at: Set(Utc::now().into()),
        };

        model.insert(self.db.as_ref()).await?;
        Ok(webhook)
    }

    async fn update(
        &self,
        id: &str,
        input: WebhookInput,
    ) -> Result<Option<Webhook>, RepositoryError> {
        let Some(existing) = webhook::Entity::find_by_id(id.to_string())
            .one(self.db.as_ref())
            .await?
        else {
            return Ok(None);
        };

        let webhook = Webhook::from_input(id, input);
        let mut model: webhook::ActiveModel = existing.into();
        model.name = Set(webhook.name.clone());
        model.url = Set(webhook.url.clone());
        model.headers = Set(serde_json::to_value(&webhook.headers)?);
        model.events = Set(serde_json::to_value(&webhook.events)?);
        model.enabled = Set(webhook.is_enabled);

        model.update(self.db.as_ref()).await?;
        Ok(Some(webhook))
    }

    async fn delete(&self, id: &str) -> Result<Option<Webhook>, RepositoryError> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        webhook::Entity::delete_by_id(id.to_string())
            .exec(self.db.as_ref())
            .await?;
        Ok(Some(existing))
    }
}

impl TryFrom<webhook::Model> for Webhook {
    type Error = RepositoryError;

    fn try_from(model: webhook::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            name: model.name,
            url: model.url,
            headers: serde_json::from_value(model.headers)?,
            events: serde_json::from_value(model.events)?,
            is_enabled: model.enabled,
        })
    }
}

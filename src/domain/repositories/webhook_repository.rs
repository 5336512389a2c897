// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::webhook::{Webhook, WebhookInput};
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;

/// Webhook仓库特质
///
/// 定义Webhook数据访问接口，负责领域对象与存储行之间的转换。
/// `find_all` 按创建顺序返回。
#[async_trait]
pub trait WebhookRepository: Send + Sync {
    /// 查询所有Webhook
    async fn find_all(&self) -> Result<Vec<Webhook>, RepositoryError>;
    /// 根据ID查找Webhook
    async fn find_by_id(&self, id: &str) -> Result<Option<Webhook>, RepositoryError>;
    /// 创建Webhook，由仓库分配ID
    async fn create(&self, input: WebhookInput) -> Result<Webhook, RepositoryError>;
    /// 更新Webhook，不存在时返回 `None`
    async fn update(&self, id: &str, input: WebhookInput)
        -> Result<Option<Webhook>, RepositoryError>;
    /// 删除Webhook，返回被删除的记录
    async fn delete(&self, id: &str) -> Result<Option<Webhook>, RepositoryError>;
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::strapi::Strapi;
use async_trait::async_trait;

/// 应用模块（插件、管理端或用户代码）的生命周期函数
///
/// 每个阶段按模块的加载顺序串行调用。所有方法默认什么也不做。
#[async_trait]
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    /// 在核心服务注册完成后调用，可以注册可订阅事件、钩子等
    async fn register(&self, _strapi: &Strapi) -> anyhow::Result<()> {
        Ok(())
    }

    /// 在 Webhook 加载和模式同步完成后调用
    async fn bootstrap(&self, _strapi: &Strapi) -> anyhow::Result<()> {
        Ok(())
    }

    async fn destroy(&self, _strapi: &Strapi) -> anyhow::Result<()> {
        Ok(())
    }
}

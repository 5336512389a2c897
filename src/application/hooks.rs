// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// 内容类型同步之前调用
pub const BEFORE_SYNC: &str = "strapi::content-types.beforeSync";
/// 内容类型同步之后调用
pub const AFTER_SYNC: &str = "strapi::content-types.afterSync";

pub type HookHandler = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

static NEXT_HOOK_ID: AtomicU64 = AtomicU64::new(1);

/// 串行异步钩子
///
/// 处理函数按注册顺序依次执行，第一个错误会中止调用并返回
#[derive(Clone, Default)]
pub struct AsyncSeriesHook {
    handlers: Arc<RwLock<Vec<(HookId, HookHandler)>>>,
}

impl AsyncSeriesHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(&self, handler: F) -> HookId
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let id = HookId(NEXT_HOOK_ID.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .push((id, Arc::new(move || handler().boxed())));
        id
    }

    pub fn delete(&self, id: HookId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn call(&self) -> anyhow::Result<()> {
        let handlers: Vec<HookHandler> = self
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in handlers {
            handler().await?;
        }
        Ok(())
    }
}

/// 内部钩子注册表
///
/// 插件在 register 阶段通过名称取得钩子并注册处理函数
#[derive(Clone, Default)]
pub struct InternalHooks {
    hooks: Arc<RwLock<HashMap<String, AsyncSeriesHook>>>,
}

impl InternalHooks {
    /// 创建注册表，内容类型同步的前后钩子已存在
    pub fn new() -> Self {
        let hooks = Self::default();
        hooks.set(BEFORE_SYNC, AsyncSeriesHook::new());
        hooks.set(AFTER_SYNC, AsyncSeriesHook::new());
        hooks
    }

    pub fn set(&self, name: &str, hook: AsyncSeriesHook) {
        self.hooks.write().insert(name.to_string(), hook);
    }

    pub fn get(&self, name: &str) -> Option<AsyncSeriesHook> {
        self.hooks.read().get(name).cloned()
    }

    /// 调用指定名称的钩子，不存在时什么也不做
    pub async fn call(&self, name: &str) -> anyhow::Result<()> {
        match self.get(name) {
            Some(hook) => {
                debug!(hook = name, handlers = hook.len(), "Calling hook");
                hook.call().await
            }
            None => Ok(()),
        }
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde_json::Value;
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// 容器中保存的实例
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 服务工厂，首次 `get` 时以 `(container, args)` 调用
pub type Factory =
    Arc<dyn Fn(&Container, Option<&Value>) -> Result<Instance, ContainerError> + Send + Sync>;

/// 容器错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("Cannot register `{0}`: a service with this name is already registered")]
    DuplicateRegistration(String),

    #[error("Could not resolve service `{0}`")]
    UnresolvedService(String),

    #[error("Service `{name}` is not of type `{expected}`")]
    TypeMismatch { name: String, expected: &'static str },
}

/// 服务的解析方式
#[derive(Clone)]
pub enum Resolver {
    Value(Instance),
    Factory(Factory),
}

struct Entry {
    resolver: Resolver,
    instance: OnceCell<Instance>,
}

/// 服务容器
///
/// 名称到值或工厂的注册表。工厂是惰性的，首次 `get` 时调用，
/// 之后返回缓存的实例；并发的首次 `get` 也只会调用一次工厂。
#[derive(Default)]
pub struct Container {
    entries: RwLock<HashMap<String, Arc<Entry>>>,
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("Container").field("services", &names).finish()
    }
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册服务
    ///
    /// # 返回值
    ///
    /// * `Ok(&Container)` - 注册成功，可以继续链式调用
    /// * `Err(ContainerError::DuplicateRegistration)` - 名称已被注册
    pub fn add(&self, name: &str, resolver: Resolver) -> Result<&Self, ContainerError> {
        let mut entries = self.entries.write();
        if entries.contains_key(name) {
            return Err(ContainerError::DuplicateRegistration(name.to_string()));
        }
        entries.insert(
            name.to_string(),
            Arc::new(Entry {
                resolver,
                instance: OnceCell::new(),
            }),
        );
        Ok(self)
    }

    /// 注册一个已构造好的值
    pub fn add_value<T: Any + Send + Sync>(&self, name: &str, value: T) -> Result<&Self, ContainerError> {
        self.add(name, Resolver::Value(Arc::new(value)))
    }

    /// 注册一个惰性工厂
    pub fn add_factory<T, F>(&self, name: &str, factory: F) -> Result<&Self, ContainerError>
    where
        T: Any + Send + Sync,
        F: Fn(&Container, Option<&Value>) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        self.add(
            name,
            Resolver::Factory(Arc::new(move |container, args| {
                factory(container, args).map(|value| Arc::new(value) as Instance)
            })),
        )
    }

    /// 解析服务
    ///
    /// 工厂执行期间不持有注册表的锁，因此工厂内部可以解析其他服务
    ///
    /// # 参数
    ///
    /// * `name` - 服务名称
    /// * `args` - 传给工厂的参数，仅在首次解析时使用
    pub fn get_with<T: Any + Send + Sync>(
        &self,
        name: &str,
        args: Option<&Value>,
    ) -> Result<Arc<T>, ContainerError> {
        let entry = self
            .entries
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::UnresolvedService(name.to_string()))?;

        let instance = entry.instance.get_or_try_init(|| match &entry.resolver {
            Resolver::Value(value) => Ok(value.clone()),
            Resolver::Factory(factory) => factory(self, args),
        })?;

        instance
            .clone()
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// 不带参数解析服务
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ContainerError> {
        self.get_with(name, None)
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }
}

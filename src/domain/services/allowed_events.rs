// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::RwLock;
use std::sync::Arc;

/// 内置的可订阅事件
pub const DEFAULT_EVENTS: [(&str, &str); 6] = [
    ("ENTRY_CREATE", "entry.create"),
    ("ENTRY_UPDATE", "entry.update"),
    ("ENTRY_DELETE", "entry.delete"),
    ("ENTRY_PUBLISH", "entry.publish"),
    ("ENTRY_UNPUBLISH", "entry.unpublish"),
    ("ENTRY_DRAFT_DISCARD", "entry.draft-discard"),
];

/// 可订阅事件注册表
///
/// 键到规范事件名称的映射，保持插入顺序。插件通常在 register 阶段
/// 追加自己的事件，之后以读取为主。克隆得到的是同一份注册表。
#[derive(Debug, Clone)]
pub struct AllowedEvents {
    entries: Arc<RwLock<Vec<(String, String)>>>,
}

impl Default for AllowedEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl AllowedEvents {
    /// 创建注册表并写入内置事件
    pub fn new() -> Self {
        let entries = DEFAULT_EVENTS
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// 添加或覆盖一个可订阅事件
    pub fn add(&self, key: &str, value: &str) {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => entries.push((key.to_string(), value.to_string())),
        }
    }

    /// 移除一个可订阅事件，返回被移除的事件名称
    pub fn remove(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.write();
        let index = entries.iter().position(|(k, _)| k == key)?;
        Some(entries.remove(index).1)
    }

    /// 按键查找事件名称
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// 列出所有事件名称
    pub fn list(&self) -> Vec<String> {
        self.entries.read().iter().map(|(_, v)| v.clone()).collect()
    }

    /// 事件名称是否允许订阅
    pub fn contains(&self, event: &str) -> bool {
        self.entries.read().iter().any(|(_, v)| v == event)
    }

    /// 返回不在注册表中的事件名称
    pub fn disallowed<'a>(&self, events: &'a [String]) -> Vec<&'a str> {
        let entries = self.entries.read();
        events
            .iter()
            .filter(|event| !entries.iter().any(|(_, v)| v == *event))
            .map(String::as_str)
            .collect()
    }
}

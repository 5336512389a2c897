// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 事件负载
pub type EventPayload = Map<String, Value>;

/// 领域事件信封
///
/// 事件名称加一个开放的负载映射，由事件中心在订阅者之间传递
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// 事件名称，例如 `entry.create`
    pub name: String,
    /// 事件负载
    pub payload: EventPayload,
}

impl Event {
    pub fn new(name: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// 创建一个空负载事件
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Map::new())
    }
}

/// Webhook 请求体
///
/// `event` 和 `createdAt` 为固定字段，负载中的同名键会被丢弃
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    pub event: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(flatten)]
    pub info: EventPayload,
}

impl WebhookPayload {
    pub fn new(event: &str, created_at: DateTime<Utc>, info: &EventPayload) -> Self {
        let info = info
            .iter()
            .filter(|(key, _)| key.as_str() != "event" && key.as_str() != "createdAt")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            event: event.to_string(),
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            info,
        }
    }
}

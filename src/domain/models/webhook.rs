// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Webhook实体
///
/// 表示一个已持久化的 Webhook 订阅：当 `events` 中的任一事件发生时，
/// 向 `url` 发送一次 HTTP POST 通知。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    /// Webhook唯一标识符，在不同存储后端之间保持稳定
    pub id: String,
    /// 名称
    pub name: String,
    /// 回调URL
    pub url: String,
    /// 自定义请求头
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// 订阅的事件名称
    #[serde(default)]
    pub events: Vec<String>,
    /// 是否启用；禁用的 Webhook 仍保留在索引中，但投递前会被过滤
    #[serde(default = "enabled_by_default")]
    pub is_enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl Webhook {
    /// 从输入数据创建一个带有指定ID的Webhook
    pub fn from_input(id: impl Into<String>, input: WebhookInput) -> Self {
        Self {
            id: id.into(),
            name: input.name,
            url: input.url,
            headers: input.headers,
            events: input.events,
            is_enabled: input.is_enabled,
        }
    }

    /// 是否订阅了指定事件
    pub fn subscribes_to(&self, event: &str) -> bool {
        self.events.iter().any(|e| e == event)
    }
}

/// Webhook 创建/更新的输入数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WebhookInput {
    /// 名称，不能为空
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    /// 回调URL，必须是合法的 URL
    #[validate(url(message = "url must be a valid URL"))]
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default = "enabled_by_default")]
    pub is_enabled: bool,
}

impl From<Webhook> for WebhookInput {
    fn from(webhook: Webhook) -> Self {
        Self {
            name: webhook.name,
            url: webhook.url,
            headers: webhook.headers,
            events: webhook.events,
            is_enabled: webhook.is_enabled,
        }
    }
}

/// Webhook 局部更新数据
///
/// 未提供的字段保留原值
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    pub events: Option<Vec<String>>,
    pub is_enabled: Option<bool>,
}

impl WebhookPatch {
    /// 将局部更新合并到已有的 Webhook 上，得到完整的输入数据
    pub fn apply_to(self, existing: Webhook) -> WebhookInput {
        WebhookInput {
            name: self.name.unwrap_or(existing.name),
            url: self.url.unwrap_or(existing.url),
            headers: self.headers.unwrap_or(existing.headers),
            events: self.events.unwrap_or(existing.events),
            is_enabled: self.is_enabled.unwrap_or(existing.is_enabled),
        }
    }
}

/// 单次投递结果
///
/// 非 2xx 响应不视为错误，而是携带状态码与响应体返回
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    /// HTTP 状态码；网络层失败时为 500
    pub status_code: u16,
    /// 失败时的响应体或错误信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DeliveryResult {
    pub fn ok(status_code: u16) -> Self {
        Self {
            status_code,
            message: None,
        }
    }

    pub fn failed(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: Some(message.into()),
        }
    }

    /// 是否为 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

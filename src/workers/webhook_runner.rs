// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::WebhookSettings;
use crate::domain::models::event::{Event, EventPayload, WebhookPayload};
use crate::domain::models::webhook::{DeliveryResult, Webhook};
use crate::domain::services::event_hub::{EventHub, ListenerId};
use crate::queue::worker_queue::WorkerQueue;
use crate::utils::errors::ConfigurationError;
use chrono::Utc;
use metrics::{counter, histogram};
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

/// 单次投递的超时时间
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// 投递时强制设置的事件头
pub const EVENT_HEADER: &str = "X-Strapi-Event";

/// 请求无法构造时返回的错误
///
/// 传输层失败（连接失败、超时等）不属于此类，它们以状态码 500 的
/// [`DeliveryResult`] 返回
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("invalid webhook url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid webhook header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: String },
}

/// 队列中的投递任务
#[derive(Debug, Clone)]
pub struct WebhookJob {
    pub event: String,
    pub info: EventPayload,
}

struct EventEntry {
    webhooks: Vec<Webhook>,
    listener: ListenerId,
}

struct RunnerInner {
    event_hub: EventHub,
    queue: WorkerQueue<WebhookJob>,
    client: Client,
    default_headers: HeaderMap,
    // An entry exists iff at least one webhook subscribes to the event
    index: Mutex<HashMap<String, EventEntry>>,
}

/// Webhook 运行器
///
/// 为每个被订阅的事件在事件中心注册一个监听器。监听器只把任务放入
/// 有界工作队列，真正的 HTTP 投递由队列的工作函数完成，因此 `emit`
/// 不会等待任何投递。单个 Webhook 的失败只会被记录，不影响其他 Webhook。
#[derive(Clone)]
pub struct WebhookRunner {
    inner: Arc<RunnerInner>,
}

impl std::fmt::Debug for WebhookRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookRunner")
            .field("events", &self.subscribed_events())
            .field("queue", &self.inner.queue)
            .finish()
    }
}

impl WebhookRunner {
    /// 创建 Webhook 运行器
    ///
    /// # 参数
    ///
    /// * `event_hub` - 监听器注册到的事件中心
    /// * `settings` - 默认请求头与并发上限
    ///
    /// # 返回值
    ///
    /// * `Ok(WebhookRunner)` - 创建成功
    /// * `Err(ConfigurationError)` - 并发上限为 0，或默认请求头非法
    pub fn new(event_hub: EventHub, settings: &WebhookSettings) -> Result<Self, ConfigurationError> {
        let queue = WorkerQueue::new(settings.concurrency)
            .map_err(|_| ConfigurationError::InvalidConcurrency(settings.concurrency))?;

        let mut default_headers = HeaderMap::new();
        for (name, value) in &settings.default_headers {
            let (name, value) = parse_header(name, value).map_err(|reason| {
                ConfigurationError::InvalidHeader {
                    name: name.clone(),
                    reason,
                }
            })?;
            default_headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .user_agent(concat!("Strapi-Webhook/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigurationError::Invalid(e.to_string()))?;

        let inner = Arc::new(RunnerInner {
            event_hub,
            queue,
            client,
            default_headers,
            index: Mutex::new(HashMap::new()),
        });

        let weak: Weak<RunnerInner> = Arc::downgrade(&inner);
        inner.queue.subscribe(move |job: WebhookJob| {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    WebhookRunner { inner }.execute_listener(job).await;
                }
                Ok(())
            }
        });

        Ok(Self { inner })
    }

    /// 添加 Webhook，为尚无监听器的事件注册监听器
    ///
    /// 同一标识的 Webhook 已存在时原地替换
    pub fn add(&self, webhook: Webhook) {
        debug!(webhook_id = %webhook.id, events = ?webhook.events, "Registering webhook");
        let mut index = self.inner.index.lock();

        for event in &webhook.events {
            if !index.contains_key(event) {
                self.create_listener(&mut index, event);
            }
            if let Some(entry) = index.get_mut(event) {
                match entry.webhooks.iter_mut().find(|w| w.id == webhook.id) {
                    Some(existing) => *existing = webhook.clone(),
                    None => entry.webhooks.push(webhook.clone()),
                }
            }
        }
    }

    /// 更新 Webhook，等价于先移除再添加
    pub fn update(&self, webhook: Webhook) {
        self.remove(&webhook);
        self.add(webhook);
    }

    /// 按标识移除 Webhook，事件不再有订阅者时注销其监听器
    pub fn remove(&self, webhook: &Webhook) {
        let mut index = self.inner.index.lock();
        let event_hub = &self.inner.event_hub;

        index.retain(|event, entry| {
            entry.webhooks.retain(|w| w.id != webhook.id);
            if entry.webhooks.is_empty() {
                event_hub.off(event, entry.listener);
                debug!(event = %event, "Webhook listener removed");
                false
            } else {
                true
            }
        });
    }

    fn create_listener(&self, index: &mut HashMap<String, EventEntry>, event: &str) {
        let queue = self.inner.queue.clone();
        let listener = self.inner.event_hub.on(event, move |event: Event| {
            queue.enqueue(WebhookJob {
                event: event.name,
                info: event.payload,
            });
            futures::future::ok::<(), anyhow::Error>(())
        });

        match index.get_mut(event) {
            Some(entry) => {
                error!(
                    "The webhook listener for event `{}` already exists, did you mean update()?",
                    event
                );
                let previous = std::mem::replace(&mut entry.listener, listener);
                self.inner.event_hub.off(event, previous);
            }
            None => {
                index.insert(
                    event.to_string(),
                    EventEntry {
                        webhooks: Vec::new(),
                        listener,
                    },
                );
            }
        }
    }

    /// 执行一次投递任务
    ///
    /// 依次调用该事件下所有已启用的 Webhook，失败只记录日志
    pub async fn execute_listener(&self, job: WebhookJob) {
        let webhooks: Vec<Webhook> = self
            .inner
            .index
            .lock()
            .get(&job.event)
            .map(|entry| {
                entry
                    .webhooks
                    .iter()
                    .filter(|w| w.is_enabled)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        for webhook in webhooks {
            match self.run(&webhook, &job.event, &job.info).await {
                Ok(result) if result.is_success() => {
                    debug!(webhook_id = %webhook.id, status = result.status_code, "Webhook delivered");
                }
                Ok(result) => error!(
                    webhook_id = %webhook.id,
                    event = %job.event,
                    status = result.status_code,
                    "Webhook delivery failed: {}",
                    result.message.unwrap_or_default()
                ),
                Err(e) => error!(
                    webhook_id = %webhook.id,
                    event = %job.event,
                    "Webhook delivery failed: {}",
                    e
                ),
            }
        }
    }

    /// 向单个 Webhook 投递事件
    ///
    /// 请求头优先级：默认请求头 < Webhook 自身请求头 < 强制的
    /// `X-Strapi-Event` 和 `Content-Type: application/json`。不做重试。
    ///
    /// # 返回值
    ///
    /// * `Ok(DeliveryResult)` - 2xx 只含状态码；其他状态码附带响应体；
    ///   传输失败为状态码 500 附带错误信息
    /// * `Err(DeliveryError)` - URL 或请求头非法，请求未发出
    pub async fn run(
        &self,
        webhook: &Webhook,
        event: &str,
        info: &EventPayload,
    ) -> Result<DeliveryResult, DeliveryError> {
        let url = Url::parse(&webhook.url).map_err(|e| DeliveryError::InvalidUrl {
            url: webhook.url.clone(),
            reason: e.to_string(),
        })?;
        let headers = self.build_headers(webhook, event)?;
        let body = WebhookPayload::new(event, Utc::now(), info);

        info!("Delivering event {} to webhook {}", event, webhook.id);
        counter!("webhook_delivery_attempts_total").increment(1);
        let start = Instant::now();

        let response = self
            .inner
            .client
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await;

        histogram!("webhook_delivery_duration_seconds").record(start.elapsed().as_secs_f64());

        match response {
            Ok(resp) => {
                let status = resp.status().as_u16();
                if resp.status().is_success() {
                    counter!("webhook_delivery_success_total").increment(1);
                    Ok(DeliveryResult::ok(status))
                } else {
                    counter!("webhook_delivery_failed_total", "reason" => "http_error")
                        .increment(1);
                    let message = resp.text().await.unwrap_or_default();
                    Ok(DeliveryResult::failed(status, message))
                }
            }
            Err(e) => {
                counter!("webhook_delivery_failed_total", "reason" => "network_error")
                    .increment(1);
                Ok(DeliveryResult::failed(500, e.to_string()))
            }
        }
    }

    fn build_headers(&self, webhook: &Webhook, event: &str) -> Result<HeaderMap, DeliveryError> {
        let mut headers = self.inner.default_headers.clone();

        for (name, value) in &webhook.headers {
            let (name, value) =
                parse_header(name, value).map_err(|reason| DeliveryError::InvalidHeader {
                    name: name.clone(),
                    reason,
                })?;
            headers.insert(name, value);
        }

        let event_value =
            HeaderValue::from_str(event).map_err(|e| DeliveryError::InvalidHeader {
                name: EVENT_HEADER.to_string(),
                reason: e.to_string(),
            })?;
        headers.insert(HeaderName::from_static("x-strapi-event"), event_value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(headers)
    }

    /// 事件当前是否注册了监听器
    pub fn has_listener(&self, event: &str) -> bool {
        self.inner.index.lock().contains_key(event)
    }

    /// 订阅了该事件的 Webhook（包括已禁用的）
    pub fn webhooks_for(&self, event: &str) -> Vec<Webhook> {
        self.inner
            .index
            .lock()
            .get(event)
            .map(|entry| entry.webhooks.clone())
            .unwrap_or_default()
    }

    /// 当前有监听器的事件名称，按字母排序
    pub fn subscribed_events(&self) -> Vec<String> {
        let mut events: Vec<String> = self.inner.index.lock().keys().cloned().collect();
        events.sort();
        events
    }

    /// 等待所有已入队的投递完成
    pub async fn wait_idle(&self) {
        self.inner.queue.wait_idle().await;
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), String> {
    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| e.to_string())?;
    let value = HeaderValue::from_str(value).map_err(|e| e.to_string())?;
    Ok((name, value))
}

#[cfg(test)]
#[path = "webhook_runner_test.rs"]
mod tests;

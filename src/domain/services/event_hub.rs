// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::event::{Event, EventPayload};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

/// 事件处理函数返回的 Future
pub type HandlerFuture = BoxFuture<'static, anyhow::Result<()>>;

/// 事件处理函数
///
/// 具名监听器和全局订阅者共用同一签名，都会收到完整的事件信封
pub type Handler = Arc<dyn Fn(Event) -> HandlerFuture + Send + Sync>;

/// 具名监听器标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// 全局订阅者标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

#[derive(Clone)]
enum Subscriber {
    /// 内置订阅者，按事件名称分发给具名监听器
    Default,
    Custom(Handler),
}

struct HubState {
    listeners: HashMap<String, Vec<(ListenerId, Handler)>>,
    subscribers: Vec<(SubscriberId, Subscriber)>,
}

struct HubInner {
    state: Mutex<HubState>,
}

// Ids are process-wide so a handle from one hub never matches an entry in another
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

impl HubInner {
    fn remove_listener(&self, name: &str, id: ListenerId) -> bool {
        let mut state = self.state.lock();
        let Some(listeners) = state.listeners.get_mut(name) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            state.listeners.remove(name);
        }
        removed
    }

    fn remove_subscriber(&self, id: SubscriberId) -> bool {
        let mut state = self.state.lock();
        let before = state.subscribers.len();
        state.subscribers.retain(|(subscriber_id, _)| *subscriber_id != id);
        state.subscribers.len() != before
    }
}

/// 全局订阅句柄
///
/// 调用 [`Subscription::unsubscribe`] 取消订阅；直接丢弃句柄不会取消订阅
#[derive(Debug)]
#[must_use = "dropping a Subscription keeps the subscriber registered"]
pub struct Subscription {
    id: SubscriberId,
    hub: Weak<HubInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// 取消订阅
    pub fn unsubscribe(self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove_subscriber(self.id);
        }
    }
}

impl std::fmt::Debug for HubInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EventHub")
            .field("events", &state.listeners.keys().collect::<Vec<_>>())
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

/// 事件中心
///
/// 进程内的发布/订阅总线。`emit` 按注册顺序依次等待每个订阅者完成，
/// 内置的默认订阅者再按注册顺序调用该事件的具名监听器。
/// 任一处理函数返回错误都会中止本次分发并把错误返回给调用方；
/// 错误隔离由调用方自行负责。
///
/// 内部状态由互斥锁保护，锁不会跨越 `.await` 持有，因此处理函数
/// 可以在分发过程中安全地注册或注销监听器。
#[derive(Clone, Debug)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    /// 创建事件中心，默认订阅者已注册
    pub fn new() -> Self {
        let inner = HubInner {
            state: Mutex::new(HubState {
                listeners: HashMap::new(),
                subscribers: Vec::new(),
            }),
        };
        let id = SubscriberId(next_id());
        inner.state.lock().subscribers.push((id, Subscriber::Default));
        Self {
            inner: Arc::new(inner),
        }
    }

    /// 发布事件
    ///
    /// # 参数
    ///
    /// * `name` - 事件名称
    /// * `payload` - 事件负载
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 所有订阅者均成功处理
    /// * `Err(anyhow::Error)` - 第一个失败的处理函数返回的错误，后续订阅者不再调用
    pub async fn emit(&self, name: &str, payload: EventPayload) -> anyhow::Result<()> {
        self.emit_event(Event::new(name, payload)).await
    }

    /// 发布一个已构造好的事件信封
    pub async fn emit_event(&self, event: Event) -> anyhow::Result<()> {
        let subscribers: Vec<Subscriber> = self
            .inner
            .state
            .lock()
            .subscribers
            .iter()
            .map(|(_, subscriber)| subscriber.clone())
            .collect();

        trace!(event = %event.name, subscribers = subscribers.len(), "Emitting event");

        for subscriber in subscribers {
            match subscriber {
                Subscriber::Default => self.dispatch_listeners(&event).await?,
                Subscriber::Custom(handler) => handler(event.clone()).await?,
            }
        }

        Ok(())
    }

    async fn dispatch_listeners(&self, event: &Event) -> anyhow::Result<()> {
        // Snapshot so listeners can (de)register while we iterate
        let listeners: Vec<Handler> = match self.inner.state.lock().listeners.get(&event.name) {
            Some(listeners) => listeners.iter().map(|(_, h)| h.clone()).collect(),
            None => return Ok(()),
        };

        for listener in listeners {
            listener(event.clone()).await?;
        }

        Ok(())
    }

    /// 注册全局订阅者，接收所有事件
    pub fn subscribe<F, Fut>(&self, subscriber: F) -> Subscription
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.subscribe_handler(Arc::new(move |event| subscriber(event).boxed()))
    }

    /// 注册一个已装箱的全局订阅者
    pub fn subscribe_handler(&self, handler: Handler) -> Subscription {
        let id = SubscriberId(next_id());
        self.inner
            .state
            .lock()
            .subscribers
            .push((id, Subscriber::Custom(handler)));

        Subscription {
            id,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// 取消全局订阅；未注册的标识不做任何处理
    ///
    /// # 返回值
    ///
    /// 是否确实移除了订阅者
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.remove_subscriber(id)
    }

    /// 注册具名监听器
    pub fn on<F, Fut>(&self, name: &str, listener: F) -> ListenerId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_handler(name, Arc::new(move |event| listener(event).boxed()))
    }

    /// 注册一个已装箱的具名监听器
    pub fn on_handler(&self, name: &str, handler: Handler) -> ListenerId {
        let id = ListenerId(next_id());
        self.insert_listener(name, id, handler);
        id
    }

    /// 注销具名监听器
    ///
    /// # 返回值
    ///
    /// 是否确实移除了监听器
    pub fn off(&self, name: &str, id: ListenerId) -> bool {
        self.inner.remove_listener(name, id)
    }

    /// 注册只触发一次的监听器
    ///
    /// 首次触发时监听器先注销自身再执行，即使存在重入或并发的 `emit`
    /// 也最多调用一次
    pub fn once<F, Fut>(&self, name: &str, listener: F) -> ListenerId
    where
        F: FnOnce(Event) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let id = ListenerId(next_id());
        let hub = Arc::downgrade(&self.inner);
        let slot = Arc::new(Mutex::new(Some(listener)));
        let event_name = name.to_string();

        let wrapper: Handler = Arc::new(move |event: Event| {
            let listener = slot.lock().take();
            if let Some(hub) = hub.upgrade() {
                hub.remove_listener(&event_name, id);
            }
            match listener {
                Some(listener) => listener(event).boxed(),
                None => futures::future::ok::<(), anyhow::Error>(()).boxed(),
            }
        });

        self.insert_listener(name, id, wrapper);
        id
    }

    fn insert_listener(&self, name: &str, id: ListenerId, handler: Handler) {
        self.inner
            .state
            .lock()
            .listeners
            .entry(name.to_string())
            .or_default()
            .push((id, handler));
    }

    /// 指定事件当前的具名监听器数量
    pub fn listener_count(&self, name: &str) -> usize {
        self.inner
            .state
            .lock()
            .listeners
            .get(name)
            .map_or(0, Vec::len)
    }

    /// 当前的全局订阅者数量（包括默认订阅者）
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.lock().subscribers.len()
    }

    pub fn remove_all_listeners(&self) -> &Self {
        self.inner.state.lock().listeners.clear();
        self
    }

    pub fn remove_all_subscribers(&self) -> &Self {
        self.inner.state.lock().subscribers.clear();
        self
    }

    /// 清空所有监听器和订阅者（包括默认订阅者），可重复调用
    pub fn destroy(&self) -> &Self {
        self.remove_all_listeners().remove_all_subscribers()
    }
}

#[cfg(test)]
#[path = "event_hub_test.rs"]
mod tests;

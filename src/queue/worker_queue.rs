// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{error, trace};

/// 默认并发上限
pub const DEFAULT_CONCURRENCY: usize = 5;

/// 队列错误类型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueueError {
    /// 并发上限必须大于 0
    #[error("Invalid concurrency: {0}, must be at least 1")]
    InvalidConcurrency(usize),
}

/// 工作函数返回的 Future
pub type WorkerFuture = BoxFuture<'static, anyhow::Result<()>>;

/// 工作函数
pub type Worker<T> = Arc<dyn Fn(T) -> WorkerFuture + Send + Sync>;

struct QueueState<T> {
    running: usize,
    buffer: Vec<T>,
    worker: Option<Worker<T>>,
}

struct QueueInner<T> {
    state: Mutex<QueueState<T>>,
    concurrency: usize,
    idle: Notify,
}

/// 有界并发工作队列
///
/// 同时执行的任务数不超过 `concurrency`，超出部分进入缓冲区。
/// 缓冲区按后进先出的顺序取出：最近入队的任务最先执行。
/// 工作函数返回的错误和 panic 都会被捕获并记录，不会影响后续任务。
pub struct WorkerQueue<T> {
    inner: Arc<QueueInner<T>>,
}

impl<T> Clone for WorkerQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> std::fmt::Debug for WorkerQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("WorkerQueue")
            .field("concurrency", &self.inner.concurrency)
            .field("running", &state.running)
            .field("pending", &state.buffer.len())
            .finish()
    }
}

impl<T: Send + 'static> Default for WorkerQueue<T> {
    fn default() -> Self {
        Self::with_concurrency(DEFAULT_CONCURRENCY)
    }
}

impl<T: Send + 'static> WorkerQueue<T> {
    /// 创建工作队列
    ///
    /// # 参数
    ///
    /// * `concurrency` - 同时执行的任务上限
    ///
    /// # 返回值
    ///
    /// * `Ok(WorkerQueue)` - 创建成功
    /// * `Err(QueueError::InvalidConcurrency)` - 上限为 0
    pub fn new(concurrency: usize) -> Result<Self, QueueError> {
        if concurrency == 0 {
            return Err(QueueError::InvalidConcurrency(concurrency));
        }
        Ok(Self::with_concurrency(concurrency))
    }

    fn with_concurrency(concurrency: usize) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    running: 0,
                    buffer: Vec::new(),
                    worker: None,
                }),
                concurrency,
                idle: Notify::new(),
            }),
        }
    }

    /// 设置工作函数，替换之前的工作函数
    pub fn subscribe<F, Fut>(&self, worker: F) -> &Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.subscribe_worker(Arc::new(move |payload| worker(payload).boxed()))
    }

    /// 设置一个已装箱的工作函数
    pub fn subscribe_worker(&self, worker: Worker<T>) -> &Self {
        self.inner.state.lock().worker = Some(worker);
        self
    }

    /// 入队任务，不会阻塞调用方
    ///
    /// 未达到并发上限时立即在新任务中执行，否则放入缓冲区。
    /// 必须在 Tokio 运行时内调用。
    pub fn enqueue(&self, payload: T) {
        let mut state = self.inner.state.lock();
        if state.running < self.inner.concurrency {
            state.running += 1;
            drop(state);
            tokio::spawn(Self::execute(self.inner.clone(), payload));
        } else {
            state.buffer.push(payload);
            trace!(pending = state.buffer.len(), "Queue saturated, payload buffered");
        }
    }

    async fn execute(inner: Arc<QueueInner<T>>, mut payload: T) {
        loop {
            let worker = inner.state.lock().worker.clone();

            match worker {
                Some(worker) => {
                    let outcome = AssertUnwindSafe(async move { worker(payload).await })
                        .catch_unwind()
                        .await;
                    match outcome {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => error!("Queue worker failed: {:#}", e),
                        Err(panic) => error!("Queue worker panicked: {}", panic_message(&*panic)),
                    }
                }
                None => error!("No worker subscribed to the queue, payload dropped"),
            }

            let mut state = inner.state.lock();
            match state.buffer.pop() {
                Some(next) => payload = next,
                None => {
                    state.running -= 1;
                    if state.running == 0 {
                        inner.idle.notify_waiters();
                    }
                    return;
                }
            }
        }
    }

    /// 正在执行的任务数
    pub fn running(&self) -> usize {
        self.inner.state.lock().running
    }

    /// 缓冲区中等待执行的任务数
    pub fn pending(&self) -> usize {
        self.inner.state.lock().buffer.len()
    }

    pub fn concurrency(&self) -> usize {
        self.inner.concurrency
    }

    /// 等待队列空闲（没有执行中和缓冲中的任务）
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let state = self.inner.state.lock();
                if state.running == 0 && state.buffer.is_empty() {
                    return;
                }
            }

            notified.await;
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "worker_queue_test.rs"]
mod tests;

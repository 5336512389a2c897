// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use ::cron::Schedule;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum CronError {
    #[error("Invalid cron expression `{expression}`: {reason}")]
    InvalidExpression { expression: String, reason: String },
}

pub type CronTask = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

struct CronJob {
    schedule: Schedule,
    task: CronTask,
    handle: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct CronState {
    jobs: HashMap<String, CronJob>,
    running: bool,
}

/// 定时任务服务
///
/// 表达式使用 `cron` crate 的六段（含秒）格式。任务在 `start()`
/// 之后才会被调度，启动后添加的任务立即开始调度。
#[derive(Clone, Default)]
pub struct CronService {
    state: Arc<Mutex<CronState>>,
}

impl std::fmt::Debug for CronService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CronService")
            .field("jobs", &state.jobs.keys().collect::<Vec<_>>())
            .field("running", &state.running)
            .finish()
    }
}

impl CronService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加定时任务，同名任务会被替换
    pub fn add<F, Fut>(&self, name: &str, expression: &str, task: F) -> Result<(), CronError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let schedule =
            Schedule::from_str(expression).map_err(|e| CronError::InvalidExpression {
                expression: expression.to_string(),
                reason: e.to_string(),
            })?;
        let task: CronTask = Arc::new(move || task().boxed());

        let mut state = self.state.lock();
        let mut job = CronJob {
            schedule,
            task,
            handle: None,
        };
        if state.running {
            job.handle = Some(spawn_job(name, &job));
        }
        if let Some(previous) = state.jobs.insert(name.to_string(), job) {
            abort(previous);
        }

        debug!(job = name, expression, "Cron job added");
        Ok(())
    }

    /// 移除定时任务
    pub fn remove(&self, name: &str) -> bool {
        match self.state.lock().jobs.remove(name) {
            Some(job) => {
                abort(job);
                true
            }
            None => false,
        }
    }

    pub fn start(&self) {
        let mut state = self.state.lock();
        if state.running {
            return;
        }
        state.running = true;
        for (name, job) in state.jobs.iter_mut() {
            job.handle = Some(spawn_job(name, job));
        }
        info!(jobs = state.jobs.len(), "Cron started");
    }

    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.running = false;
        for job in state.jobs.values_mut() {
            if let Some(handle) = job.handle.take() {
                handle.abort();
            }
        }
    }

    /// 停止调度并清空所有任务
    pub fn destroy(&self) {
        self.stop();
        self.state.lock().jobs.clear();
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn jobs(&self) -> Vec<String> {
        let mut jobs: Vec<String> = self.state.lock().jobs.keys().cloned().collect();
        jobs.sort();
        jobs
    }
}

fn abort(job: CronJob) {
    if let Some(handle) = job.handle {
        handle.abort();
    }
}

fn spawn_job(name: &str, job: &CronJob) -> JoinHandle<()> {
    let name = name.to_string();
    let schedule = job.schedule.clone();
    let task = job.task.clone();

    tokio::spawn(async move {
        while let Some(next) = schedule.upcoming(Utc).next() {
            let delay = (next - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(delay).await;

            if let Err(e) = task().await {
                error!("Cron job {} failed: {:#}", name, e);
            }
        }
        debug!(job = %name, "Cron schedule exhausted");
    })
}

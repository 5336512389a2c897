// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::container::{Container, ContainerError};
use crate::application::hooks::{InternalHooks, AFTER_SYNC, BEFORE_SYNC};
use crate::application::module::Module;
use crate::config::settings::Settings;
use crate::domain::repositories::webhook_repository::WebhookRepository;
use crate::domain::services::allowed_events::AllowedEvents;
use crate::domain::services::event_hub::EventHub;
use crate::domain::services::webhook_store::{StoreError, WebhookStore};
use crate::infrastructure::cron::CronService;
use crate::infrastructure::database::connection;
use crate::infrastructure::repositories::webhook_repo_impl::WebhookRepoImpl;
use crate::presentation::routes;
use crate::utils::errors::ConfigurationError;
use crate::workers::webhook_runner::WebhookRunner;
use migration::{Migrator, MigratorTrait};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use sea_orm::{DatabaseConnection, DbErr};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// 应用生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unregistered,
    Registered,
    Bootstrapped,
    Listening,
    Destroyed,
}

/// 生命周期错误
///
/// register 和 bootstrap 阶段的错误不会被吞掉，会中止启动
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Cannot {operation} while the application is {state:?}")]
    InvalidTransition {
        operation: &'static str,
        state: LifecycleState,
    },

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Webhook store error: {0}")]
    Store(#[from] StoreError),

    #[error("Hook `{hook}` failed: {source}")]
    Hook {
        hook: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Module `{module}` failed during {phase}: {source}")]
    Module {
        module: String,
        phase: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

struct ServerHandle {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

struct StrapiInner {
    settings: Arc<Settings>,
    container: Container,
    event_hub: EventHub,
    hooks: InternalHooks,
    cron: CronService,
    allowed_events: AllowedEvents,
    modules: Vec<Arc<dyn Module>>,
    injected_repository: Option<Arc<dyn WebhookRepository>>,
    runner: OnceCell<WebhookRunner>,
    store: OnceCell<WebhookStore>,
    db: Mutex<Option<Arc<DatabaseConnection>>>,
    state: Mutex<LifecycleState>,
    // Serializes lifecycle phases; held across awaits
    lifecycle: tokio::sync::Mutex<()>,
    server: Mutex<Option<ServerHandle>>,
    signal_task: Mutex<Option<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
}

/// 应用生命周期编排器
///
/// 持有服务容器，按 register → bootstrap → listen → destroy 的顺序
/// 驱动各个子系统，并把事件中心接入 Webhook 运行器。
///
/// 克隆得到的是同一个应用实例。模块的生命周期函数在编排器持有
/// 生命周期锁时被调用，因此不能在其中再调用 `register`、`bootstrap`、
/// `listen` 或 `destroy`。
#[derive(Clone)]
pub struct Strapi {
    inner: Arc<StrapiInner>,
}

impl std::fmt::Debug for Strapi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strapi")
            .field("state", &self.state())
            .field("modules", &self.inner.modules.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("container", &self.inner.container)
            .finish()
    }
}

/// 编排器构建器
pub struct StrapiBuilder {
    settings: Settings,
    modules: Vec<Arc<dyn Module>>,
    repository: Option<Arc<dyn WebhookRepository>>,
}

impl StrapiBuilder {
    /// 追加一个模块，生命周期函数按追加顺序调用
    pub fn module<M: Module + 'static>(mut self, module: M) -> Self {
        self.modules.push(Arc::new(module));
        self
    }

    /// 使用指定的 Webhook 仓库，而不是根据 `database.url` 连接数据库
    pub fn webhook_repository(mut self, repository: Arc<dyn WebhookRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn build(self) -> Strapi {
        let (shutdown, _) = watch::channel(false);
        Strapi {
            inner: Arc::new(StrapiInner {
                settings: Arc::new(self.settings),
                container: Container::new(),
                event_hub: EventHub::new(),
                hooks: InternalHooks::new(),
                cron: CronService::new(),
                allowed_events: AllowedEvents::new(),
                modules: self.modules,
                injected_repository: self.repository,
                runner: OnceCell::new(),
                store: OnceCell::new(),
                db: Mutex::new(None),
                state: Mutex::new(LifecycleState::Unregistered),
                lifecycle: tokio::sync::Mutex::new(()),
                server: Mutex::new(None),
                signal_task: Mutex::new(None),
                shutdown,
            }),
        }
    }
}

impl Strapi {
    pub fn builder(settings: Settings) -> StrapiBuilder {
        StrapiBuilder {
            settings,
            modules: Vec::new(),
            repository: None,
        }
    }

    pub fn new(settings: Settings) -> Self {
        Self::builder(settings).build()
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn container(&self) -> &Container {
        &self.inner.container
    }

    pub fn event_hub(&self) -> &EventHub {
        &self.inner.event_hub
    }

    pub fn hooks(&self) -> &InternalHooks {
        &self.inner.hooks
    }

    pub fn cron(&self) -> &CronService {
        &self.inner.cron
    }

    pub fn allowed_events(&self) -> &AllowedEvents {
        &self.inner.allowed_events
    }

    /// register 完成后可用
    pub fn webhook_runner(&self) -> Option<&WebhookRunner> {
        self.inner.runner.get()
    }

    /// bootstrap 完成后可用
    pub fn webhook_store(&self) -> Option<&WebhookStore> {
        self.inner.store.get()
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.lock()
    }

    /// HTTP 服务实际监听的地址，未监听时为 `None`
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.server.lock().as_ref().map(|server| server.addr)
    }

    fn expect_state(
        &self,
        operation: &'static str,
        expected: LifecycleState,
    ) -> Result<(), LifecycleError> {
        let state = self.state();
        if state != expected {
            return Err(LifecycleError::InvalidTransition { operation, state });
        }
        Ok(())
    }

    fn set_state(&self, state: LifecycleState) {
        *self.inner.state.lock() = state;
        debug!(?state, "Lifecycle state changed");
    }

    /// 注册阶段
    ///
    /// 把核心服务注册进容器，构造 Webhook 运行器，然后依次调用
    /// 每个模块的 `register`。失败后状态不变，可以重试，已注册的核心服务会被复用。
    pub async fn register(&self) -> Result<&Self, LifecycleError> {
        let _lifecycle = self.inner.lifecycle.lock().await;
        self.register_locked().await?;
        Ok(self)
    }

    async fn register_locked(&self) -> Result<(), LifecycleError> {
        self.expect_state("register", LifecycleState::Unregistered)?;
        info!("Registering application");

        let inner = &self.inner;
        self.add_service("config", (*inner.settings).clone())?;
        self.add_service("eventHub", inner.event_hub.clone())?;
        self.add_service("hooks", inner.hooks.clone())?;
        self.add_service("cron", inner.cron.clone())?;
        self.add_service("allowedEvents", inner.allowed_events.clone())?;

        let runner = inner
            .runner
            .get_or_try_init(|| {
                WebhookRunner::new(inner.event_hub.clone(), &inner.settings.server.webhooks)
            })?
            .clone();
        self.add_service("webhookRunner", runner)?;

        for module in &inner.modules {
            debug!(module = module.name(), "Registering module");
            module
                .register(self)
                .await
                .map_err(|source| LifecycleError::Module {
                    module: module.name().to_string(),
                    phase: "register",
                    source,
                })?;
        }

        self.set_state(LifecycleState::Registered);
        Ok(())
    }

    /// 启动阶段
    ///
    /// 构造 Webhook 存储，在前后钩子之间同步核心表结构，把已保存的
    /// Webhook 加载进运行器，按需启动定时任务，最后依次调用每个模块的
    /// `bootstrap`
    pub async fn bootstrap(&self) -> Result<&Self, LifecycleError> {
        let _lifecycle = self.inner.lifecycle.lock().await;
        self.bootstrap_locked().await?;
        Ok(self)
    }

    async fn bootstrap_locked(&self) -> Result<(), LifecycleError> {
        self.expect_state("bootstrap", LifecycleState::Registered)?;
        info!("Bootstrapping application");

        let inner = &self.inner;
        let store = match inner.store.get() {
            Some(store) => store.clone(),
            None => {
                let repository = self.webhook_repository().await?;
                let store = WebhookStore::new(repository, inner.allowed_events.clone());
                inner.store.get_or_init(|| store).clone()
            }
        };
        self.add_service("webhookStore", store)?;
        let db = inner.db.lock().clone();

        self.call_hook(BEFORE_SYNC).await?;
        if let Some(db) = &db {
            Migrator::up(db.as_ref(), None).await?;
            info!("Database migrations applied");
        }
        self.call_hook(AFTER_SYNC).await?;

        self.start_webhooks().await?;

        if inner.settings.server.cron.enabled {
            inner.cron.start();
        }

        for module in &inner.modules {
            debug!(module = module.name(), "Bootstrapping module");
            module
                .bootstrap(self)
                .await
                .map_err(|source| LifecycleError::Module {
                    module: module.name().to_string(),
                    phase: "bootstrap",
                    source,
                })?;
        }

        self.set_state(LifecycleState::Bootstrapped);
        Ok(())
    }

    /// 注入的仓库优先，否则按 `database.url` 建立连接
    async fn webhook_repository(&self) -> Result<Arc<dyn WebhookRepository>, LifecycleError> {
        let inner = &self.inner;
        if let Some(repository) = &inner.injected_repository {
            return Ok(repository.clone());
        }

        let db = Arc::new(connection::create_pool(&inner.settings.database).await?);
        info!("Database connection established");
        *inner.db.lock() = Some(db.clone());
        Ok(Arc::new(WebhookRepoImpl::new(db)))
    }

    // Failed phases may be retried, so existing services are kept
    fn add_service<T: Any + Send + Sync>(&self, name: &str, value: T) -> Result<(), LifecycleError> {
        if !self.inner.container.has(name) {
            self.inner.container.add_value(name, value)?;
        }
        Ok(())
    }

    async fn call_hook(&self, hook: &'static str) -> Result<(), LifecycleError> {
        self.inner
            .hooks
            .call(hook)
            .await
            .map_err(|source| LifecycleError::Hook { hook, source })
    }

    async fn start_webhooks(&self) -> Result<(), LifecycleError> {
        let (Some(store), Some(runner)) = (self.webhook_store(), self.webhook_runner()) else {
            return Ok(());
        };

        let webhooks = store.find_webhooks().await?;
        let count = webhooks.len();
        for webhook in webhooks {
            runner.add(webhook);
        }
        info!("Loaded {} webhooks", count);
        Ok(())
    }

    /// 按需执行 register 和 bootstrap
    pub async fn load(&self) -> Result<&Self, LifecycleError> {
        let _lifecycle = self.inner.lifecycle.lock().await;

        match self.state() {
            LifecycleState::Unregistered => {
                self.register_locked().await?;
                self.bootstrap_locked().await?;
            }
            LifecycleState::Registered => self.bootstrap_locked().await?,
            LifecycleState::Bootstrapped | LifecycleState::Listening => {}
            state @ LifecycleState::Destroyed => {
                return Err(LifecycleError::InvalidTransition {
                    operation: "load",
                    state,
                })
            }
        }

        Ok(self)
    }

    /// 绑定 `server.host:server.port` 并开始处理 HTTP 请求
    ///
    /// # 返回值
    ///
    /// * `Ok(SocketAddr)` - 实际监听的地址（端口为 0 时由系统分配）
    /// * `Err(LifecycleError)` - 状态不正确或绑定失败
    pub async fn listen(&self) -> Result<SocketAddr, LifecycleError> {
        let _lifecycle = self.inner.lifecycle.lock().await;
        self.expect_state("listen", LifecycleState::Bootstrapped)?;

        let (Some(store), Some(runner)) = (self.webhook_store(), self.webhook_runner()) else {
            return Err(LifecycleError::InvalidTransition {
                operation: "listen",
                state: self.state(),
            });
        };

        let settings = &self.inner.settings.server;
        let listener = TcpListener::bind((settings.host.as_str(), settings.port)).await?;
        let addr = listener.local_addr()?;

        let app = routes::routes(store.clone(), runner.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        *self.inner.server.lock() = Some(ServerHandle {
            addr,
            shutdown: shutdown_tx,
            task,
        });
        self.install_signal_handler();
        self.set_state(LifecycleState::Listening);

        info!("Server listening on {}", addr);
        Ok(addr)
    }

    /// 按需加载后开始监听
    ///
    /// 已在监听时返回 `InvalidTransition`，不会重复绑定
    pub async fn start(&self) -> Result<SocketAddr, LifecycleError> {
        self.load().await?;
        self.listen().await
    }

    fn install_signal_handler(&self) {
        let inner: Weak<StrapiInner> = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            shutdown_signal().await;
            info!("Shutdown signal received");
            if let Some(inner) = inner.upgrade() {
                inner.shutdown.send_replace(true);
            }
        });

        if let Some(previous) = self.inner.signal_task.lock().replace(task) {
            previous.abort();
        }
    }

    /// 请求关闭，唤醒所有 [`Strapi::wait_for_shutdown`] 的调用方
    pub fn request_shutdown(&self) {
        self.inner.shutdown.send_replace(true);
    }

    /// 等待 SIGINT/SIGTERM 或 [`Strapi::request_shutdown`]
    pub async fn wait_for_shutdown(&self) {
        let mut receiver = self.inner.shutdown.subscribe();
        let _ = receiver.wait_for(|requested| *requested).await;
    }

    /// 销毁应用，可重复调用
    ///
    /// 依次停止 HTTP 服务、调用模块的 `destroy`、销毁事件中心、关闭
    /// 数据库连接、销毁定时任务并撤销本实例安装的信号监听。
    /// 模块的 `destroy` 失败不会中断清理，第一个错误在清理完成后返回。
    pub async fn destroy(&self) -> Result<(), LifecycleError> {
        let _lifecycle = self.inner.lifecycle.lock().await;
        if self.state() == LifecycleState::Destroyed {
            return Ok(());
        }
        info!("Destroying application");

        let server = self.inner.server.lock().take();
        if let Some(server) = server {
            let _ = server.shutdown.send(());
            match server.task.await {
                Ok(Ok(())) => debug!("HTTP server stopped"),
                Ok(Err(e)) => error!("HTTP server stopped with error: {}", e),
                Err(e) => error!("HTTP server task failed: {}", e),
            }
        }

        let mut first_error = None;
        for module in &self.inner.modules {
            if let Err(source) = module.destroy(self).await {
                error!("Module {} failed to destroy: {:#}", module.name(), source);
                first_error.get_or_insert(LifecycleError::Module {
                    module: module.name().to_string(),
                    phase: "destroy",
                    source,
                });
            }
        }

        self.inner.event_hub.destroy();

        let db = self.inner.db.lock().take();
        if let Some(db) = db {
            if let Err(e) = (*db).clone().close().await {
                error!("Failed to close database connection: {}", e);
            }
        }

        self.inner.cron.destroy();

        if let Some(task) = self.inner.signal_task.lock().take() {
            task.abort();
        }

        self.set_state(LifecycleState::Destroyed);
        info!("Application destroyed");

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// 尽力销毁应用并返回进程退出码
    ///
    /// 销毁失败只会被记录
    pub async fn stop(&self, exit_code: i32) -> i32 {
        if let Err(e) = self.destroy().await {
            error!("Failed to destroy application: {}", e);
        }
        exit_code
    }

    /// 记录启动失败并以退出码 1 停止
    pub async fn stop_with_error(&self, err: &anyhow::Error) -> i32 {
        error!("Application failed: {:#}", err);
        self.stop(1).await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
#[path = "strapi_test.rs"]
mod tests;

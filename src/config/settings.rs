// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;

/// 默认 Webhook 投递并发数
pub const DEFAULT_WEBHOOK_CONCURRENCY: usize = 5;

/// 应用程序配置设置
///
/// 包含服务器、数据库和指标等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 指标配置
    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
    /// 定时任务配置
    #[serde(default)]
    pub cron: CronSettings,
    /// Webhook 配置
    #[serde(default)]
    pub webhooks: WebhookSettings,
}

/// 定时任务配置设置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CronSettings {
    /// 是否在 bootstrap 阶段启动定时任务
    #[serde(default)]
    pub enabled: bool,
}

/// Webhook配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSettings {
    /// 每次投递都会携带的默认请求头，可被 Webhook 自身的请求头覆盖
    #[serde(default)]
    pub default_headers: HashMap<String, String>,
    /// 同时进行的最大投递数
    #[serde(default = "default_webhook_concurrency")]
    pub concurrency: usize,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            default_headers: HashMap::new(),
            concurrency: DEFAULT_WEBHOOK_CONCURRENCY,
        }
    }
}

fn default_webhook_concurrency() -> usize {
    DEFAULT_WEBHOOK_CONCURRENCY
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用 Prometheus 导出
    pub enabled: bool,
    /// Prometheus 监听地址
    pub listen: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: "0.0.0.0:9000".to_string(),
        }
    }
}

impl Default for Settings {
    /// 与 `Settings::new()` 的内置默认值一致，数据库使用内存 SQLite
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 1337,
                cron: CronSettings::default(),
                webhooks: WebhookSettings::default(),
            },
            database: DatabaseSettings {
                url: "sqlite::memory:".to_string(),
                max_connections: Some(1),
                min_connections: Some(1),
                connect_timeout: Some(10),
                idle_timeout: Some(300),
            },
            metrics: MetricsSettings::default(),
        }
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加内置默认值、`config/default`、`config/{APP_ENVIRONMENT}`
    /// 以及 `STRAPI__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::from_builder(
            Self::defaults()?
                .add_source(File::with_name("config/default").required(false))
                .add_source(File::with_name(&format!("config/{}", env)).required(false))
                .add_source(Environment::with_prefix("STRAPI").separator("__")),
        )
    }

    /// 从指定的配置文件加载（不读取环境变量），主要用于测试
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::from_builder(Self::defaults()?.add_source(File::with_name(path)))
    }

    fn defaults() -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>, ConfigError>
    {
        Config::builder()
            // Default server settings
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 1337)?
            .set_default("server.cron.enabled", false)?
            .set_default(
                "server.webhooks.concurrency",
                DEFAULT_WEBHOOK_CONCURRENCY as i64,
            )?
            // Default DB pool settings
            .set_default("database.url", "sqlite::memory:")?
            .set_default("database.max_connections", 1)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Default metrics settings
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen", "0.0.0.0:9000")
    }

    fn from_builder(
        builder: config::builder::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}

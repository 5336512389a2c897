// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// 仓库层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("数据库错误: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("未找到数据")]
    NotFound,

    #[error("数据已存在")]
    AlreadyExists,

    #[error("内部错误: {0}")]
    InternalError(String),
}

/// 配置错误
///
/// 在构造阶段发现的非法配置，属于启动期致命错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("invalid webhook concurrency: {0} (must be a positive integer)")]
    InvalidConcurrency(usize),

    #[error("invalid default webhook header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库实现模块
///
/// 提供数据库和内存两种 Webhook 仓库实现
pub mod memory_webhook_repo;
pub mod webhook_repo_impl;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 包含事件信封和 Webhook 订阅等核心实体
pub mod event;
pub mod webhook;

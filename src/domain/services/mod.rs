// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 可订阅事件（allowed_events）：Webhook 可订阅事件注册表
/// - 事件中心（event_hub）：进程内发布/订阅总线
/// - Webhook 存储（webhook_store）：带事件校验的 Webhook 持久化服务
pub mod allowed_events;
pub mod event_hub;
pub mod webhook_store;

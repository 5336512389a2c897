// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// - Webhook 运行器（webhook_runner）：把事件中心的事件投递给订阅的 Webhook
pub mod webhook_runner;

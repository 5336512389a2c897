// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 包含服务容器、内部钩子、模块生命周期契约、应用生命周期编排器
/// 以及 Webhook 管理用例
pub mod container;
pub mod hooks;
pub mod module;
pub mod strapi;
pub mod use_cases;

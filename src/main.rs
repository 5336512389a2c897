// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use strapi_core::application::strapi::Strapi;
use strapi_core::config::settings::Settings;
use strapi_core::infrastructure::metrics::init_metrics;
use strapi_core::utils::telemetry;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting strapi...");

    // 2. Load configuration
    let settings = match Settings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("Configuration loaded");

    // Initialize Prometheus Metrics
    init_metrics(&settings.metrics);

    // 3. Register, bootstrap and listen
    let strapi = Strapi::new(settings);
    if let Err(e) = strapi.start().await {
        let code = strapi.stop_with_error(&e.into()).await;
        std::process::exit(code);
    }

    // 4. Run until SIGINT/SIGTERM
    strapi.wait_for_shutdown().await;
    let code = strapi.stop(0).await;
    std::process::exit(code);
}

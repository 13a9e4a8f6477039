// src/main.rs - Farm host entry point
use printerfarm::config::Config;
use printerfarm::moonraker::{MoonrakerClient, PrinterEndpoint};
use printerfarm::pool::PrinterPool;
use printerfarm::web;
use std::env;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting printer farm host");

    // Get configuration file path
    let args: Vec<String> = env::args().collect();
    let config_path = if args.len() > 1 { &args[1] } else { "farm.toml" };

    // Load configuration
    let config = Config::load(config_path).map_err(|e| {
        tracing::error!("Failed to load config from '{}': {}", config_path, e);
        Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
    })?;

    let printers: Vec<PrinterEndpoint> = config
        .farm
        .printers
        .iter()
        .map(|url| PrinterEndpoint::new(url.as_str()))
        .collect();

    if printers.is_empty() {
        tracing::warn!("No printers configured; every upload will be rejected");
    }
    for printer in &printers {
        tracing::info!("Configured printer: {}", printer);
    }

    let client = MoonrakerClient::new(
        Duration::from_secs(config.farm.poll_timeout_secs),
        Duration::from_secs(config.farm.upload_timeout_secs),
    );
    let pool = PrinterPool::new(printers, Arc::new(client));
    let state = Arc::new(web::api::AppStateInner { pool });

    // Create the Axum router and start serving.
    let app = web::api::create_router_with_state(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    tracing::info!("Farm host listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

//! SiteWatch - HTTP(S) endpoint availability monitor.
//!
//! Probes registered sites on a schedule, records every outcome as an
//! immutable check, and serves uptime/latency aggregates over HTTP.

mod config;
mod db;
mod monitor;
mod probe;
mod scheduler;
mod status;
mod web;

use config::ServerConfig;
use db::Store;
use monitor::Monitor;
use probe::Prober;
use scheduler::SweepScheduler;
use status::StatusService;
use web::Server;

use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("sitewatch=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting SiteWatch on port {}...", cfg.http_port);
    tracing::info!("Using database at {}", cfg.db_path);

    // Initialize database
    let store = Arc::new(Store::new(&cfg.db_path)?);
    tracing::info!("Database initialized successfully");

    // Wire the engine
    let prober = Prober::new(Duration::from_millis(cfg.probe_timeout_ms));
    let monitor = Arc::new(Monitor::new(
        store.clone(),
        prober,
        cfg.max_concurrent_probes,
    ));
    let status = Arc::new(StatusService::new(store.clone()));

    // Start the sweep scheduler
    let scheduler = SweepScheduler::new(
        monitor.clone(),
        Duration::from_secs(cfg.sweep_interval_secs),
    );
    scheduler.start();
    tracing::info!("Sweep scheduler started (every {}s)", cfg.sweep_interval_secs);

    // Start web server
    let server = Server::new(cfg, store, monitor, status);
    server.start().await?;

    Ok(())
}

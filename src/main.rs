// src/main.rs

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::info;

use logsense::api;
use logsense::config::AppConfig;
use logsense::observability::metrics as ob_metrics;
use logsense::observability::tracing as ob_tracing;
use logsense::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = AppConfig::from_env().context("invalid configuration")?;

    // Hold the guard so the file writer flushes on exit
    let _log_guard = ob_tracing::init_tracing(&config.log_level, config.log_dir.as_deref());
    info!("🟢 Tracing initialized");

    let metrics_addr: SocketAddr = config
        .metrics_address
        .parse()
        .with_context(|| format!("METRICS_ADDRESS {:?} is not a socket address", config.metrics_address))?;
    tokio::spawn(ob_metrics::serve_metrics(metrics_addr));

    let state = AppState::initialize(&config).await?;
    info!("🟢 Store ready ({:?})", config.store);

    let http_addr: SocketAddr = config
        .http_address
        .parse()
        .with_context(|| format!("HTTP_ADDRESS {:?} is not a socket address", config.http_address))?;
    let (bound, server) = warp::serve(api::routes(state)).bind_with_graceful_shutdown(http_addr, async {
        signal::ctrl_c().await.ok();
        info!("🛑 Shutdown signal received. Exiting...");
    });
    info!("🚀 logsense API running at http://{}", bound);

    server.await;
    Ok(())
}

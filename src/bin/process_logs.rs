use anyhow::Context;
use logsense::config::AppConfig;
use logsense::observability::tracing::init_tracing;
use logsense::state::AppState;

/// Runs one processing pass against the configured store and prints the report.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = AppConfig::from_env().context("invalid configuration")?;
    let _log_guard = init_tracing(&config.log_level, config.log_dir.as_deref());

    let state = AppState::initialize(&config).await?;
    let report = state.processor.run().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    NotANumber { key: &'static str, value: String },
    #[error("{key} must be at least 1")]
    Zero { key: &'static str },
    #[error("STORE must be `clickhouse` or `memory`, got {0:?}")]
    UnknownStore(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    ClickHouse,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_address: String,
    pub metrics_address: String,
    pub store: StoreKind,
    pub clickhouse_url: String,
    pub clickhouse_user: String,
    pub clickhouse_password: String,
    pub clickhouse_database: String,
    pub sentiment_url: String,
    pub rag_url: String,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub http_timeout: Duration,
    pub log_level: String,
    pub log_dir: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let store = match var("STORE", "clickhouse").to_lowercase().as_str() {
            "clickhouse" => StoreKind::ClickHouse,
            "memory" => StoreKind::Memory,
            other => return Err(ConfigError::UnknownStore(other.to_string())),
        };

        Ok(Self {
            http_address: var("HTTP_ADDRESS", "0.0.0.0:8000"),
            metrics_address: var("METRICS_ADDRESS", "0.0.0.0:9898"),
            store,
            clickhouse_url: var("CLICKHOUSE_URL", "http://localhost:8123"),
            clickhouse_user: var("CLICKHOUSE_USER", "default"),
            clickhouse_password: var("CLICKHOUSE_PASSWORD", ""),
            clickhouse_database: var("CLICKHOUSE_DATABASE", "machine_logs"),
            sentiment_url: var("SENTIMENT_URL", "http://localhost:8002/analyze_batch"),
            rag_url: var("RAG_URL", "http://localhost:8001"),
            batch_size: positive(&lookup, "BATCH_SIZE", 10)?,
            max_attempts: positive(&lookup, "MAX_ATTEMPTS", 3)?,
            retry_delay: Duration::from_millis(number(&lookup, "RETRY_DELAY_MS", 2000)?),
            http_timeout: Duration::from_secs(positive(&lookup, "HTTP_TIMEOUT_SECS", 60)?),
            log_level: var("LOG_LEVEL", "info"),
            log_dir: lookup("LOG_DIR").filter(|d| !d.is_empty()),
        })
    }
}

fn number<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::NotANumber { key, value: raw }),
    }
}

fn positive<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialEq + Default,
{
    let value = number(lookup, key, default)?;
    if value == T::default() {
        return Err(ConfigError::Zero { key });
    }
    Ok(value)
}

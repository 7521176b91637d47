use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use crate::config::{AppConfig, StoreKind};
use crate::pipeline::{HttpClassifier, LogProcessor, RetryPolicy, SentimentClassifier, SentimentClient};
use crate::rag::{HttpAssistant, SolutionAssistant};
use crate::storage::{ClickHouseStore, MemoryStore, Store};

/// Everything a request handler needs, passed explicitly into each route.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub processor: Arc<LogProcessor>,
    pub assistant: Arc<dyn SolutionAssistant>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        classifier: Arc<dyn SentimentClassifier>,
        assistant: Arc<dyn SolutionAssistant>,
        batch_size: usize,
        policy: RetryPolicy,
    ) -> Self {
        let client = SentimentClient::new(classifier, policy);
        let processor = Arc::new(LogProcessor::new(store.clone(), client, batch_size));
        Self {
            store,
            processor,
            assistant,
        }
    }

    /// Connects the configured store (creating its schema) and builds the HTTP clients.
    pub async fn initialize(config: &AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn Store> = match config.store {
            StoreKind::ClickHouse => {
                let store = ClickHouseStore::new(config);
                store
                    .init_schema()
                    .await
                    .context("failed to create ClickHouse schema")?;
                Arc::new(store)
            }
            StoreKind::Memory => {
                info!("Using in-memory store; data is lost on exit");
                Arc::new(MemoryStore::new())
            }
        };

        let classifier = HttpClassifier::new(&config.sentiment_url, config.http_timeout)
            .context("failed to build sentiment classifier client")?;
        let assistant = HttpAssistant::new(&config.rag_url, config.http_timeout)
            .context("failed to build assistant client")?;

        Ok(Self::new(
            store,
            Arc::new(classifier),
            Arc::new(assistant),
            config.batch_size,
            RetryPolicy::new(config.max_attempts, config.retry_delay),
        ))
    }
}

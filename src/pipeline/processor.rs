use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{error, info};

use super::batcher::{batches, BatchError};
use super::persister::persist_verdicts;
use super::sentiment::SentimentClient;
use crate::models::Log;
use crate::observability::metrics;
use crate::storage::{StorageError, Store};

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Batch(#[from] BatchError),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProcessingReport {
    pub status: String,
    pub message: String,
    pub logs_processed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken_seconds: Option<f64>,
}

/// Scans for unprocessed logs, classifies them batch by batch and records the results.
pub struct LogProcessor {
    store: Arc<dyn Store>,
    client: SentimentClient,
    batch_size: usize,
    // Serializes runs within this process.
    run_lock: Mutex<()>,
}

impl LogProcessor {
    pub fn new(store: Arc<dyn Store>, client: SentimentClient, batch_size: usize) -> Self {
        Self {
            store,
            client,
            batch_size,
            run_lock: Mutex::new(()),
        }
    }

    pub async fn run(&self) -> Result<ProcessingReport, ProcessingError> {
        let _running = self.run_lock.lock().await;
        metrics::PROCESSING_RUNS.inc();
        info!("Starting log processing from database...");
        let started = Instant::now();

        let unprocessed = self.store.unprocessed_logs().await?;
        if unprocessed.is_empty() {
            info!("No unprocessed logs found.");
            return Ok(ProcessingReport {
                status: "success".into(),
                message: "No unprocessed logs found.".into(),
                logs_processed: 0,
                time_taken_seconds: None,
            });
        }
        info!("Found {} unprocessed logs.", unprocessed.len());

        let items: Vec<(u64, String)> = unprocessed.iter().map(Log::as_item).collect();
        for (index, batch) in batches(&items, self.batch_size)?.enumerate() {
            info!("Processing batch {} ({} logs)", index + 1, batch.len());
            let verdict = self.client.classify_batch(batch).await;
            if verdict.is_fallback() {
                error!("Batch {} saved with default sentiment: {:?}", index + 1, verdict.outcome);
            }
            persist_verdicts(self.store.as_ref(), &verdict.sentiments).await?;
            metrics::LOGS_PROCESSED.inc_by(batch.len() as u64);
        }

        let elapsed = started.elapsed().as_secs_f64();
        info!("Processing complete. Total time taken: {:.2} seconds", elapsed);
        Ok(ProcessingReport {
            status: "success".into(),
            message: format!("Processed {} logs successfully.", items.len()),
            logs_processed: items.len(),
            time_taken_seconds: Some((elapsed * 100.0).round() / 100.0),
        })
    }
}

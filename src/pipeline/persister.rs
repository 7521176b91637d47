use tracing::info;

use crate::models::{ProcessedLog, Sentiment};
use crate::storage::{StorageError, Store};

/// Writes one unresolved processed record per verdict, each committed on its own.
/// Rows written before a failure stay written.
pub async fn persist_verdicts(
    store: &dyn Store,
    sentiments: &[(u64, Sentiment)],
) -> Result<Vec<ProcessedLog>, StorageError> {
    let mut saved = Vec::with_capacity(sentiments.len());
    for (log_id, sentiment) in sentiments {
        let row = store.insert_processed_log(*log_id, *sentiment, false).await?;
        info!("Saved sentiment result for LogId {}: Sentiment={}", log_id, sentiment);
        saved.push(row);
    }
    Ok(saved)
}

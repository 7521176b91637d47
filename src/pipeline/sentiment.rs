use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::classifier::{ClassifierVerdict, SentimentClassifier};
use crate::models::Sentiment;
use crate::observability::metrics;

/// Whole-batch retry: a fixed delay between attempts, no backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Classified { attempts: u32 },
    Fallback { attempts: u32, reason: String },
}

/// Exactly one sentiment per submitted log, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchVerdict {
    pub sentiments: Vec<(u64, Sentiment)>,
    pub outcome: BatchOutcome,
}

impl BatchVerdict {
    pub fn is_fallback(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Fallback { .. })
    }
}

pub struct SentimentClient {
    classifier: Arc<dyn SentimentClassifier>,
    policy: RetryPolicy,
}

impl SentimentClient {
    pub fn new(classifier: Arc<dyn SentimentClassifier>, policy: RetryPolicy) -> Self {
        Self { classifier, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Classifies a batch of `(log_id, content)` pairs.
    ///
    /// A non-success status resubmits the same batch after `policy.delay`, up to
    /// `policy.max_attempts` in total. Exhaustion, or any transport or decode
    /// failure, degrades every item in the batch to [`Sentiment::NotFlagged`].
    /// This never fails: the caller always gets one verdict per input.
    pub async fn classify_batch(&self, batch: &[(u64, String)]) -> BatchVerdict {
        let sentences: Vec<String> = batch.iter().map(|(_, content)| content.clone()).collect();
        let max_attempts = self.policy.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.classifier.classify(&sentences).await {
                Ok(verdicts) => {
                    metrics::CLASSIFIER_REQUESTS.with_label_values(&["success"]).inc();
                    return BatchVerdict {
                        sentiments: map_verdicts(batch, &verdicts),
                        outcome: BatchOutcome::Classified { attempts: attempt },
                    };
                }
                Err(e) if e.is_retryable() => {
                    metrics::CLASSIFIER_REQUESTS.with_label_values(&["rejected"]).inc();
                    warn!("Classifier error on attempt {}/{}: {}", attempt, max_attempts, e);
                    if attempt >= max_attempts {
                        error!("All {} attempts failed. Saving default results.", max_attempts);
                        return fallback(batch, attempt, e.to_string());
                    }
                    info!("Retrying in {:?}...", self.policy.delay);
                    tokio::time::sleep(self.policy.delay).await;
                }
                Err(e) => {
                    metrics::CLASSIFIER_REQUESTS.with_label_values(&["error"]).inc();
                    error!("Exception while classifying batch: {}", e);
                    return fallback(batch, attempt, e.to_string());
                }
            }
        }
    }
}

fn map_verdicts(batch: &[(u64, String)], verdicts: &[ClassifierVerdict]) -> Vec<(u64, Sentiment)> {
    if verdicts.len() != batch.len() {
        warn!(
            "Classifier returned {} results for {} logs; missing positions default to 0",
            verdicts.len(),
            batch.len()
        );
    }
    batch
        .iter()
        .enumerate()
        .map(|(i, (log_id, _))| {
            let verdict = verdicts.get(i);
            if let Some(explanation) = verdict.and_then(|v| v.explanation.as_deref()) {
                debug!(log_id, explanation, "classifier explanation");
            }
            let score = verdict.and_then(|v| v.sentiment);
            (*log_id, Sentiment::from_classifier_score(score))
        })
        .collect()
}

fn fallback(batch: &[(u64, String)], attempts: u32, reason: String) -> BatchVerdict {
    metrics::BATCH_FALLBACKS.inc();
    BatchVerdict {
        sentiments: batch
            .iter()
            .map(|(log_id, _)| (*log_id, Sentiment::NotFlagged))
            .collect(),
        outcome: BatchOutcome::Fallback { attempts, reason },
    }
}

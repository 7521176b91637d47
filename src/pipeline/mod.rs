//! Sentiment processing: scan → batch → classify (with retry) → persist.

pub mod batcher;
pub mod classifier;
pub mod persister;
pub mod processor;
pub mod sentiment;

pub use batcher::{batches, BatchError, DEFAULT_BATCH_SIZE};
pub use classifier::{ClassifierError, ClassifierVerdict, HttpClassifier, SentimentClassifier};
pub use processor::{LogProcessor, ProcessingError, ProcessingReport};
pub use sentiment::{BatchOutcome, BatchVerdict, RetryPolicy, SentimentClient};

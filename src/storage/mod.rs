pub mod clickhouse;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Conversation, ErrorFilter, ErrorRecord, KnowledgeEntry, Log, Machine, Message, NewKnowledgeEntry,
    NewLog, NewMessage, ProcessedLog, Sentiment,
};

pub use self::clickhouse::ClickHouseStore;
pub use self::memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("clickhouse: {0}")]
    ClickHouse(#[from] ::clickhouse::error::Error),
    #[error("{0}")]
    Other(String),
}

/// Relational access used by the pipeline and the HTTP API.
///
/// Every write is committed on its own; there is no multi-row transaction.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap round trip used by health checks.
    async fn ping(&self) -> Result<(), StorageError>;

    async fn insert_machine(&self, machine_name: &str) -> Result<Machine, StorageError>;
    async fn machines(&self) -> Result<Vec<Machine>, StorageError>;

    async fn insert_log(&self, log: NewLog) -> Result<Log, StorageError>;
    async fn log(&self, log_id: u64) -> Result<Option<Log>, StorageError>;

    /// Logs with no processed record referencing them, ascending by id.
    async fn unprocessed_logs(&self) -> Result<Vec<Log>, StorageError>;

    /// Creates a processed record. Performs no existence check.
    async fn insert_processed_log(
        &self,
        log_id: u64,
        sentiment: Sentiment,
        resolved: bool,
    ) -> Result<ProcessedLog, StorageError>;
    async fn processed_log_for(&self, log_id: u64) -> Result<Option<ProcessedLog>, StorageError>;
    async fn processed_logs(&self) -> Result<Vec<ProcessedLog>, StorageError>;
    async fn errors(&self, filter: &ErrorFilter) -> Result<Vec<ErrorRecord>, StorageError>;
    /// Returns the updated record, or `None` when `process_id` is unknown.
    async fn set_resolved(
        &self,
        process_id: u64,
        resolved: bool,
    ) -> Result<Option<ProcessedLog>, StorageError>;

    async fn insert_knowledge(&self, entry: NewKnowledgeEntry) -> Result<KnowledgeEntry, StorageError>;
    /// All entries, joined with their machine name when the machine exists.
    async fn knowledge_entries(&self) -> Result<Vec<KnowledgeEntry>, StorageError>;
    async fn knowledge_by_content(&self, content: &str) -> Result<Vec<KnowledgeEntry>, StorageError>;
    async fn update_solution(
        &self,
        knowledge_id: u64,
        solution: &str,
    ) -> Result<Option<KnowledgeEntry>, StorageError>;

    async fn insert_conversation(&self, log_id: u64) -> Result<Conversation, StorageError>;
    async fn conversation(&self, conversation_id: u64) -> Result<Option<Conversation>, StorageError>;
    async fn conversation_for_log(&self, log_id: u64) -> Result<Option<Conversation>, StorageError>;
    async fn insert_message(
        &self,
        conversation_id: u64,
        message: NewMessage,
    ) -> Result<Message, StorageError>;
    async fn messages(&self, conversation_id: u64) -> Result<Vec<Message>, StorageError>;
}

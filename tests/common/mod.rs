#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use logsense::models::{
    Conversation, ErrorFilter, ErrorRecord, KnowledgeEntry, Log, Machine, Message, NewKnowledgeEntry,
    NewLog, NewMessage, ProcessedLog, Sentiment,
};
use logsense::pipeline::{ClassifierError, ClassifierVerdict, SentimentClassifier};
use logsense::rag::{AssistantError, SolutionAssistant};
use logsense::storage::{MemoryStore, StorageError, Store};

/// Classifier double: flags any sentence containing "ERROR", or fails every call with `status`.
pub struct FakeClassifier {
    pub status: Option<u16>,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl FakeClassifier {
    pub fn flagging_errors() -> Arc<Self> {
        Arc::new(Self {
            status: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            status: Some(status),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(Vec::len).collect()
    }
}

#[async_trait]
impl SentimentClassifier for FakeClassifier {
    async fn classify(&self, sentences: &[String]) -> Result<Vec<ClassifierVerdict>, ClassifierError> {
        self.calls.lock().unwrap().push(sentences.to_vec());
        if let Some(status) = self.status {
            return Err(ClassifierError::Status {
                status,
                body: "Internal Server Error".into(),
            });
        }
        Ok(sentences
            .iter()
            .map(|s| ClassifierVerdict {
                sentiment: Some(if s.contains("ERROR") { -1.0 } else { 0.0 }),
                explanation: None,
            })
            .collect())
    }
}

/// Assistant double that echoes the query and records preloaded histories.
#[derive(Default)]
pub struct EchoAssistant {
    pub queries: Mutex<Vec<(String, String)>>,
    pub preloaded: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl SolutionAssistant for EchoAssistant {
    async fn query(&self, conversation_id: &str, query: &str) -> Result<String, AssistantError> {
        self.queries
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), query.to_string()));
        Ok(format!("answer to: {}", query))
    }

    async fn preload_history(
        &self,
        conversation_id: &str,
        messages: &[NewMessage],
    ) -> Result<(), AssistantError> {
        self.preloaded
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), messages.len()));
        Ok(())
    }
}

/// A store with one machine and `count` logs; every third log is an error line.
pub async fn seeded_store(count: u64) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let machine = store.insert_machine("press-01").await.unwrap();
    for i in 1..=count {
        let content = if i % 3 == 0 {
            format!("ERROR spindle {} overheated", i)
        } else {
            format!("INFO cycle {} complete", i)
        };
        store
            .insert_log(NewLog {
                machine_id: machine.machine_id,
                date_created: Utc.timestamp_millis_opt(1_700_000_000_000 + i as i64).unwrap(),
                log_content: content,
            })
            .await
            .unwrap();
    }
    store
}

/// Delegates to a memory store but refuses processed-record writes after `allowed` of them.
pub struct FlakyStore {
    pub inner: Arc<MemoryStore>,
    allowed: usize,
    written: AtomicUsize,
}

impl FlakyStore {
    pub fn over(inner: Arc<MemoryStore>, allowed: usize) -> Arc<Self> {
        Arc::new(Self {
            inner,
            allowed,
            written: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn ping(&self) -> Result<(), StorageError> {
        self.inner.ping().await
    }
    async fn insert_machine(&self, machine_name: &str) -> Result<Machine, StorageError> {
        self.inner.insert_machine(machine_name).await
    }
    async fn machines(&self) -> Result<Vec<Machine>, StorageError> {
        self.inner.machines().await
    }
    async fn insert_log(&self, log: NewLog) -> Result<Log, StorageError> {
        self.inner.insert_log(log).await
    }
    async fn log(&self, log_id: u64) -> Result<Option<Log>, StorageError> {
        self.inner.log(log_id).await
    }
    async fn unprocessed_logs(&self) -> Result<Vec<Log>, StorageError> {
        self.inner.unprocessed_logs().await
    }
    async fn insert_processed_log(
        &self,
        log_id: u64,
        sentiment: Sentiment,
        resolved: bool,
    ) -> Result<ProcessedLog, StorageError> {
        if self.written.fetch_add(1, Ordering::SeqCst) >= self.allowed {
            return Err(StorageError::Other("disk full".into()));
        }
        self.inner.insert_processed_log(log_id, sentiment, resolved).await
    }
    async fn processed_log_for(&self, log_id: u64) -> Result<Option<ProcessedLog>, StorageError> {
        self.inner.processed_log_for(log_id).await
    }
    async fn processed_logs(&self) -> Result<Vec<ProcessedLog>, StorageError> {
        self.inner.processed_logs().await
    }
    async fn errors(&self, filter: &ErrorFilter) -> Result<Vec<ErrorRecord>, StorageError> {
        self.inner.errors(filter).await
    }
    async fn set_resolved(
        &self,
        process_id: u64,
        resolved: bool,
    ) -> Result<Option<ProcessedLog>, StorageError> {
        self.inner.set_resolved(process_id, resolved).await
    }
    async fn insert_knowledge(&self, entry: NewKnowledgeEntry) -> Result<KnowledgeEntry, StorageError> {
        self.inner.insert_knowledge(entry).await
    }
    async fn knowledge_entries(&self) -> Result<Vec<KnowledgeEntry>, StorageError> {
        self.inner.knowledge_entries().await
    }
    async fn knowledge_by_content(&self, content: &str) -> Result<Vec<KnowledgeEntry>, StorageError> {
        self.inner.knowledge_by_content(content).await
    }
    async fn update_solution(
        &self,
        knowledge_id: u64,
        solution: &str,
    ) -> Result<Option<KnowledgeEntry>, StorageError> {
        self.inner.update_solution(knowledge_id, solution).await
    }
    async fn insert_conversation(&self, log_id: u64) -> Result<Conversation, StorageError> {
        self.inner.insert_conversation(log_id).await
    }
    async fn conversation(&self, conversation_id: u64) -> Result<Option<Conversation>, StorageError> {
        self.inner.conversation(conversation_id).await
    }
    async fn conversation_for_log(&self, log_id: u64) -> Result<Option<Conversation>, StorageError> {
        self.inner.conversation_for_log(log_id).await
    }
    async fn insert_message(
        &self,
        conversation_id: u64,
        message: NewMessage,
    ) -> Result<Message, StorageError> {
        self.inner.insert_message(conversation_id, message).await
    }
    async fn messages(&self, conversation_id: u64) -> Result<Vec<Message>, StorageError> {
        self.inner.messages(conversation_id).await
    }
}

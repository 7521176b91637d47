use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{StorageError, Store};
use crate::models::knowledge::content_matches;
use crate::models::{
    Conversation, ErrorFilter, ErrorRecord, KnowledgeEntry, Log, Machine, Message, NewKnowledgeEntry,
    NewLog, NewMessage, ProcessedLog, Sentiment,
};

#[derive(Default)]
struct Tables {
    machines: BTreeMap<u64, Machine>,
    logs: BTreeMap<u64, Log>,
    processed: BTreeMap<u64, ProcessedLog>,
    knowledge: BTreeMap<u64, KnowledgeEntry>,
    conversations: BTreeMap<u64, Conversation>,
    messages: BTreeMap<u64, Message>,
}

fn next_id<V>(table: &BTreeMap<u64, V>) -> u64 {
    table.keys().next_back().map_or(1, |last| last + 1)
}

/// In-process store for local runs and tests. Ids start at 1 per table.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|_| StorageError::Other("memory store lock poisoned".into()))
    }
}

impl Tables {
    fn with_machine_name(&self, mut entry: KnowledgeEntry) -> KnowledgeEntry {
        entry.machine_name = self
            .machines
            .get(&entry.machine_id)
            .map(|m| m.machine_name.clone());
        entry
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StorageError> {
        self.lock().map(|_| ())
    }

    async fn insert_machine(&self, machine_name: &str) -> Result<Machine, StorageError> {
        let mut t = self.lock()?;
        let machine = Machine {
            machine_id: next_id(&t.machines),
            machine_name: machine_name.to_string(),
        };
        t.machines.insert(machine.machine_id, machine.clone());
        Ok(machine)
    }

    async fn machines(&self) -> Result<Vec<Machine>, StorageError> {
        Ok(self.lock()?.machines.values().cloned().collect())
    }

    async fn insert_log(&self, log: NewLog) -> Result<Log, StorageError> {
        let mut t = self.lock()?;
        let log = Log {
            log_id: next_id(&t.logs),
            machine_id: log.machine_id,
            date_created: log.date_created,
            log_content: log.log_content,
        };
        t.logs.insert(log.log_id, log.clone());
        Ok(log)
    }

    async fn log(&self, log_id: u64) -> Result<Option<Log>, StorageError> {
        Ok(self.lock()?.logs.get(&log_id).cloned())
    }

    async fn unprocessed_logs(&self) -> Result<Vec<Log>, StorageError> {
        let t = self.lock()?;
        let processed: HashSet<u64> = t.processed.values().map(|p| p.log_id).collect();
        Ok(t.logs
            .values()
            .filter(|log| !processed.contains(&log.log_id))
            .cloned()
            .collect())
    }

    async fn insert_processed_log(
        &self,
        log_id: u64,
        sentiment: Sentiment,
        resolved: bool,
    ) -> Result<ProcessedLog, StorageError> {
        let mut t = self.lock()?;
        let row = ProcessedLog {
            process_id: next_id(&t.processed),
            log_id,
            sentiment,
            resolved,
        };
        t.processed.insert(row.process_id, row.clone());
        Ok(row)
    }

    async fn processed_log_for(&self, log_id: u64) -> Result<Option<ProcessedLog>, StorageError> {
        Ok(self
            .lock()?
            .processed
            .values()
            .find(|p| p.log_id == log_id)
            .cloned())
    }

    async fn processed_logs(&self) -> Result<Vec<ProcessedLog>, StorageError> {
        Ok(self.lock()?.processed.values().cloned().collect())
    }

    async fn errors(&self, filter: &ErrorFilter) -> Result<Vec<ErrorRecord>, StorageError> {
        let t = self.lock()?;
        let mut out = Vec::new();
        for p in t.processed.values() {
            let Some(log) = t.logs.get(&p.log_id) else { continue };
            let Some(machine) = t.machines.get(&log.machine_id) else { continue };
            let record = ErrorRecord {
                process_id: p.process_id,
                log_id: p.log_id,
                sentiment: p.sentiment,
                resolved: p.resolved,
                date_created: log.date_created,
                log_content: log.log_content.clone(),
                machine_name: machine.machine_name.clone(),
            };
            if filter.matches(&record, log.machine_id) {
                out.push(record);
            }
        }
        Ok(out)
    }

    async fn set_resolved(
        &self,
        process_id: u64,
        resolved: bool,
    ) -> Result<Option<ProcessedLog>, StorageError> {
        let mut t = self.lock()?;
        Ok(t.processed.get_mut(&process_id).map(|p| {
            p.resolved = resolved;
            p.clone()
        }))
    }

    async fn insert_knowledge(&self, entry: NewKnowledgeEntry) -> Result<KnowledgeEntry, StorageError> {
        let mut t = self.lock()?;
        let row = KnowledgeEntry {
            knowledge_id: next_id(&t.knowledge),
            content: entry.content,
            content_type: entry.content_type,
            machine_id: entry.machine_id,
            solution: entry.solution,
            machine_name: None,
        };
        t.knowledge.insert(row.knowledge_id, row.clone());
        Ok(t.with_machine_name(row))
    }

    async fn knowledge_entries(&self) -> Result<Vec<KnowledgeEntry>, StorageError> {
        let t = self.lock()?;
        Ok(t.knowledge
            .values()
            .cloned()
            .map(|e| t.with_machine_name(e))
            .collect())
    }

    async fn knowledge_by_content(&self, content: &str) -> Result<Vec<KnowledgeEntry>, StorageError> {
        let t = self.lock()?;
        Ok(t.knowledge
            .values()
            .filter(|e| content_matches(&e.content, content))
            .cloned()
            .map(|e| t.with_machine_name(e))
            .collect())
    }

    async fn update_solution(
        &self,
        knowledge_id: u64,
        solution: &str,
    ) -> Result<Option<KnowledgeEntry>, StorageError> {
        let mut t = self.lock()?;
        let updated = t.knowledge.get_mut(&knowledge_id).map(|e| {
            e.solution = Some(solution.to_string());
            e.clone()
        });
        Ok(updated.map(|e| t.with_machine_name(e)))
    }

    async fn insert_conversation(&self, log_id: u64) -> Result<Conversation, StorageError> {
        let mut t = self.lock()?;
        let row = Conversation {
            conversation_id: next_id(&t.conversations),
            log_id,
        };
        t.conversations.insert(row.conversation_id, row.clone());
        Ok(row)
    }

    async fn conversation(&self, conversation_id: u64) -> Result<Option<Conversation>, StorageError> {
        Ok(self.lock()?.conversations.get(&conversation_id).cloned())
    }

    async fn conversation_for_log(&self, log_id: u64) -> Result<Option<Conversation>, StorageError> {
        Ok(self
            .lock()?
            .conversations
            .values()
            .find(|c| c.log_id == log_id)
            .cloned())
    }

    async fn insert_message(
        &self,
        conversation_id: u64,
        message: NewMessage,
    ) -> Result<Message, StorageError> {
        let mut t = self.lock()?;
        let row = Message {
            message_id: next_id(&t.messages),
            conversation_id,
            sent_date: message.sent_date,
            role: message.role,
            content: message.content,
        };
        t.messages.insert(row.message_id, row.clone());
        Ok(row)
    }

    async fn messages(&self, conversation_id: u64) -> Result<Vec<Message>, StorageError> {
        Ok(self
            .lock()?
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    async fn seed(store: &MemoryStore, n: usize) -> Vec<Log> {
        let machine = store.insert_machine("prober-01").await.unwrap();
        let mut logs = Vec::new();
        for i in 0..n {
            let log = store
                .insert_log(NewLog {
                    machine_id: machine.machine_id,
                    date_created: Utc::now(),
                    log_content: format!("line {}", i),
                })
                .await
                .unwrap();
            logs.push(log);
        }
        logs
    }

    #[tokio::test]
    async fn unprocessed_is_the_anti_join_on_log_id() {
        let store = MemoryStore::new();
        let logs = seed(&store, 4).await;
        store
            .insert_processed_log(logs[1].log_id, Sentiment::Flagged, false)
            .await
            .unwrap();
        store
            .insert_processed_log(logs[3].log_id, Sentiment::NotFlagged, false)
            .await
            .unwrap();

        let ids: Vec<u64> = store
            .unprocessed_logs()
            .await
            .unwrap()
            .iter()
            .map(|l| l.log_id)
            .collect();
        assert_eq!(ids, vec![logs[0].log_id, logs[2].log_id]);
    }

    #[tokio::test]
    async fn processed_insert_does_not_deduplicate() {
        let store = MemoryStore::new();
        let logs = seed(&store, 1).await;
        store
            .insert_processed_log(logs[0].log_id, Sentiment::NotFlagged, false)
            .await
            .unwrap();
        store
            .insert_processed_log(logs[0].log_id, Sentiment::NotFlagged, false)
            .await
            .unwrap();
        assert_eq!(store.processed_logs().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn error_filters_combine() {
        let store = MemoryStore::new();
        let logs = seed(&store, 3).await;
        let other = store.insert_machine("handler-02").await.unwrap();
        let foreign = store
            .insert_log(NewLog {
                machine_id: other.machine_id,
                date_created: Utc::now(),
                log_content: "TEMP ALARM".into(),
            })
            .await
            .unwrap();
        for log in logs.iter().chain(std::iter::once(&foreign)) {
            store
                .insert_processed_log(log.log_id, Sentiment::Flagged, false)
                .await
                .unwrap();
        }
        store.set_resolved(1, true).await.unwrap();

        let by_machine = store
            .errors(&ErrorFilter {
                machine_name: Some("handler-02".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_machine.len(), 1);
        assert_eq!(by_machine[0].log_content, "TEMP ALARM");

        let open = store
            .errors(&ErrorFilter {
                resolved: Some(false),
                sentiment: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(open.len(), 3);
    }

    #[tokio::test]
    async fn knowledge_lookup_is_case_insensitive_substring() {
        let store = MemoryStore::new();
        let machine = store.insert_machine("prober-01").await.unwrap();
        store
            .insert_knowledge(NewKnowledgeEntry {
                content: "Probe card contact FAILURE on site 3".into(),
                content_type: "error".into(),
                machine_id: machine.machine_id,
                solution: Some("Clean the probe card".into()),
            })
            .await
            .unwrap();

        let hits = store.knowledge_by_content("contact failure").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].machine_name.as_deref(), Some("prober-01"));
        assert!(store.knowledge_by_content("vacuum").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_resolved_on_unknown_id_is_none() {
        let store = MemoryStore::new();
        assert!(store.set_resolved(42, true).await.unwrap().is_none());
    }
}

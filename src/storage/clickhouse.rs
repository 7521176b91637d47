use async_trait::async_trait;
use clickhouse::{Client, Row};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{StorageError, Store};
use crate::config::AppConfig;
use crate::models::log::{from_millis, to_millis};
use crate::models::{
    Conversation, ErrorFilter, ErrorRecord, KnowledgeEntry, Log, Machine, Message, NewKnowledgeEntry,
    NewLog, NewMessage, ProcessedLog, Role, Sentiment,
};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS machines (
        machine_id UInt64,
        machine_name String
    ) ENGINE = MergeTree() ORDER BY machine_id",
    "CREATE TABLE IF NOT EXISTS logs (
        log_id UInt64,
        machine_id UInt64,
        date_created DateTime64(3),
        log_content String
    ) ENGINE = MergeTree() ORDER BY log_id",
    "CREATE TABLE IF NOT EXISTS processed_logs (
        process_id UInt64,
        log_id UInt64,
        sentiment UInt8,
        resolved Bool DEFAULT false
    ) ENGINE = MergeTree() ORDER BY process_id",
    "CREATE TABLE IF NOT EXISTS knowledge_base (
        knowledge_id UInt64,
        content String,
        content_type String,
        machine_id UInt64,
        solution Nullable(String)
    ) ENGINE = MergeTree() ORDER BY knowledge_id",
    "CREATE TABLE IF NOT EXISTS conversations (
        conversation_id UInt64,
        log_id UInt64
    ) ENGINE = MergeTree() ORDER BY conversation_id",
    "CREATE TABLE IF NOT EXISTS messages (
        message_id UInt64,
        conversation_id UInt64,
        sent_date DateTime64(3),
        role UInt8,
        content String
    ) ENGINE = MergeTree() ORDER BY message_id",
];

#[derive(Row, Serialize, Deserialize)]
struct MachineRow {
    machine_id: u64,
    machine_name: String,
}

#[derive(Row, Serialize, Deserialize)]
struct LogRow {
    log_id: u64,
    machine_id: u64,
    date_created: i64,
    log_content: String,
}

#[derive(Row, Serialize, Deserialize)]
struct ProcessedLogRow {
    process_id: u64,
    log_id: u64,
    sentiment: u8,
    resolved: bool,
}

#[derive(Row, Deserialize)]
struct ErrorRow {
    process_id: u64,
    log_id: u64,
    sentiment: u8,
    resolved: bool,
    date_created: i64,
    log_content: String,
    machine_name: String,
}

#[derive(Row, Serialize, Deserialize)]
struct KnowledgeRow {
    knowledge_id: u64,
    content: String,
    content_type: String,
    machine_id: u64,
    solution: Option<String>,
}

#[derive(Row, Deserialize)]
struct KnowledgeJoinRow {
    knowledge_id: u64,
    content: String,
    content_type: String,
    machine_id: u64,
    solution: Option<String>,
    machine_name: Option<String>,
}

#[derive(Row, Serialize, Deserialize)]
struct ConversationRow {
    conversation_id: u64,
    log_id: u64,
}

#[derive(Row, Serialize, Deserialize)]
struct MessageRow {
    message_id: u64,
    conversation_id: u64,
    sent_date: i64,
    role: u8,
    content: String,
}

impl From<MachineRow> for Machine {
    fn from(r: MachineRow) -> Self {
        Machine {
            machine_id: r.machine_id,
            machine_name: r.machine_name,
        }
    }
}

impl From<LogRow> for Log {
    fn from(r: LogRow) -> Self {
        Log {
            log_id: r.log_id,
            machine_id: r.machine_id,
            date_created: from_millis(r.date_created),
            log_content: r.log_content,
        }
    }
}

impl TryFrom<ProcessedLogRow> for ProcessedLog {
    type Error = StorageError;

    fn try_from(r: ProcessedLogRow) -> Result<Self, Self::Error> {
        Ok(ProcessedLog {
            process_id: r.process_id,
            log_id: r.log_id,
            sentiment: Sentiment::try_from(r.sentiment).map_err(StorageError::Other)?,
            resolved: r.resolved,
        })
    }
}

impl TryFrom<ErrorRow> for ErrorRecord {
    type Error = StorageError;

    fn try_from(r: ErrorRow) -> Result<Self, Self::Error> {
        Ok(ErrorRecord {
            process_id: r.process_id,
            log_id: r.log_id,
            sentiment: Sentiment::try_from(r.sentiment).map_err(StorageError::Other)?,
            resolved: r.resolved,
            date_created: from_millis(r.date_created),
            log_content: r.log_content,
            machine_name: r.machine_name,
        })
    }
}

impl From<KnowledgeJoinRow> for KnowledgeEntry {
    fn from(r: KnowledgeJoinRow) -> Self {
        KnowledgeEntry {
            knowledge_id: r.knowledge_id,
            content: r.content,
            content_type: r.content_type,
            machine_id: r.machine_id,
            solution: r.solution,
            machine_name: r.machine_name,
        }
    }
}

impl From<ConversationRow> for Conversation {
    fn from(r: ConversationRow) -> Self {
        Conversation {
            conversation_id: r.conversation_id,
            log_id: r.log_id,
        }
    }
}

impl TryFrom<MessageRow> for Message {
    type Error = StorageError;

    fn try_from(r: MessageRow) -> Result<Self, Self::Error> {
        Ok(Message {
            message_id: r.message_id,
            conversation_id: r.conversation_id,
            sent_date: from_millis(r.sent_date),
            role: Role::try_from(r.role).map_err(StorageError::Other)?,
            content: r.content,
        })
    }
}

const KNOWLEDGE_SELECT: &str = "SELECT k.knowledge_id, k.content, k.content_type, k.machine_id, \
     k.solution, m.machine_name \
     FROM knowledge_base AS k \
     LEFT JOIN machines AS m ON k.machine_id = m.machine_id";

/// ClickHouse has no auto-increment; ids are handed out from `max(id) + 1`
/// per table, seeded on first use. Assumes one writer process.
#[derive(Default)]
struct IdSequence {
    next: Mutex<HashMap<&'static str, u64>>,
}

impl IdSequence {
    async fn next(&self, client: &Client, table: &'static str, column: &'static str) -> Result<u64, StorageError> {
        let mut next = self.next.lock().await;
        let id = match next.get(table) {
            Some(id) => *id,
            None => {
                let max = client
                    .query(&format!("SELECT max({}) FROM {}", column, table))
                    .fetch_one::<u64>()
                    .await?;
                debug!("Seeded id sequence for {} at {}", table, max + 1);
                max + 1
            }
        };
        next.insert(table, id + 1);
        Ok(id)
    }
}

pub struct ClickHouseStore {
    pub client: Client,
    ids: IdSequence,
}

impl ClickHouseStore {
    pub fn new(config: &AppConfig) -> Self {
        info!("Initializing ClickHouse connection to: {}", config.clickhouse_url);

        // TLS is selected by an https:// URL.
        let client = Client::default()
            .with_url(&config.clickhouse_url)
            .with_user(&config.clickhouse_user)
            .with_password(&config.clickhouse_password)
            .with_compression(clickhouse::Compression::Lz4)
            .with_database(&config.clickhouse_database);

        Self {
            client,
            ids: IdSequence::default(),
        }
    }

    pub async fn init_schema(&self) -> Result<(), StorageError> {
        info!("Creating tables if they don't exist");
        for ddl in SCHEMA {
            self.client.query(ddl).execute().await?;
        }
        info!("Schema ready");
        Ok(())
    }

    async fn insert_row<T: Row + Serialize + Sync>(&self, table: &str, row: &T) -> Result<(), StorageError> {
        let mut insert = self.client.insert(table)?;
        insert.write(row).await?;
        insert.end().await?;
        Ok(())
    }

    async fn knowledge_where<B>(&self, clause: &str, bind: Option<B>) -> Result<Vec<KnowledgeEntry>, StorageError>
    where
        B: Serialize + Send,
    {
        let sql = format!(
            "{} {} ORDER BY k.knowledge_id SETTINGS join_use_nulls = 1",
            KNOWLEDGE_SELECT, clause
        );
        let mut query = self.client.query(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query.fetch_all::<KnowledgeJoinRow>().await?;
        Ok(rows.into_iter().map(KnowledgeEntry::from).collect())
    }
}

#[async_trait]
impl Store for ClickHouseStore {
    async fn ping(&self) -> Result<(), StorageError> {
        self.client.query("SELECT 1").fetch_one::<u8>().await?;
        Ok(())
    }

    async fn insert_machine(&self, machine_name: &str) -> Result<Machine, StorageError> {
        let row = MachineRow {
            machine_id: self.ids.next(&self.client, "machines", "machine_id").await?,
            machine_name: machine_name.to_string(),
        };
        self.insert_row("machines", &row).await?;
        Ok(row.into())
    }

    async fn machines(&self) -> Result<Vec<Machine>, StorageError> {
        let rows = self
            .client
            .query("SELECT ?fields FROM machines ORDER BY machine_id")
            .fetch_all::<MachineRow>()
            .await?;
        Ok(rows.into_iter().map(Machine::from).collect())
    }

    async fn insert_log(&self, log: NewLog) -> Result<Log, StorageError> {
        let row = LogRow {
            log_id: self.ids.next(&self.client, "logs", "log_id").await?,
            machine_id: log.machine_id,
            date_created: to_millis(&log.date_created),
            log_content: log.log_content,
        };
        self.insert_row("logs", &row).await?;
        Ok(row.into())
    }

    async fn log(&self, log_id: u64) -> Result<Option<Log>, StorageError> {
        let row = self
            .client
            .query("SELECT ?fields FROM logs WHERE log_id = ? LIMIT 1")
            .bind(log_id)
            .fetch_optional::<LogRow>()
            .await?;
        Ok(row.map(Log::from))
    }

    async fn unprocessed_logs(&self) -> Result<Vec<Log>, StorageError> {
        let rows = self
            .client
            .query(
                "SELECT ?fields FROM logs \
                 WHERE log_id NOT IN (SELECT log_id FROM processed_logs) \
                 ORDER BY log_id",
            )
            .fetch_all::<LogRow>()
            .await?;
        Ok(rows.into_iter().map(Log::from).collect())
    }

    async fn insert_processed_log(
        &self,
        log_id: u64,
        sentiment: Sentiment,
        resolved: bool,
    ) -> Result<ProcessedLog, StorageError> {
        let row = ProcessedLogRow {
            process_id: self.ids.next(&self.client, "processed_logs", "process_id").await?,
            log_id,
            sentiment: sentiment.as_u8(),
            resolved,
        };
        self.insert_row("processed_logs", &row).await?;
        row.try_into()
    }

    async fn processed_log_for(&self, log_id: u64) -> Result<Option<ProcessedLog>, StorageError> {
        let row = self
            .client
            .query("SELECT ?fields FROM processed_logs WHERE log_id = ? ORDER BY process_id LIMIT 1")
            .bind(log_id)
            .fetch_optional::<ProcessedLogRow>()
            .await?;
        row.map(ProcessedLog::try_from).transpose()
    }

    async fn processed_logs(&self) -> Result<Vec<ProcessedLog>, StorageError> {
        let rows = self
            .client
            .query("SELECT ?fields FROM processed_logs ORDER BY process_id")
            .fetch_all::<ProcessedLogRow>()
            .await?;
        rows.into_iter().map(ProcessedLog::try_from).collect()
    }

    async fn errors(&self, filter: &ErrorFilter) -> Result<Vec<ErrorRecord>, StorageError> {
        let mut sql = String::from(
            "SELECT p.process_id, p.log_id, p.sentiment, p.resolved, \
             l.date_created, l.log_content, m.machine_name \
             FROM processed_logs AS p \
             INNER JOIN logs AS l ON p.log_id = l.log_id \
             INNER JOIN machines AS m ON l.machine_id = m.machine_id \
             WHERE 1",
        );
        if filter.machine_name.is_some() {
            sql.push_str(" AND m.machine_name = ?");
        }
        if filter.machine_id.is_some() {
            sql.push_str(" AND l.machine_id = ?");
        }
        if filter.resolved.is_some() {
            sql.push_str(" AND p.resolved = ?");
        }
        if filter.sentiment.is_some() {
            sql.push_str(" AND p.sentiment = ?");
        }
        sql.push_str(" ORDER BY p.process_id");

        // Binds must follow placeholder order above.
        let mut query = self.client.query(&sql);
        if let Some(name) = &filter.machine_name {
            query = query.bind(name.as_str());
        }
        if let Some(id) = filter.machine_id {
            query = query.bind(id);
        }
        if let Some(resolved) = filter.resolved {
            query = query.bind(resolved);
        }
        if let Some(sentiment) = filter.sentiment {
            query = query.bind(sentiment);
        }
        let rows = query.fetch_all::<ErrorRow>().await?;
        rows.into_iter().map(ErrorRecord::try_from).collect()
    }

    async fn set_resolved(
        &self,
        process_id: u64,
        resolved: bool,
    ) -> Result<Option<ProcessedLog>, StorageError> {
        let exists = self
            .client
            .query("SELECT count() FROM processed_logs WHERE process_id = ?")
            .bind(process_id)
            .fetch_one::<u64>()
            .await?;
        if exists == 0 {
            return Ok(None);
        }
        self.client
            .query(
                "ALTER TABLE processed_logs UPDATE resolved = ? WHERE process_id = ? \
                 SETTINGS mutations_sync = 1",
            )
            .bind(resolved)
            .bind(process_id)
            .execute()
            .await?;
        let row = self
            .client
            .query("SELECT ?fields FROM processed_logs WHERE process_id = ? LIMIT 1")
            .bind(process_id)
            .fetch_optional::<ProcessedLogRow>()
            .await?;
        row.map(ProcessedLog::try_from).transpose()
    }

    async fn insert_knowledge(&self, entry: NewKnowledgeEntry) -> Result<KnowledgeEntry, StorageError> {
        let row = KnowledgeRow {
            knowledge_id: self.ids.next(&self.client, "knowledge_base", "knowledge_id").await?,
            content: entry.content,
            content_type: entry.content_type,
            machine_id: entry.machine_id,
            solution: entry.solution,
        };
        self.insert_row("knowledge_base", &row).await?;
        let mut found = self
            .knowledge_where("WHERE k.knowledge_id = ?", Some(row.knowledge_id))
            .await?;
        Ok(found.pop().unwrap_or(KnowledgeEntry {
            knowledge_id: row.knowledge_id,
            content: row.content,
            content_type: row.content_type,
            machine_id: row.machine_id,
            solution: row.solution,
            machine_name: None,
        }))
    }

    async fn knowledge_entries(&self) -> Result<Vec<KnowledgeEntry>, StorageError> {
        self.knowledge_where::<u64>("", None).await
    }

    async fn knowledge_by_content(&self, content: &str) -> Result<Vec<KnowledgeEntry>, StorageError> {
        self.knowledge_where("WHERE positionCaseInsensitiveUTF8(k.content, ?) > 0", Some(content))
            .await
    }

    async fn update_solution(
        &self,
        knowledge_id: u64,
        solution: &str,
    ) -> Result<Option<KnowledgeEntry>, StorageError> {
        let exists = self
            .client
            .query("SELECT count() FROM knowledge_base WHERE knowledge_id = ?")
            .bind(knowledge_id)
            .fetch_one::<u64>()
            .await?;
        if exists == 0 {
            return Ok(None);
        }
        self.client
            .query(
                "ALTER TABLE knowledge_base UPDATE solution = ? WHERE knowledge_id = ? \
                 SETTINGS mutations_sync = 1",
            )
            .bind(solution)
            .bind(knowledge_id)
            .execute()
            .await?;
        let mut found = self
            .knowledge_where("WHERE k.knowledge_id = ?", Some(knowledge_id))
            .await?;
        Ok(found.pop())
    }

    async fn insert_conversation(&self, log_id: u64) -> Result<Conversation, StorageError> {
        let row = ConversationRow {
            conversation_id: self.ids.next(&self.client, "conversations", "conversation_id").await?,
            log_id,
        };
        self.insert_row("conversations", &row).await?;
        Ok(row.into())
    }

    async fn conversation(&self, conversation_id: u64) -> Result<Option<Conversation>, StorageError> {
        let row = self
            .client
            .query("SELECT ?fields FROM conversations WHERE conversation_id = ? LIMIT 1")
            .bind(conversation_id)
            .fetch_optional::<ConversationRow>()
            .await?;
        Ok(row.map(Conversation::from))
    }

    async fn conversation_for_log(&self, log_id: u64) -> Result<Option<Conversation>, StorageError> {
        let row = self
            .client
            .query("SELECT ?fields FROM conversations WHERE log_id = ? ORDER BY conversation_id LIMIT 1")
            .bind(log_id)
            .fetch_optional::<ConversationRow>()
            .await?;
        Ok(row.map(Conversation::from))
    }

    async fn insert_message(
        &self,
        conversation_id: u64,
        message: NewMessage,
    ) -> Result<Message, StorageError> {
        let row = MessageRow {
            message_id: self.ids.next(&self.client, "messages", "message_id").await?,
            conversation_id,
            sent_date: to_millis(&message.sent_date),
            role: message.role.into(),
            content: message.content,
        };
        self.insert_row("messages", &row).await?;
        row.try_into()
    }

    async fn messages(&self, conversation_id: u64) -> Result<Vec<Message>, StorageError> {
        let rows = self
            .client
            .query("SELECT ?fields FROM messages WHERE conversation_id = ? ORDER BY message_id")
            .bind(conversation_id)
            .fetch_all::<MessageRow>()
            .await?;
        rows.into_iter().map(Message::try_from).collect()
    }
}

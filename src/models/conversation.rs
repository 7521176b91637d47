use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who sent a chat message. Encoded as `0` (assistant) or `1` (user).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(into = "u8", try_from = "u8")]
pub enum Role {
    Assistant,
    User,
}

impl From<Role> for u8 {
    fn from(role: Role) -> u8 {
        match role {
            Role::Assistant => 0,
            Role::User => 1,
        }
    }
}

impl TryFrom<u8> for Role {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Role::Assistant),
            1 => Ok(Role::User),
            other => Err(format!("role must be 0 or 1, got {}", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Conversation {
    pub conversation_id: u64,
    pub log_id: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    pub message_id: u64,
    pub conversation_id: u64,
    pub sent_date: DateTime<Utc>,
    pub role: Role,
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct NewMessage {
    pub sent_date: DateTime<Utc>,
    pub role: Role,
    pub content: String,
}

impl From<&Message> for NewMessage {
    fn from(m: &Message) -> Self {
        Self {
            sent_date: m.sent_date,
            role: m.role,
            content: m.content.clone(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct CreateConversationRequest {
    #[serde(rename = "logId")]
    pub log_id: u64,
    #[serde(default)]
    pub messages: Option<Vec<NewMessage>>,
}

use serde::{ Serialize, Deserialize };
use std::fmt;
use std::str::FromStr;

use crate::error::HistoryError;

/// Speaker of a single chat turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(HistoryError::InvalidRecord(format!("unrecognized role '{}'", other))),
        }
    }
}

/// One stored chat turn. `sequence` is assigned once at insertion time and
/// totally orders the records of a conversation; it is never rewritten.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageRecord {
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    pub sequence: i64,
}

impl MessageRecord {
    pub fn new(conversation_id: &str, role: Role, content: &str, sequence: i64) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            sequence,
        }
    }

    /// Checked before any backend I/O; a rejected record is never partially
    /// written.
    pub fn validate(&self) -> Result<(), HistoryError> {
        if self.conversation_id.trim().is_empty() {
            return Err(HistoryError::InvalidRecord("empty conversation id".to_string()));
        }
        if self.content.trim().is_empty() {
            return Err(HistoryError::InvalidRecord("empty message content".to_string()));
        }
        Ok(())
    }
}

/// Snapshot of one conversation's stored turns, in insertion order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub messages: Vec<MessageRecord>,
}

/// A `(role, content)` pair as handed to the chat model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: Role, content: &str) -> Self {
        Self { role, content: content.to_string() }
    }
}

impl From<&MessageRecord> for PromptMessage {
    fn from(record: &MessageRecord) -> Self {
        Self {
            role: record.role,
            content: record.content.clone(),
        }
    }
}

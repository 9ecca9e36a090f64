use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::HistoryError;
use crate::models::chat::MessageRecord;
use super::HistoryStore;

/// Shared handle to one conversation's ordered records. Every caller that
/// asks for the same id gets a clone of the same handle, so appends made
/// through one are visible through all others.
pub type ConversationHandle = Arc<RwLock<Vec<MessageRecord>>>;

/// In-process history registry. Constructed once at startup and passed
/// around by `Arc`; entries live for the life of the process. `clear`
/// truncates a conversation but the id stays registered.
pub struct MemoryHistoryStore {
    conversations: RwLock<HashMap<String, ConversationHandle>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
        }
    }

    /// Return the history for `conversation_id`, registering an empty one on
    /// first access. Idempotent: repeated calls hand back the same shared
    /// sequence.
    pub async fn get_or_create(&self, conversation_id: &str) -> ConversationHandle {
        let mut map = self.conversations.write().await;
        map.entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Vec::new())))
            .clone()
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, record: MessageRecord) -> Result<(), HistoryError> {
        record.validate()?;
        let handle = self.get_or_create(&record.conversation_id).await;
        let mut messages = handle.write().await;
        messages.push(record);
        Ok(())
    }

    async fn search(&self, conversation_id: &str) -> Result<Vec<MessageRecord>, HistoryError> {
        let map = self.conversations.read().await;
        match map.get(conversation_id) {
            Some(handle) => Ok(handle.read().await.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn clear(&self, conversation_id: &str) -> Result<(), HistoryError> {
        let map = self.conversations.read().await;
        if let Some(handle) = map.get(conversation_id) {
            handle.write().await.clear();
        }
        Ok(())
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::HistoryError;
use crate::history::HistoryStore;
use crate::models::chat::{ MessageRecord, Role };

/// Supplies the ordered history used as model context and records new turns
/// with their insertion-time sequence position. No windowing happens here;
/// the context is exactly what the store returns.
pub struct ContextProvider {
    store: Arc<dyn HistoryStore>,
    sequences: Mutex<HashMap<String, i64>>,
}

impl ContextProvider {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            store,
            sequences: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_context(
        &self,
        conversation_id: &str
    ) -> Result<Vec<MessageRecord>, HistoryError> {
        self.store.search(conversation_id).await
    }

    /// Build the record at the next sequence position and append it. If the
    /// append fails the record is not committed; the caller decides whether
    /// to retry or notify.
    pub async fn record_turn(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str
    ) -> Result<MessageRecord, HistoryError> {
        let sequence = self.next_sequence(conversation_id).await?;
        let record = MessageRecord::new(conversation_id, role, content, sequence);
        self.store.append(record.clone()).await?;
        Ok(record)
    }

    pub async fn clear(&self, conversation_id: &str) -> Result<(), HistoryError> {
        self.store.clear(conversation_id).await
    }

    /// Microsecond wall-clock stamp, bumped past the previous value whenever
    /// the clock would repeat or run backwards, so positions within one
    /// conversation are strictly increasing and never reused. The first turn
    /// of a conversation seeds the counter from the stored maximum, letting
    /// persisted conversations resume without collisions.
    async fn next_sequence(&self, conversation_id: &str) -> Result<i64, HistoryError> {
        let mut sequences = self.sequences.lock().await;

        let last = match sequences.get(conversation_id) {
            Some(last) => *last,
            None => {
                let stored = self.store.search(conversation_id).await?;
                stored
                    .iter()
                    .map(|r| r.sequence)
                    .max()
                    .unwrap_or(0)
            }
        };

        let next = Utc::now().timestamp_micros().max(last + 1);
        sequences.insert(conversation_id.to_string(), next);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistoryStore;

    fn provider() -> (Arc<MemoryHistoryStore>, ContextProvider) {
        let store = Arc::new(MemoryHistoryStore::new());
        let provider = ContextProvider::new(store.clone());
        (store, provider)
    }

    #[tokio::test]
    async fn sequences_are_strictly_increasing() {
        let (_, provider) = provider();

        let mut last = 0;
        for i in 0..10 {
            let record = provider
                .record_turn("c1", Role::User, &format!("mensaje {}", i)).await
                .unwrap();
            assert!(record.sequence > last);
            last = record.sequence;
        }
    }

    #[tokio::test]
    async fn context_comes_back_in_recorded_order() {
        let (_, provider) = provider();

        provider.record_turn("c1", Role::User, "Hola").await.unwrap();
        provider
            .record_turn("c1", Role::Assistant, "Hola, ¿en qué puedo ayudarte?").await
            .unwrap();

        let context = provider.get_context("c1").await.unwrap();
        assert_eq!(context.len(), 2);
        assert_eq!(context[0].role, Role::User);
        assert_eq!(context[1].role, Role::Assistant);
        assert!(provider.get_context("c2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fresh_provider_resumes_past_stored_sequences() {
        let (store, provider) = provider();
        let first = provider.record_turn("c1", Role::User, "antes").await.unwrap();

        // A restarted process sees the same store but an empty counter map.
        let resumed = ContextProvider::new(store);
        let second = resumed.record_turn("c1", Role::User, "después").await.unwrap();
        assert!(second.sequence > first.sequence);
    }

    #[tokio::test]
    async fn invalid_content_is_not_committed() {
        let (_, provider) = provider();
        provider.record_turn("c1", Role::User, "hola").await.unwrap();

        let result = provider.record_turn("c1", Role::User, "   ").await;
        assert!(matches!(result, Err(HistoryError::InvalidRecord(_))));
        assert_eq!(provider.get_context("c1").await.unwrap().len(), 1);
    }
}

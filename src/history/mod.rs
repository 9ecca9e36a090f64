mod memory;
mod qdrant;
mod sqlite;

pub use memory::MemoryHistoryStore;
pub use qdrant::QdrantHistoryStore;
pub use sqlite::SqliteHistoryStore;

use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use crate::cli::Args;
use crate::error::{ AgentError, ConfigError, HistoryError };
use crate::llm::embedding::new_client as new_embedding_client;
use crate::llm::LlmConfig;
use crate::models::chat::MessageRecord;

/// Keyed collection of per-conversation message sequences.
///
/// All implementations share the same contract: `append` validates before
/// any I/O and leaves the sequence untouched on failure, `search` returns
/// insertion order (an unknown id yields an empty list, not an error), and
/// `clear` truncates a conversation while keeping its id usable.
///
/// Retrieval semantics differ by backend: the in-memory and SQLite stores
/// give exact recall of everything appended, while the vector-index store
/// answers with an approximate, `top_k`-bounded similarity match. Callers
/// that need the complete history must not assume the backends are
/// interchangeable on that point.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, record: MessageRecord) -> Result<(), HistoryError>;

    async fn search(&self, conversation_id: &str) -> Result<Vec<MessageRecord>, HistoryError>;

    async fn clear(&self, conversation_id: &str) -> Result<(), HistoryError>;
}

/// Build the configured history backend. For the vector backend this also
/// performs the startup collection-presence check, so a missing collection
/// is created (with the configured dimension and metric) before the first
/// write or read is ever attempted.
pub async fn initialize_history_store(args: &Args) -> Result<Arc<dyn HistoryStore>, AgentError> {
    let store: Arc<dyn HistoryStore> = match args.history_type.to_lowercase().as_str() {
        "memory" => Arc::new(MemoryHistoryStore::new()),
        "sqlite" => {
            info!("Chat history stored in SQLite file: {}", args.history_path);
            Arc::new(SqliteHistoryStore::open(&args.history_path)?)
        }
        "qdrant" => {
            if args.history_api_key.trim().is_empty() {
                return Err(
                    ConfigError::MissingValue(
                        "HISTORY_API_KEY is required for the qdrant history backend".to_string()
                    ).into()
                );
            }
            if args.collection.trim().is_empty() {
                return Err(
                    ConfigError::MissingValue(
                        "HISTORY_COLLECTION is required for the qdrant history backend".to_string()
                    ).into()
                );
            }

            let embedding_config = LlmConfig {
                llm_type: args.embedding_llm_type.parse().map_err(ConfigError::Invalid)?,
                base_url: args.embedding_base_url.clone(),
                api_key: Some(args.embedding_api_key.clone()).filter(|k| !k.is_empty()),
                completion_model: None,
                embedding_model: args.embedding_model.clone(),
                timeout_secs: args.llm_timeout_secs,
            };
            let embedding_client = new_embedding_client(&embedding_config)?;

            info!("Chat history stored in Qdrant collection: {}", args.collection);
            let store = QdrantHistoryStore::connect(args, embedding_client).await?;
            Arc::new(store)
        }
        other => {
            return Err(
                ConfigError::Invalid(format!("unsupported history store type: {}", other)).into()
            );
        }
    };

    Ok(store)
}

use std::collections::HashMap;
use std::sync::Arc;

use log::{ info, warn };
use tokio::sync::Mutex;

use crate::cli::Args;
use crate::config::prompt::{ self, PromptConfig };
use crate::context::ContextProvider;
use crate::error::{ AgentError, ConfigError, HistoryError };
use crate::history::{ initialize_history_store, HistoryStore };
use crate::llm::chat::{ new_client as new_chat_client, ChatClient };
use crate::llm::LlmConfig;
use crate::models::chat::{ Conversation, PromptMessage, Role };

/// Where a conversation currently is in its turn cycle. Observable so the
/// UI layer can tell an idle conversation from one mid-turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    RecordingUserTurn,
    InvokingModel,
    RecordingAssistantTurn,
}

/// Result of one completed turn. `persisted` is false when the reply could
/// not be written back to history; the reply is still user-visible.
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    pub reply: String,
    pub persisted: bool,
}

/// Drives one conversation turn end to end: record the user turn, invoke
/// the model on the accumulated context, record the reply. The user turn is
/// always committed before the model sees it, and an assistant turn is only
/// written for a reply that actually arrived, so stored history never gets
/// ahead of or behind the exchange.
pub struct ChatAgent {
    chat_client: Arc<dyn ChatClient>,
    context: ContextProvider,
    prompt_config: Arc<PromptConfig>,
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    phases: Mutex<HashMap<String, TurnPhase>>,
}

impl ChatAgent {
    pub async fn new(args: &Args) -> Result<Self, AgentError> {
        let chat_config = LlmConfig {
            llm_type: args.chat_llm_type.parse().map_err(ConfigError::Invalid)?,
            base_url: args.chat_base_url.clone(),
            api_key: Some(args.chat_api_key.clone()).filter(|k| !k.is_empty()),
            completion_model: args.chat_model.clone(),
            embedding_model: None,
            timeout_secs: args.llm_timeout_secs,
        };
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Type={}, Model={:?}",
            args.chat_llm_type,
            chat_config.completion_model.as_deref().unwrap_or("adapter default")
        );

        let store = initialize_history_store(args).await?;

        let loaded = prompt::load_prompts(args.prompts_path.as_deref())?;
        let prompt_config = match &args.language {
            Some(language) => {
                let mut config = (*loaded).clone();
                config.language = Some(language.clone());
                Arc::new(config)
            }
            None => loaded,
        };

        Ok(Self::from_parts(chat_client, store, prompt_config))
    }

    pub fn from_parts(
        chat_client: Arc<dyn ChatClient>,
        store: Arc<dyn HistoryStore>,
        prompt_config: Arc<PromptConfig>
    ) -> Self {
        Self {
            chat_client,
            context: ContextProvider::new(store),
            prompt_config,
            turn_locks: Mutex::new(HashMap::new()),
            phases: Mutex::new(HashMap::new()),
        }
    }

    /// Run one turn for `conversation_id`. Turns for the same conversation
    /// are serialized; turns for different conversations proceed
    /// independently.
    pub async fn process_turn(
        &self,
        conversation_id: &str,
        input: &str
    ) -> Result<TurnOutcome, AgentError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AgentError::EmptyInput);
        }

        let lock = self.turn_lock(conversation_id).await;
        let _turn = lock.lock().await;

        self.set_phase(conversation_id, TurnPhase::RecordingUserTurn).await;
        if let Err(e) = self.context.record_turn(conversation_id, Role::User, input).await {
            // The model must never see a turn that history does not hold.
            self.set_phase(conversation_id, TurnPhase::Idle).await;
            return Err(e.into());
        }

        self.set_phase(conversation_id, TurnPhase::InvokingModel).await;
        let reply = match self.invoke_model(conversation_id).await {
            Ok(reply) => reply,
            Err(e) => {
                self.set_phase(conversation_id, TurnPhase::Idle).await;
                return Err(e);
            }
        };

        self.set_phase(conversation_id, TurnPhase::RecordingAssistantTurn).await;
        let persisted = match
            self.context.record_turn(conversation_id, Role::Assistant, &reply).await
        {
            Ok(_) => true,
            Err(e) => {
                warn!("Assistant turn for '{}' was not persisted: {}", conversation_id, e);
                false
            }
        };

        self.set_phase(conversation_id, TurnPhase::Idle).await;
        Ok(TurnOutcome { reply, persisted })
    }

    async fn invoke_model(&self, conversation_id: &str) -> Result<String, AgentError> {
        let mut messages = self.prompt_config.system_messages();
        let context = self.context.get_context(conversation_id).await?;
        messages.extend(context.iter().map(PromptMessage::from));

        let completion = self.chat_client.complete(&messages).await?;
        Ok(completion.response)
    }

    pub async fn history(&self, conversation_id: &str) -> Result<Conversation, HistoryError> {
        let messages = self.context.get_context(conversation_id).await?;
        Ok(Conversation {
            id: conversation_id.to_string(),
            messages,
        })
    }

    pub async fn clear_conversation(&self, conversation_id: &str) -> Result<(), HistoryError> {
        self.context.clear(conversation_id).await
    }

    pub async fn phase(&self, conversation_id: &str) -> TurnPhase {
        let phases = self.phases.lock().await;
        phases.get(conversation_id).copied().unwrap_or(TurnPhase::Idle)
    }

    async fn set_phase(&self, conversation_id: &str, phase: TurnPhase) {
        let mut phases = self.phases.lock().await;
        phases.insert(conversation_id.to_string(), phase);
    }

    async fn turn_lock(&self, conversation_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.turn_locks.lock().await;
        locks
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{ AtomicUsize, Ordering };
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::LlmError;
    use crate::history::MemoryHistoryStore;
    use crate::llm::chat::CompletionResponse;
    use crate::models::chat::MessageRecord;

    struct StaticChat {
        reply: &'static str,
    }

    #[async_trait]
    impl ChatClient for StaticChat {
        async fn complete(
            &self,
            _messages: &[PromptMessage]
        ) -> Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse { response: self.reply.to_string() })
        }
    }

    struct FailingChat;

    #[async_trait]
    impl ChatClient for FailingChat {
        async fn complete(
            &self,
            _messages: &[PromptMessage]
        ) -> Result<CompletionResponse, LlmError> {
            Err(LlmError::ModelUnavailable("connection refused".to_string()))
        }
    }

    /// Tracks how many completions run at once, to observe turn serialization.
    struct CountingChat {
        current: AtomicUsize,
        max_seen: AtomicUsize,
    }

    #[async_trait]
    impl ChatClient for CountingChat {
        async fn complete(
            &self,
            _messages: &[PromptMessage]
        ) -> Result<CompletionResponse, LlmError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(CompletionResponse { response: "ok".to_string() })
        }
    }

    /// Lets a fixed number of appends through, then refuses.
    struct FlakyStore {
        inner: MemoryHistoryStore,
        appends_left: AtomicUsize,
    }

    #[async_trait]
    impl HistoryStore for FlakyStore {
        async fn append(&self, record: MessageRecord) -> Result<(), HistoryError> {
            if self.appends_left.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_err() {
                return Err(HistoryError::BackendUnavailable("write refused".to_string()));
            }
            self.inner.append(record).await
        }

        async fn search(&self, conversation_id: &str) -> Result<Vec<MessageRecord>, HistoryError> {
            self.inner.search(conversation_id).await
        }

        async fn clear(&self, conversation_id: &str) -> Result<(), HistoryError> {
            self.inner.clear(conversation_id).await
        }
    }

    fn agent_with(chat: Arc<dyn ChatClient>, store: Arc<dyn HistoryStore>) -> ChatAgent {
        ChatAgent::from_parts(chat, store, Arc::new(PromptConfig::default()))
    }

    #[tokio::test]
    async fn turn_records_user_then_assistant() {
        let store = Arc::new(MemoryHistoryStore::new());
        let agent = agent_with(Arc::new(StaticChat { reply: "claro" }), store);

        let outcome = agent.process_turn("c1", "Hola").await.unwrap();
        assert_eq!(outcome.reply, "claro");
        assert!(outcome.persisted);

        let history = agent.history("c1").await.unwrap();
        assert_eq!(history.messages.len(), 2);
        assert_eq!(history.messages[0].role, Role::User);
        assert_eq!(history.messages[1].role, Role::Assistant);
        assert_eq!(agent.phase("c1").await, TurnPhase::Idle);
    }

    #[tokio::test]
    async fn model_failure_leaves_only_the_user_turn() {
        let store = Arc::new(MemoryHistoryStore::new());
        let agent = agent_with(Arc::new(FailingChat), store);

        let result = agent.process_turn("c1", "Hola").await;
        assert!(matches!(result, Err(AgentError::Llm(LlmError::ModelUnavailable(_)))));

        let history = agent.history("c1").await.unwrap();
        assert_eq!(history.messages.len(), 1);
        assert_eq!(history.messages[0].role, Role::User);
        assert_eq!(agent.phase("c1").await, TurnPhase::Idle);
    }

    #[tokio::test]
    async fn empty_input_changes_nothing() {
        let store = Arc::new(MemoryHistoryStore::new());
        let agent = agent_with(Arc::new(StaticChat { reply: "claro" }), store);

        let result = agent.process_turn("c1", "   ").await;
        assert!(matches!(result, Err(AgentError::EmptyInput)));
        assert!(agent.history("c1").await.unwrap().messages.is_empty());
        assert_eq!(agent.phase("c1").await, TurnPhase::Idle);
    }

    #[tokio::test]
    async fn unpersisted_reply_is_still_returned() {
        // One append allowed: the user turn lands, the assistant turn fails.
        let store = Arc::new(FlakyStore {
            inner: MemoryHistoryStore::new(),
            appends_left: AtomicUsize::new(1),
        });
        let agent = agent_with(Arc::new(StaticChat { reply: "claro" }), store);

        let outcome = agent.process_turn("c1", "Hola").await.unwrap();
        assert_eq!(outcome.reply, "claro");
        assert!(!outcome.persisted);

        let history = agent.history("c1").await.unwrap();
        assert_eq!(history.messages.len(), 1);
        assert_eq!(history.messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn turns_on_one_conversation_are_serialized() {
        let chat = Arc::new(CountingChat {
            current: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
        });
        let store = Arc::new(MemoryHistoryStore::new());
        let agent = Arc::new(agent_with(chat.clone(), store));

        let a = tokio::spawn({
            let agent = agent.clone();
            async move { agent.process_turn("c1", "uno").await }
        });
        let b = tokio::spawn({
            let agent = agent.clone();
            async move { agent.process_turn("c1", "dos").await }
        });

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(chat.max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(agent.history("c1").await.unwrap().messages.len(), 4);
    }
}

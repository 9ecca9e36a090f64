pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{ ConfigError, LlmError };
use crate::models::chat::PromptMessage;
use super::{ LlmConfig, LlmType };
use self::ollama::OllamaChatClient;
use self::openai::OpenAIChatClient;

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

/// Opaque chat-model collaborator: ordered `(role, content)` pairs in,
/// assistant text out, `ModelUnavailable` on failure or timeout.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<CompletionResponse, LlmError>;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, ConfigError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::Ollama => Arc::new(OllamaChatClient::from_config(config)?),
        LlmType::OpenAI => Arc::new(OpenAIChatClient::from_config(config)?),
    };
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_without_key_is_a_config_error() {
        let config = LlmConfig {
            llm_type: LlmType::OpenAI,
            ..Default::default()
        };
        assert!(matches!(new_client(&config), Err(ConfigError::MissingValue(_))));
    }

    #[test]
    fn ollama_needs_no_key() {
        let config = LlmConfig::default();
        assert!(new_client(&config).is_ok());
    }
}

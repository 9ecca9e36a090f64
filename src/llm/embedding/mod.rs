pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{ ConfigError, LlmError };
use super::{ LlmConfig, LlmType };
use self::ollama::OllamaEmbeddingClient;
use self::openai::OpenAIEmbeddingClient;

#[derive(Debug, Clone)]
pub struct EmbeddingResponse {
    pub embedding: Vec<f32>,
}

/// Text in, fixed-length vector out; `EmbeddingUnavailable` on failure.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<EmbeddingResponse, LlmError>;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn EmbeddingClient>, ConfigError> {
    let client: Arc<dyn EmbeddingClient> = match config.llm_type {
        LlmType::Ollama => Arc::new(OllamaEmbeddingClient::from_config(config)?),
        LlmType::OpenAI => Arc::new(OpenAIEmbeddingClient::from_config(config)?),
    };
    Ok(client)
}

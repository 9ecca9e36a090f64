use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };

use crate::error::{ ConfigError, LlmError };
use crate::llm::LlmConfig;
use super::{ EmbeddingClient, EmbeddingResponse };

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "nomic-embed-text";

#[derive(Debug)]
pub struct OllamaEmbeddingClient {
    http: HttpClient,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbedding {
    embedding: Vec<f32>,
}

impl OllamaEmbeddingClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, ConfigError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: config.embedding_model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<EmbeddingResponse, LlmError> {
        let url = format!("{}/api/embeddings", self.base_url.trim_end_matches('/'));
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self.http
            .post(&url)
            .json(&request)
            .send().await
            .and_then(|r| r.error_for_status())
            .map_err(|e| LlmError::EmbeddingUnavailable(format!("ollama embedding failed: {}", e)))?;

        let data: OllamaEmbedding = response
            .json().await
            .map_err(|e| {
                LlmError::EmbeddingUnavailable(format!("undecodable embedding response: {}", e))
            })?;

        Ok(EmbeddingResponse { embedding: data.embedding })
    }
}

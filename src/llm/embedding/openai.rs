use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };

use crate::error::{ ConfigError, LlmError };
use crate::llm::LlmConfig;
use super::{ EmbeddingClient, EmbeddingResponse };

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "text-embedding-3-small";

#[derive(Debug)]
pub struct OpenAIEmbeddingClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct OpenAIEmbedding {
    data: Vec<EmbeddingData>,
}

impl OpenAIEmbeddingClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, ConfigError> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ConfigError::MissingValue(
                    "EMBEDDING_API_KEY is required for the openai provider".to_string()
                )
            })?;

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model: config.embedding_model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl EmbeddingClient for OpenAIEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<EmbeddingResponse, LlmError> {
        let url = format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'));
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self.http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send().await
            .and_then(|r| r.error_for_status())
            .map_err(|e| LlmError::EmbeddingUnavailable(format!("openai embedding failed: {}", e)))?;

        let data: OpenAIEmbedding = response
            .json().await
            .map_err(|e| {
                LlmError::EmbeddingUnavailable(format!("undecodable embedding response: {}", e))
            })?;

        let embedding = data.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                LlmError::EmbeddingUnavailable("openai returned no embedding".to_string())
            })?;

        Ok(EmbeddingResponse { embedding })
    }
}

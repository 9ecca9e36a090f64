use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };

use crate::error::{ ConfigError, LlmError };
use crate::models::chat::PromptMessage;
use crate::llm::LlmConfig;
use super::{ ChatClient, CompletionResponse };

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.2:1b";

#[derive(Debug)]
pub struct OllamaChatClient {
    http: HttpClient,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl OllamaChatClient {
    pub fn new(
        base_url: Option<String>,
        model: Option<String>,
        timeout_secs: u64
    ) -> Result<Self, ConfigError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ConfigError> {
        Self::new(config.base_url.clone(), config.completion_model.clone(), config.timeout_secs)
    }
}

#[async_trait]
impl ChatClient for OllamaChatClient {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
        };

        let response = self.http
            .post(&url)
            .json(&request)
            .send().await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::ModelUnavailable(format!("ollama call timed out: {}", e))
                } else {
                    LlmError::ModelUnavailable(format!("ollama call failed: {}", e))
                }
            })?;

        let data: ChatResponse = response
            .json().await
            .map_err(|e| LlmError::ModelUnavailable(format!("undecodable ollama response: {}", e)))?;

        Ok(CompletionResponse { response: data.message.content })
    }
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };

use crate::error::{ ConfigError, LlmError };
use crate::models::chat::PromptMessage;
use crate::llm::LlmConfig;
use super::{ ChatClient, CompletionResponse };

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug)]
pub struct OpenAIChatClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl OpenAIChatClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, ConfigError> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ConfigError::MissingValue("CHAT_API_KEY is required for the openai provider".to_string())
            })?;

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model: config.completion_model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.model,
            messages,
        };

        let response = self.http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send().await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::ModelUnavailable(format!("openai call timed out: {}", e))
                } else {
                    LlmError::ModelUnavailable(format!("openai call failed: {}", e))
                }
            })?;

        let data: ChatResponse = response
            .json().await
            .map_err(|e| LlmError::ModelUnavailable(format!("undecodable openai response: {}", e)))?;

        let content = data.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::ModelUnavailable("openai returned no choices".to_string()))?;

        Ok(CompletionResponse { response: content })
    }
}

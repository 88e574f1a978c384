//! OpenAI-compatible chat completions client.
//!
//! Targets local servers that expose `/v1/chat/completions` (LM Studio,
//! llama.cpp server, vLLM) as well as hosted endpoints when an API key is set.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::retry::{retry_with_backoff, RetryPolicy};
use grounded_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_LMSTUDIO_URL: &str = "http://localhost:1234";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const DEFAULT_MAX_TOKENS: u32 = 256;
const MIN_TEMPERATURE: f32 = 0.1;
const MAX_TEMPERATURE: f32 = 1.0;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Client for OpenAI-style chat completion servers.
pub struct OpenAiCompatClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
    request_timeout: Duration,
    retry: RetryPolicy,
}

impl OpenAiCompatClient {
    /// Client for a local LM Studio server.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_LMSTUDIO_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            client: reqwest::Client::new(),
            request_timeout: Duration::from_secs(300),
            retry: RetryPolicy::default(),
        }
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn to_chat_request(&self, request: &LlmRequest) -> ChatRequest {
        let system = request
            .system
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        ChatRequest {
            model: request.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
            temperature: request
                .temperature
                .map(|t| t.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            stream: false,
        }
    }

    fn convert_response(&self, response: ChatResponse, requested_model: &str) -> AppResult<LlmResponse> {
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            AppError::Generation("Invalid response format: no choices returned".to_string())
        })?;

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content: choice.message.content.trim().to_string(),
            model: response.model.unwrap_or_else(|| requested_model.to_string()),
            usage,
        })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn complete_once(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .authorize(self.client.post(&url))
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                AppError::Generation(format!("Request to local model at {} failed: {}", url, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Generation(format!(
                "Chat completion error ({}): {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to parse chat completion: {}", e)))
    }
}

impl Default for OpenAiCompatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiCompatClient {
    fn provider_name(&self) -> &str {
        "openai-compatible"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, url = %self.base_url, "Sending chat completion");

        let chat_request = self.to_chat_request(request);
        let response = retry_with_backoff(&self.retry, "Chat completion", || {
            self.complete_once(&chat_request)
        })
        .await?;

        self.convert_response(response, &request.model)
    }

    async fn health_check(&self) -> AppResult<()> {
        let url = format!("{}/v1/models", self.base_url);
        let response = self
            .authorize(self.client.get(&url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| {
                AppError::Generation(format!(
                    "Local model service is unavailable at {}: {}",
                    self.base_url, e
                ))
            })?;

        if !response.status().is_success() {
            return Err(AppError::Generation(format!(
                "Model list request failed ({})",
                response.status()
            )));
        }
        Ok(())
    }
}

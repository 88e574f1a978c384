//! LLM provider factory.
//!
//! Resolves a provider name, endpoint and secret into a concrete client.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiCompatClient};
use crate::types::ProviderType;
use grounded_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "openai-compatible", "lmstudio")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - Optional bearer token for OpenAI-compatible servers
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    let base_url = endpoint.unwrap_or(provider_type.default_endpoint());

    match provider_type {
        ProviderType::Ollama => Ok(Arc::new(OllamaClient::with_base_url(base_url))),
        ProviderType::OpenAiCompatible => {
            let mut client = OpenAiCompatClient::with_base_url(base_url);
            if let Some(key) = api_key {
                client = client.with_api_key(key);
            }
            Ok(Arc::new(client))
        }
    }
}

/// Create the generation client described by the application config.
pub fn create_client_from_config(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(&config.provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", config.provider)))?;

    let provider_config = config.get_provider_config(&config.provider);
    let endpoint = config
        .endpoint
        .as_deref()
        .unwrap_or(provider_type.default_endpoint());
    let timeout = provider_config
        .and_then(|p| p.timeout)
        .map(Duration::from_secs);

    tracing::debug!(provider = provider_type.as_str(), endpoint, "Creating LLM client");

    let client: Arc<dyn LlmClient> = match provider_type {
        ProviderType::Ollama => {
            let mut client = OllamaClient::with_base_url(endpoint);
            if let Some(timeout) = timeout {
                client = client.with_timeout(timeout);
            }
            Arc::new(client)
        }
        ProviderType::OpenAiCompatible => {
            let mut client = OpenAiCompatClient::with_base_url(endpoint);
            if let Some(key) = config.resolve_api_key(&config.provider) {
                client = client.with_api_key(key);
            }
            if let Some(timeout) = timeout {
                client = client.with_timeout(timeout);
            }
            Arc::new(client)
        }
    };

    Ok(client)
}

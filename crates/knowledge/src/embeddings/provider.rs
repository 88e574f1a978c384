//! Embedding provider trait and factory.

use super::config::EmbeddingIdentity;
use super::providers::{trigram::TRIGRAM_MODEL, OllamaProvider, TrigramProvider};
use grounded_core::{AppError, AppResult, EmbeddingSettings};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }

    fn identity(&self) -> EmbeddingIdentity {
        EmbeddingIdentity::new(self.provider_name(), self.model_name(), self.dimensions())
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(settings: &EmbeddingSettings) -> AppResult<Arc<dyn EmbeddingProvider>> {
    if settings.dimensions == 0 {
        return Err(AppError::Config(
            "Embedding dimensions must be positive".to_string(),
        ));
    }

    match settings.provider.as_str() {
        "trigram" => {
            if settings.model != TRIGRAM_MODEL {
                return Err(AppError::Config(format!(
                    "Trigram provider only supports model '{}', got '{}'",
                    TRIGRAM_MODEL, settings.model
                )));
            }
            Ok(Arc::new(TrigramProvider::new(settings.dimensions)))
        }

        "ollama" => {
            let provider = OllamaProvider::new(
                settings.model.clone(),
                settings.dimensions,
                settings.endpoint.as_deref(),
            )?;
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: trigram, ollama",
            settings.provider
        ))),
    }
}

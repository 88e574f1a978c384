//! Embedding engine.
//!
//! Provider-agnostic embedding generation. The provider/model/dimension
//! triple travels with every stored vector as an [`EmbeddingIdentity`].

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingIdentity;
pub use provider::{create_provider, EmbeddingProvider};

use grounded_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Embedding calls bounded by a timeout.
#[derive(Debug, Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    timeout: Duration,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn identity(&self) -> EmbeddingIdentity {
        self.provider.identity()
    }

    /// Embed one text; expiry becomes `AppError::Timeout`.
    pub async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let embedding = tokio::time::timeout(self.timeout, self.provider.embed(text))
            .await
            .map_err(|_| AppError::timeout("embedding", self.timeout.as_secs()))??;

        if embedding.len() != self.provider.dimensions() {
            return Err(AppError::Embedding(format!(
                "{} returned {} dimensions, expected {}",
                self.identity(),
                embedding.len(),
                self.provider.dimensions()
            )));
        }

        Ok(embedding)
    }
}

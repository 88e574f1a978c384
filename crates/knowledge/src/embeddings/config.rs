//! Embedding identity recorded alongside stored vectors.

use grounded_core::{AppError, AppResult, EmbeddingSettings};
use serde::{Deserialize, Serialize};

/// Which embedder produced a set of vectors.
///
/// Vectors from different identities are not comparable, so the identity is
/// stored with every index snapshot and checked at load and query time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbeddingIdentity {
    /// Provider name: "trigram", "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,
}

impl EmbeddingIdentity {
    pub fn new(provider: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            dimensions,
        }
    }

    pub fn from_settings(settings: &EmbeddingSettings) -> Self {
        Self::new(&settings.provider, &settings.model, settings.dimensions)
    }

    /// Describe the first difference between `self` and `other`, if any.
    pub fn mismatch(&self, other: &Self) -> Option<String> {
        if self.provider != other.provider {
            return Some(format!(
                "provider mismatch: expected '{}', got '{}'",
                self.provider, other.provider
            ));
        }

        if self.model != other.model {
            return Some(format!(
                "model mismatch: expected '{}', got '{}'",
                self.model, other.model
            ));
        }

        if self.dimensions != other.dimensions {
            return Some(format!(
                "dimension mismatch: expected {}, got {}",
                self.dimensions, other.dimensions
            ));
        }

        None
    }

    /// Validate that another identity is consistent with this one.
    ///
    /// A mismatch here means the stored index cannot be used with the
    /// configured embedder and is reported as a configuration error.
    pub fn validate_consistency(&self, other: &Self) -> AppResult<()> {
        match self.mismatch(other) {
            Some(detail) => Err(AppError::Config(format!(
                "Embedding identity {}; re-ingest the documents or restore the previous embedding settings",
                detail
            ))),
            None => Ok(()),
        }
    }
}

impl std::fmt::Display for EmbeddingIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({}d)", self.provider, self.model, self.dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_default_settings() {
        let identity = EmbeddingIdentity::from_settings(&EmbeddingSettings::default());
        assert_eq!(identity, EmbeddingIdentity::new("trigram", "trigram-v1", 384));
        assert_eq!(identity.to_string(), "trigram/trigram-v1 (384d)");
    }

    #[test]
    fn test_validate_consistency_success() {
        let a = EmbeddingIdentity::new("trigram", "trigram-v1", 384);
        assert!(a.validate_consistency(&a.clone()).is_ok());
    }

    #[test]
    fn test_validate_consistency_provider_mismatch() {
        let a = EmbeddingIdentity::new("trigram", "trigram-v1", 384);
        let b = EmbeddingIdentity::new("ollama", "trigram-v1", 384);

        let err = a.validate_consistency(&b).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("provider mismatch"));
    }

    #[test]
    fn test_validate_consistency_dimension_mismatch() {
        let a = EmbeddingIdentity::new("ollama", "nomic-embed-text", 768);
        let b = EmbeddingIdentity::new("ollama", "nomic-embed-text", 384);

        let result = a.validate_consistency(&b);
        assert!(result.unwrap_err().to_string().contains("dimension mismatch"));
    }
}

//! Provider identification.

use crate::providers::ollama::DEFAULT_OLLAMA_URL;
use crate::providers::openai_compat::DEFAULT_LMSTUDIO_URL;

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Ollama,
    OpenAiCompatible,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai-compatible" | "openai" | "lmstudio" | "lm-studio" => {
                Some(Self::OpenAiCompatible)
            }
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAiCompatible => "openai-compatible",
        }
    }

    /// Endpoint used when none is configured.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Ollama => DEFAULT_OLLAMA_URL,
            Self::OpenAiCompatible => DEFAULT_LMSTUDIO_URL,
        }
    }
}

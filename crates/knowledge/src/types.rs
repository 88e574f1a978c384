//! Knowledge system type definitions.

use crate::chunk::Chunk;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A document handed to ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier; re-ingesting the same id replaces its chunks
    pub source_id: String,

    /// Full extracted text
    pub text: String,

    /// Attached to every chunk (path, title, page, ...)
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Document {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A chunk paired with its embedding, ready for the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,

    /// Cosine similarity clamped to `[0, 1]`
    pub score: f32,

    /// 1-based position in the result list
    pub rank: usize,
}

/// Ordered search results, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub candidates: Vec<RetrievedChunk>,
}

impl RetrievalResult {
    pub fn new(candidates: Vec<RetrievedChunk>) -> Self {
        Self { candidates }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn best_score(&self) -> Option<f32> {
        self.candidates.first().map(|c| c.score)
    }
}

/// A chunk that could not be embedded or stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkFailure {
    pub chunk_id: String,
    pub position: u32,
    pub reason: String,
}

/// Result of a single `IndexManager::add`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddOutcome {
    pub committed: usize,
    pub failures: Vec<ChunkFailure>,
}

/// Result of ingesting one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionReport {
    pub source_id: String,

    /// Chunks produced by the chunker
    pub chunks_created: usize,

    /// Chunks now searchable
    pub committed: usize,

    /// Chunks discarded for falling below the minimum length
    pub dropped_short: usize,

    /// Chunks previously stored for this source and replaced
    pub replaced: usize,

    pub failures: Vec<ChunkFailure>,
}

impl IngestionReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Per-source summary of the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub source_id: String,
    pub chunk_count: usize,
    pub indexed_at: DateTime<Utc>,
}

/// Index counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub sources: usize,
    pub chunks: usize,
    pub dimensions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Ok,
    Degraded,
}

/// Health report for the whole service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: ServiceStatus,
    pub chunks: usize,
    pub sources: usize,
    pub dimensions: usize,
    pub embedding_provider: String,
    pub embedding_model: String,
    pub llm_provider: String,
    pub llm_reachable: bool,

    /// Why the service is degraded, if it is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_builder() {
        let doc = Document::new("policy.pdf", "Refunds are processed within 30 days")
            .with_metadata(serde_json::json!({ "page": 2 }));
        assert_eq!(doc.source_id, "policy.pdf");
        assert_eq!(doc.metadata["page"], 2);
    }

    #[test]
    fn test_health_status_serialization() {
        let health = HealthStatus {
            status: ServiceStatus::Degraded,
            chunks: 0,
            sources: 0,
            dimensions: 384,
            embedding_provider: "trigram".to_string(),
            embedding_model: "trigram-v1".to_string(),
            llm_provider: "ollama".to_string(),
            llm_reachable: false,
            detail: Some("LLM backend unreachable".to_string()),
        };

        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["detail"], "LLM backend unreachable");
    }

    #[test]
    fn test_empty_retrieval() {
        let result = RetrievalResult::default();
        assert!(result.is_empty());
        assert_eq!(result.best_score(), None);
    }
}

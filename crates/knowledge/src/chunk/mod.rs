//! Document chunking.
//!
//! Splits raw document text into overlapping, bounded segments:
//! - Recursive separator hierarchy (paragraph, line, sentence, whitespace, grapheme)
//! - Greedy merge up to the target size with piece-level overlap
//! - Deterministic ids and ordinal positions
//! - Chunks below the minimum length are dropped

mod metadata;
mod pipeline;
mod recursive;

pub use metadata::{calculate_hash, chunk_id};
pub use pipeline::{ChunkConfig, ChunkOutput, ChunkPipeline};
pub use recursive::Separator;

use serde::{Deserialize, Serialize};

/// A stored unit of retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic identifier derived from source, position and text
    pub id: String,

    /// Owning document identifier
    pub source: String,

    /// Ordinal within the source (0-indexed)
    pub position: u32,

    /// Exact slice of the source text
    pub text: String,

    /// Length of the trimmed text in the configured unit
    pub length: usize,

    pub metadata: ChunkMetadata,
}

/// Where a chunk came from and how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Byte range in the original document
    pub byte_range: (usize, usize),

    /// 1-based inclusive line range in the original document
    pub line_range: (usize, usize),

    pub char_count: usize,

    /// SHA-256 hash of chunk text
    pub hash: String,

    /// Finest separator needed to produce this chunk
    pub separator: Separator,

    /// Document-level metadata (path, title, page, ...)
    #[serde(default)]
    pub document: serde_json::Value,
}

impl Chunk {
    /// Page number carried in document metadata, if any.
    pub fn page(&self) -> Option<u64> {
        self.metadata.document.get("page").and_then(|p| p.as_u64())
    }

    /// Trimmed text, as shown to users and counted for length.
    pub fn content(&self) -> &str {
        self.text.trim()
    }
}

/// Build a standalone chunk for tests.
#[cfg(test)]
pub(crate) fn test_chunk(source: &str, position: u32, text: &str) -> Chunk {
    Chunk {
        id: chunk_id(source, position, text),
        source: source.to_string(),
        position,
        text: text.to_string(),
        length: text.trim().chars().count(),
        metadata: ChunkMetadata {
            byte_range: (0, text.len()),
            line_range: (1, 1 + text.trim_end().matches('\n').count()),
            char_count: text.chars().count(),
            hash: calculate_hash(text),
            separator: Separator::Paragraph,
            document: serde_json::Value::Null,
        },
    }
}

//! Read-side index abstraction for knowledge chunks.
//!
//! Defines the trait the retriever searches through.

use crate::embeddings::EmbeddingIdentity;
use crate::types::RetrievalResult;
use grounded_core::AppResult;

/// Trait for vector index backends the retriever can query.
///
/// Searches must run against a consistent view of the index.
pub trait VectorIndex: Send + Sync {
    /// Embedder that produced the stored vectors.
    fn identity(&self) -> &EmbeddingIdentity;

    /// The `top_k` most similar chunks, best first.
    fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<RetrievalResult>;
}

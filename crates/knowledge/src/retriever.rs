//! Query-time retrieval: embed the query, then search the index.

use crate::embeddings::Embedder;
use crate::types::RetrievalResult;
use crate::vector_index::VectorIndex;
use grounded_core::{AppError, AppResult};
use std::sync::Arc;

pub struct Retriever {
    embedder: Embedder,
    index: Arc<dyn VectorIndex>,
    default_top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Embedder, index: Arc<dyn VectorIndex>, default_top_k: usize) -> Self {
        Self {
            embedder,
            index,
            default_top_k,
        }
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Top-k candidates for `query`, best first. No relevance judgement.
    ///
    /// Fails with `AppError::Retrieval` when the query embedder is not the
    /// one that produced the indexed vectors.
    pub async fn retrieve(&self, query: &str, top_k: Option<usize>) -> AppResult<RetrievalResult> {
        let query_identity = self.embedder.identity();
        if let Some(detail) = self.index.identity().mismatch(&query_identity) {
            return Err(AppError::Retrieval(format!(
                "Query embedder {} cannot search index built with {}: {}",
                query_identity,
                self.index.identity(),
                detail
            )));
        }

        let k = top_k.unwrap_or(self.default_top_k);
        let query_vector = self.embedder.embed(query).await.map_err(|e| match e {
            AppError::Timeout { .. } => e,
            other => AppError::Retrieval(format!("Failed to embed query: {}", other)),
        })?;

        let result = self.index.search(&query_vector, k)?;

        tracing::debug!(
            "Retrieved {} candidates (k={}, best score: {:?})",
            result.len(),
            k,
            result.best_score()
        );

        Ok(result)
    }
}

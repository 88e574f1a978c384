//! Document-grounded question answering.
//!
//! Documents are chunked, embedded and kept in an in-memory vector index.
//! Queries are answered from retrieved chunks only when a relevance gate
//! trusts them; otherwise the service says so instead of guessing.
//!
//! # Example
//! ```no_run
//! use grounded_core::AppConfig;
//! use grounded_knowledge::{Document, QaService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = QaService::from_app_config(&AppConfig::load()?)?;
//! service
//!     .ingest(Document::new("refund_policy.md", "Refunds are processed within 30 days."))
//!     .await?;
//!
//! let response = service.query("What is the refund policy?", None, None).await?;
//! println!("{} (grounded: {})", response.answer, response.grounded);
//! # Ok(())
//! # }
//! ```

pub mod chunk;
pub mod config;
pub mod embeddings;
pub mod index;
pub mod parser;
pub mod rag;
pub mod retriever;
pub mod service;
pub mod snapshot;
pub mod text;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

pub use chunk::{Chunk, ChunkConfig, ChunkPipeline};
pub use config::ServiceConfig;
pub use embeddings::{create_provider, Embedder, EmbeddingIdentity, EmbeddingProvider};
pub use index::{IndexManager, IndexSnapshot};
pub use parser::{collect_files, load_document, parse_file, ContentType, ParsedDocument};
pub use rag::{
    FormattedResponse, RelevanceConfig, RelevanceVerdict, RoutingDecision, SourceRef, Strategy,
    VerdictKind,
};
pub use retriever::Retriever;
pub use service::QaService;
pub use types::{
    Document, HealthStatus, IndexStats, IngestionReport, RetrievalResult, RetrievedChunk,
    ServiceStatus, SourceInfo,
};
pub use vector_index::VectorIndex;

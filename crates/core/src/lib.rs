//! Grounded Core Library
//!
//! Foundational utilities shared by every crate in the workspace:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Layered configuration, including the RAG decision knobs

pub mod config;
pub mod error;
pub mod logging;

pub use config::{AppConfig, ChunkUnit, EmbeddingSettings, FallbackSelection, RagSettings};
pub use error::{AppError, AppResult};

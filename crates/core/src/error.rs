//! Error types for the grounded QA service.
//!
//! A single error enum covers every failure category in the workspace:
//! configuration, I/O, ingestion, embedding, retrieval, generation,
//! timeouts and prompt rendering.

use thiserror::Error;

/// Unified error type for the grounded QA service.
///
/// All fallible functions return `Result<T, AppError>`.
/// Nothing on the query path panics; errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unparseable document or failed ingestion batch
    #[error("Ingestion error: {0}")]
    Ingestion(String),

    /// Embedding backend failure or malformed input
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Index unavailable or embedding-model mismatch
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Generative model backend failure
    #[error("Generation error: {0}")]
    Generation(String),

    /// External call exceeded its time budget
    #[error("Timeout: {operation} exceeded {secs}s")]
    Timeout { operation: String, secs: u64 },

    /// Vector index consistency errors
    #[error("Index error: {0}")]
    Index(String),

    /// Prompt loading and rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Caller supplied an invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Build a timeout error for the named operation.
    pub fn timeout(operation: impl Into<String>, secs: u64) -> Self {
        AppError::Timeout {
            operation: operation.into(),
            secs,
        }
    }

    /// Whether the query pipeline may answer with a fallback instead of
    /// surfacing this error to the caller.
    ///
    /// Generation failures and timeouts are recoverable. Retrieval-side
    /// failures are not: a query fails closed rather than answering from
    /// an index it could not consult.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::Generation(_) | AppError::Timeout { .. })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

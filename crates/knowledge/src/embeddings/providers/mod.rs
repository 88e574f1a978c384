//! Concrete embedding backends.

pub mod ollama;
pub mod trigram;

pub use ollama::OllamaProvider;
pub use trigram::TrigramProvider;

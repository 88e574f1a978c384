//! LLM integration crate for the grounded QA service.
//!
//! Provider-agnostic access to generative models behind the `LlmClient`
//! trait.
//!
//! # Providers
//! - **OpenAI-compatible**: LM Studio and other `/v1/chat/completions` servers (default)
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use grounded_llm::{LlmClient, LlmRequest, providers::OpenAiCompatClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiCompatClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama-3.2-3b-instruct");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod retry;
pub mod types;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{create_client, create_client_from_config};
pub use providers::{OllamaClient, OpenAiCompatClient};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use types::ProviderType;

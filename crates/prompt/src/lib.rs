//! Prompt system for the grounded QA service.
//!
//! - YAML prompt definitions, one per answering strategy
//! - Built-in defaults with per-workspace overrides
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

pub use builder::{build_prompt, render_template};
pub use loader::{
    builtin_prompt, list_prompts, load_prompt, resolve_prompt, BASE_PROMPT_ID,
    GROUNDED_PROMPT_ID, HYBRID_PROMPT_ID,
};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptOutputSpec};

//! Prompt loader for built-in and workspace prompt definitions.
//!
//! Every answering strategy has a built-in definition compiled into the
//! binary. A file at `.grounded/prompts/<id>.yml` replaces the built-in
//! definition with the same id.

use crate::types::PromptDefinition;
use grounded_core::{AppError, AppResult};
use std::path::Path;

/// Prompt used when retrieved context is confidently relevant.
pub const GROUNDED_PROMPT_ID: &str = "rag.grounded";

/// Prompt used when context is usable but the answer must be hedged.
pub const HYBRID_PROMPT_ID: &str = "rag.hybrid";

/// Prompt used without any document context.
pub const BASE_PROMPT_ID: &str = "rag.base";

const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    (GROUNDED_PROMPT_ID, include_str!("../prompts/rag.grounded.yml")),
    (HYBRID_PROMPT_ID, include_str!("../prompts/rag.hybrid.yml")),
    (BASE_PROMPT_ID, include_str!("../prompts/rag.base.yml")),
];

/// Parse the built-in definition for `prompt_id`.
pub fn builtin_prompt(prompt_id: &str) -> AppResult<PromptDefinition> {
    let (_, source) = BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("No built-in prompt named '{}'", prompt_id)))?;

    let definition: PromptDefinition = serde_yaml::from_str(source).map_err(|e| {
        AppError::Prompt(format!("Built-in prompt '{}' is invalid: {}", prompt_id, e))
    })?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Load a prompt definition by ID from the workspace.
///
/// Reads `<workspace>/.grounded/prompts/<id>.yml`.
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = workspace_path
        .join(".grounded/prompts")
        .join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file {:?} declares id '{}', expected '{}'",
            prompt_file, definition.id, prompt_id
        )));
    }

    tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Workspace override if present, otherwise the built-in definition.
pub fn resolve_prompt(workspace_path: Option<&Path>, prompt_id: &str) -> AppResult<PromptDefinition> {
    if let Some(workspace) = workspace_path {
        let override_file = workspace
            .join(".grounded/prompts")
            .join(format!("{}.yml", prompt_id));
        if override_file.exists() {
            return load_prompt(workspace, prompt_id);
        }
    }
    builtin_prompt(prompt_id)
}

/// List all prompt override IDs in the workspace.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let prompts_dir = workspace_path.join(".grounded/prompts");

    if !prompts_dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in walkdir::WalkDir::new(&prompts_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

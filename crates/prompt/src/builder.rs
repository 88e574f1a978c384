//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use grounded_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Both the system and user templates are rendered with the same variables.
/// An empty system template yields `system: None`.
///
/// # Example
/// ```no_run
/// use grounded_prompt::{build_prompt, builtin_prompt, GROUNDED_PROMPT_ID};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt(GROUNDED_PROMPT_ID)?;
/// let mut vars = HashMap::new();
/// vars.insert("query".to_string(), "What is the refund policy?".to_string());
/// vars.insert("context".to_string(), "[Document 1]\nRefunds take 30 days.".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let user = render_template(&definition.template, &variables)?;

    let system = if definition.system.trim().is_empty() {
        None
    } else {
        Some(render_template(&definition.system, &variables)?.trim_end().to_string())
    };

    Ok(BuiltPrompt::new(
        system,
        user.trim_end().to_string(),
        definition.id.clone(),
        variables,
    ))
}

/// Render a Handlebars template with variables.
///
/// HTML escaping is disabled; missing variables render as empty strings.
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PromptBehavior, PromptOutputSpec};

    fn create_test_definition(system: &str) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            behavior: PromptBehavior::default(),
            system: system.to_string(),
            template: "Question: {{query}}\n\n{{context}}\n".to_string(),
            output: PromptOutputSpec::default(),
        }
    }

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("topic".to_string(), "refunds & returns".to_string());

        let result = render_template("Nothing about {{topic}}.", &vars).unwrap();
        assert_eq!(result, "Nothing about refunds & returns.");
    }

    #[test]
    fn test_build_prompt_with_system() {
        let def = create_test_definition("Answer about {{query}} only.");
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), "refunds".to_string());
        vars.insert("context".to_string(), "[Document 1]\nRefunds take 30 days.".to_string());

        let built = build_prompt(&def, vars).unwrap();
        assert_eq!(built.system.as_deref(), Some("Answer about refunds only."));
        assert_eq!(
            built.user,
            "Question: refunds\n\n[Document 1]\nRefunds take 30 days."
        );
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
    }

    #[test]
    fn test_build_prompt_without_system() {
        let def = create_test_definition("   ");
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), "hello".to_string());

        let built = build_prompt(&def, vars).unwrap();
        assert!(built.system.is_none());
        assert_eq!(built.user, "Question: hello");
    }

    #[test]
    fn test_render_template_missing_variable() {
        let vars = HashMap::new();
        let result = render_template("Question: {{missing}}", &vars).unwrap();
        assert_eq!(result, "Question: ");
    }

    #[test]
    fn test_render_template_invalid_syntax() {
        let vars = HashMap::new();
        let result = render_template("{{#if}}", &vars);
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }
}

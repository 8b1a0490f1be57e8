//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use std::collections::HashMap;
use webrag_core::{AppError, AppResult};

/// Build a prompt from a definition and input variables.
///
/// Every variable the definition declares must be supplied; values are
/// inserted verbatim (no HTML escaping).
///
/// # Example
/// ```no_run
/// use webrag_prompt::{build_prompt, PromptDefinition};
/// use std::collections::HashMap;
///
/// # fn example(def: PromptDefinition) -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "What is Rust?".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.text);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    if let Some(missing) = definition
        .variables
        .iter()
        .find(|name| !variables.contains_key(name.as_str()))
    {
        return Err(AppError::Prompt(format!(
            "Prompt {} is missing variable '{}'",
            definition.id, missing
        )));
    }

    let rendered = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt::new(rendered, definition.id.clone(), variables))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_definition() -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            description: String::new(),
            variables: vec!["question".to_string()],
            template: "Question: {{question}}".to_string(),
        }
    }

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Hello, world!".to_string());

        let result = render_template("Question: {{question}}", &vars);
        assert_eq!(result.unwrap(), "Question: Hello, world!");
    }

    #[test]
    fn test_no_html_escaping() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "a < b && \"c\"".to_string());

        let built = build_prompt(&create_test_definition(), vars).unwrap();
        assert_eq!(built.text, "Question: a < b && \"c\"");
    }

    #[test]
    fn test_missing_declared_variable() {
        let result = build_prompt(&create_test_definition(), HashMap::new());
        match result {
            Err(AppError::Prompt(msg)) => assert!(msg.contains("question")),
            _ => panic!("Expected prompt error"),
        }
    }

    #[test]
    fn test_render_template_undeclared_variable() {
        let vars = HashMap::new();
        // Handlebars renders unknown variables as empty string
        assert_eq!(render_template("Q: {{missing}}", &vars).unwrap(), "Q: ");
    }
}

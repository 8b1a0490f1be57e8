//! Prompt loader for YAML prompt definitions.
//!
//! Built-in prompts are compiled into the binary. A prompts directory may
//! override any of them (or add new ones) with `<id>.yml` files.

use crate::builder::build_prompt;
use crate::types::{BuiltPrompt, PromptDefinition};
use std::collections::HashMap;
use std::path::Path;
use webrag_core::{AppError, AppResult};

/// Rephrase a question into a short web search query.
pub const SEARCH_REPHRASE: &str = "search.rephrase";
/// Default grounded answer prompt.
pub const ANSWER_GROUNDED: &str = "answer.grounded";
/// First-pass answer prompt including the searched query.
pub const ANSWER_SYSTEM: &str = "answer.system";
/// Replacement question for the regeneration pass.
pub const ANSWER_REGENERATE: &str = "answer.regenerate";

const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    (
        SEARCH_REPHRASE,
        include_str!("../prompts/search.rephrase.yml"),
    ),
    (
        ANSWER_GROUNDED,
        include_str!("../prompts/answer.grounded.yml"),
    ),
    (ANSWER_SYSTEM, include_str!("../prompts/answer.system.yml")),
    (
        ANSWER_REGENERATE,
        include_str!("../prompts/answer.regenerate.yml"),
    ),
];

/// The set of prompt definitions available to a run.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    definitions: HashMap<String, PromptDefinition>,
}

impl PromptLibrary {
    /// Only the compiled-in prompts.
    pub fn builtin() -> AppResult<Self> {
        let mut definitions = HashMap::new();
        for (id, contents) in BUILTIN_PROMPTS {
            let definition = parse_prompt(contents, id)?;
            definitions.insert(definition.id.clone(), definition);
        }
        Ok(Self { definitions })
    }

    /// Built-in prompts, overridden by any definitions found in `prompts_dir`.
    ///
    /// A missing directory is not an error.
    pub fn load(prompts_dir: Option<&Path>) -> AppResult<Self> {
        let mut library = Self::builtin()?;

        let Some(dir) = prompts_dir else {
            return Ok(library);
        };

        for id in list_prompts(dir)? {
            let definition = load_prompt(dir, &id)?;
            tracing::info!(prompt = %definition.id, "Using prompt override");
            library
                .definitions
                .insert(definition.id.clone(), definition);
        }

        Ok(library)
    }

    /// Look up a definition by id.
    pub fn get(&self, id: &str) -> AppResult<&PromptDefinition> {
        self.definitions
            .get(id)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", id)))
    }

    /// Render a prompt by id.
    pub fn render(&self, id: &str, variables: &[(&str, &str)]) -> AppResult<BuiltPrompt> {
        let variables = variables
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        build_prompt(self.get(id)?, variables)
    }

    /// All known prompt ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

/// Load a prompt definition by ID from a prompts directory.
///
/// This function looks for `<id>.yml` (then `<id>.yaml`) in `prompts_dir`.
///
/// # Example
/// ```no_run
/// use webrag_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("prompts"), "answer.grounded")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(prompts_dir: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = ["yml", "yaml"]
        .iter()
        .map(|ext| prompts_dir.join(format!("{}.{}", prompt_id, ext)))
        .find(|p| p.exists())
        .ok_or_else(|| {
            AppError::Prompt(format!(
                "Prompt file not found: {:?}",
                prompts_dir.join(format!("{}.yml", prompt_id))
            ))
        })?;

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    parse_prompt(&contents, &prompt_file.display().to_string())
}

/// List all prompt IDs in a prompts directory.
pub fn list_prompts(prompts_dir: &Path) -> AppResult<Vec<String>> {
    if !prompts_dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in walkdir::WalkDir::new(prompts_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let is_yaml = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yml") | Some("yaml")
        );
        if path.is_file() && is_yaml {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    prompt_ids.sort();
    prompt_ids.dedup();
    Ok(prompt_ids)
}

fn parse_prompt(contents: &str, source: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", source, e)))?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    // Simple x.y check
    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

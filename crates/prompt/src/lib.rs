//! Prompt system for webrag.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions, compiled in and overridable from disk
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{
    list_prompts, load_prompt, PromptLibrary, ANSWER_GROUNDED, ANSWER_REGENERATE, ANSWER_SYSTEM,
    SEARCH_REPHRASE,
};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};

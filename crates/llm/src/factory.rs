//! LLM provider factory.
//!
//! Builds the configured client from [`LlmSettings`].

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use std::sync::Arc;
use webrag_core::{AppError, AppResult, LlmSettings};

/// Create an LLM client from settings.
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown, or
/// `AppError::Llm` if the HTTP client cannot be built.
pub fn create_client(settings: &LlmSettings) -> AppResult<Arc<dyn LlmClient>> {
    let provider = ProviderType::parse(&settings.provider)
        .ok_or_else(|| AppError::Config(format!("Unknown LLM provider: {}", settings.provider)))?;

    tracing::debug!(
        provider = provider.as_str(),
        base_url = %settings.base_url,
        model = %settings.model,
        "Creating LLM client"
    );

    match provider {
        ProviderType::OpenAI => Ok(Arc::new(OpenAiClient::new(
            settings.base_url.clone(),
            settings.api_key.clone(),
            settings.timeout_secs,
        )?)),
        ProviderType::Ollama => Ok(Arc::new(OllamaClient::new(
            settings.base_url.clone(),
            settings.timeout_secs,
        )?)),
    }
}

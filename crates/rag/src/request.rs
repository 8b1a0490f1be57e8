use webrag_core::LlmSettings;
use webrag_llm::LlmRequest;

/// A single-prompt request with the configured sampling options.
pub(crate) fn build_request(settings: &LlmSettings, prompt: impl Into<String>) -> LlmRequest {
    LlmRequest::new(prompt, settings.model.clone())
        .with_temperature(settings.temperature)
        .with_max_tokens(settings.max_tokens)
}

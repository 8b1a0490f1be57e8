//! Answer generation with streaming guards and a quality gate.

use crate::grounding::contains_context_info;
use crate::repetition::RepetitionGuard;
use crate::request::build_request;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use webrag_core::{AppResult, GenerationConfig, LlmSettings};
use webrag_llm::{LlmClient, LlmRequest};
use webrag_prompt::{PromptLibrary, ANSWER_GROUNDED, ANSWER_REGENERATE};

/// The final answer of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    /// Answer text
    pub text: String,

    /// Whether the first answer passed the quality gate
    pub accepted: bool,

    /// Whether `text` comes from the regeneration
    pub regenerated: bool,
}

/// Produces answers from context with one model call per attempt.
pub struct AnswerGenerator {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    settings: LlmSettings,
    config: GenerationConfig,
}

impl AnswerGenerator {
    pub fn new(
        client: Arc<dyn LlmClient>,
        prompts: Arc<PromptLibrary>,
        settings: LlmSettings,
        config: GenerationConfig,
    ) -> Self {
        Self {
            client,
            prompts,
            settings,
            config,
        }
    }

    /// One generation call.
    ///
    /// Without `prompt_override` the question and context are embedded in
    /// the grounded-answer prompt; with it, the override is sent verbatim.
    #[instrument(skip_all, fields(stream = self.settings.stream, question_len = question.len()))]
    pub async fn generate(
        &self,
        question: &str,
        context: &str,
        prompt_override: Option<&str>,
    ) -> AppResult<String> {
        let prompt = match prompt_override {
            Some(prompt) => prompt.to_string(),
            None => {
                self.prompts
                    .render(ANSWER_GROUNDED, &[("context", context), ("question", question)])?
                    .text
            }
        };
        let request = build_request(&self.settings, prompt);

        if self.settings.stream {
            self.generate_streaming(&request.with_streaming()).await
        } else {
            self.generate_complete(&request).await
        }
    }

    /// Generate with `system_prompt`, then regenerate once if the answer is
    /// too short or does not use the context.
    pub async fn answer(
        &self,
        question: &str,
        context: &str,
        system_prompt: &str,
    ) -> AppResult<GenerationResult> {
        let first = self.generate(question, context, Some(system_prompt)).await?;

        let long_enough = first.chars().count() >= self.config.min_answer_chars;
        if long_enough && contains_context_info(&first, context) {
            return Ok(GenerationResult {
                text: first,
                accepted: true,
                regenerated: false,
            });
        }

        info!(
            chars = first.chars().count(),
            long_enough, "Regenerating response with emphasis on context"
        );
        let regeneration = self
            .prompts
            .render(ANSWER_REGENERATE, &[("question", question)])?;
        let text = self.generate(&regeneration.text, context, None).await?;

        Ok(GenerationResult {
            text,
            accepted: false,
            regenerated: true,
        })
    }

    /// Answer length, in characters, at which generation is cut off.
    fn length_budget(&self) -> usize {
        self.settings.max_tokens as usize
    }

    async fn generate_complete(&self, request: &LlmRequest) -> AppResult<String> {
        let response = self.client.complete(request).await?;

        if response.content.chars().count() >= self.length_budget() {
            warn!(
                budget = self.length_budget(),
                "Response reached the max_tokens budget"
            );
        }
        debug!(
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "Generation complete"
        );

        Ok(response.content)
    }

    async fn generate_streaming(&self, request: &LlmRequest) -> AppResult<String> {
        let guard = RepetitionGuard::new(self.config.repetition_threshold);
        let mut stream = self.client.stream(request).await?;
        let mut answer = String::new();
        let mut length = 0;

        while let Some(result) = stream.next().await {
            let chunk = result?;

            if !chunk.content.is_empty() {
                if guard.is_repetitive(&answer, &chunk.content) {
                    warn!("Detected repetitive content. Stopping generation.");
                    break;
                }

                answer.push_str(&chunk.content);
                length += chunk.content.chars().count();

                if length >= self.length_budget() {
                    warn!(
                        budget = self.length_budget(),
                        "Maximum response length reached. Stopping generation."
                    );
                    break;
                }
            }

            if chunk.done {
                if let Some(usage) = chunk.usage {
                    debug!(
                        prompt_tokens = usage.prompt_tokens,
                        completion_tokens = usage.completion_tokens,
                        "Generation complete"
                    );
                }
                break;
            }
        }

        Ok(answer)
    }
}

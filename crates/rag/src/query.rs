//! Turning a question into a web search query.

use crate::request::build_request;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use webrag_core::{AppResult, LlmSettings};
use webrag_llm::LlmClient;
use webrag_prompt::{PromptLibrary, SEARCH_REPHRASE};

/// Longest search query kept from the model's reply, in characters.
pub const MAX_QUERY_CHARS: usize = 50;

/// The user's question and the query derived from it for searching.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub original: String,
    pub reformulated: String,
    accepted: bool,
}

impl SearchQuery {
    /// Pair a question with its reformulation.
    ///
    /// The reformulation is only used when it is non-empty, differs from the
    /// question and is at most `max_ratio` times the question's length.
    pub fn new(original: impl Into<String>, reformulated: impl Into<String>, max_ratio: f32) -> Self {
        let original = original.into();
        let reformulated = reformulated.into();

        let original_len = original.chars().count() as f32;
        let reformulated_len = reformulated.chars().count() as f32;
        let accepted = !reformulated.is_empty()
            && reformulated != original
            && reformulated_len <= original_len * max_ratio;

        Self {
            original,
            reformulated,
            accepted,
        }
    }

    /// Whether the reformulation replaced the question for searching.
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// The query actually sent to the search backend.
    pub fn effective(&self) -> &str {
        if self.accepted {
            &self.reformulated
        } else {
            &self.original
        }
    }
}

/// Asks the model for a short search query.
pub struct QueryReformulator {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    settings: LlmSettings,
}

impl QueryReformulator {
    pub fn new(client: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>, settings: LlmSettings) -> Self {
        Self {
            client,
            prompts,
            settings,
        }
    }

    /// One model call; the first line of the reply, trimmed and cut to
    /// [`MAX_QUERY_CHARS`].
    #[instrument(skip(self, question), fields(provider = self.client.provider_name()))]
    pub async fn reformulate(&self, question: &str) -> AppResult<String> {
        let prompt = self.prompts.render(SEARCH_REPHRASE, &[("question", question)])?;
        let request = build_request(&self.settings, prompt.text);

        let response = self.client.complete(&request).await.map_err(|e| {
            error!("Error in rephrasing: {}", e);
            e
        })?;

        let query = first_line_query(&response.content);
        debug!(query = %query, "Rephrased question for search");
        Ok(query)
    }
}

fn first_line_query(reply: &str) -> String {
    reply
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .chars()
        .take(MAX_QUERY_CHARS)
        .collect()
}

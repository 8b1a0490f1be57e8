//! Plain-text record of one run.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::Path;
use uuid::Uuid;
use webrag_core::AppResult;

/// What a single source contributed.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub url: String,

    /// Extracted page text; `None` when nothing could be extracted
    pub content: Option<String>,
}

/// Everything a run saw and produced, in the order it happened.
#[derive(Debug, Clone)]
pub struct RunTranscript {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub original_prompt: String,
    pub search_query: String,
    pub urls: Vec<String>,
    pub sources: Vec<SourceRecord>,
    pub no_results: Option<String>,
    pub system_prompt: Option<String>,
    pub response: Option<String>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunTranscript {
    /// Start a transcript for `original_prompt` searched as `search_query`.
    pub fn new(original_prompt: impl Into<String>, search_query: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            original_prompt: original_prompt.into(),
            search_query: search_query.into(),
            urls: Vec::new(),
            sources: Vec::new(),
            no_results: None,
            system_prompt: None,
            response: None,
            finished_at: None,
        }
    }

    pub fn record_source(&mut self, url: &str, content: &str) {
        self.sources.push(SourceRecord {
            url: url.to_string(),
            content: (!content.is_empty()).then(|| content.to_string()),
        });
    }

    pub fn record_response(&mut self, response: &str) {
        self.response = Some(response.to_string());
        self.finished_at = Some(Utc::now());
    }

    /// Text up to and including the system prompt.
    pub fn render_context(&self) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "Original prompt: {}\nRephrased search query: {}\n\n",
            self.original_prompt, self.search_query
        );
        let _ = write!(out, "Search results:\n{}\n\n", self.urls.join("\n"));

        for source in &self.sources {
            match &source.content {
                Some(content) => {
                    let _ = write!(out, "Content from {}:\n\n{}\n\n---\n\n", source.url, content);
                }
                None => {
                    let _ = write!(out, "No content could be extracted from {}\n\n---\n\n", source.url);
                }
            }
        }

        if let Some(message) = &self.no_results {
            let _ = writeln!(out, "{}", message);
        }
        if let Some(system_prompt) = &self.system_prompt {
            let _ = write!(out, "\nSystem Prompt:\n{}\n\n", system_prompt);
        }

        out
    }

    /// The response section, empty until a response is recorded.
    pub fn render_response(&self) -> String {
        self.response
            .as_ref()
            .map(|response| format!("\nGenerated response:\n{}\n", response))
            .unwrap_or_default()
    }

    /// The whole transcript.
    pub fn render(&self) -> String {
        self.render_context() + &self.render_response()
    }

    /// Overwrite `path` with everything up to the system prompt.
    pub async fn write_context(&self, path: &Path) -> AppResult<()> {
        tokio::fs::write(path, self.render_context()).await?;
        Ok(())
    }

    /// Append the response section to `path`.
    pub async fn append_response(&self, path: &Path) -> AppResult<()> {
        use tokio::io::AsyncWriteExt;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(self.render_response().as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

//! Ask command handler.
//!
//! Answers a question from live web content and prints the answer.

use clap::Args;
use std::path::PathBuf;
use webrag_core::{config::AppConfig, AppError, AppResult};
use webrag_rag::{Pipeline, RunOutcome};

/// Answer a question from live web search results
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question; several words are joined with spaces
    #[arg(required = true)]
    pub question: Vec<String>,

    /// File receiving the run transcript
    #[arg(long, default_value = "log.txt", env = "WEBRAG_TRANSCRIPT")]
    pub transcript: PathBuf,

    /// Do not write a transcript
    #[arg(long, conflicts_with = "transcript")]
    pub no_transcript: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let question = self.question_text()?;
        tracing::info!("Answering question");
        tracing::debug!("Ask command options: {:?}", self);

        let mut pipeline = Pipeline::from_config(config)?;
        if !self.no_transcript {
            pipeline = pipeline.with_transcript(&self.transcript);
        }

        let outcome = pipeline.run(&question).await?;

        if self.json {
            println!("{}", self.render_json(config, &outcome)?);
        } else {
            println!("{}", outcome.generation.text);
        }

        tracing::debug!(
            run_id = %outcome.transcript.run_id,
            sources = outcome.fragments.len(),
            regenerated = outcome.generation.regenerated,
            "Run finished"
        );
        Ok(())
    }

    fn question_text(&self) -> AppResult<String> {
        let question = self.question.join(" ");
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Config("No question provided".to_string()));
        }
        Ok(question.to_string())
    }

    fn render_json(&self, config: &AppConfig, outcome: &RunOutcome) -> AppResult<String> {
        let output = serde_json::json!({
            "answer": outcome.generation.text,
            "runId": outcome.transcript.run_id.to_string(),
            "provider": config.llm.provider,
            "model": config.llm.model,
            "query": {
                "original": outcome.query.original,
                "searched": outcome.query.effective(),
            },
            "sources": outcome.fragments.iter().map(|f| f.url.as_str()).collect::<Vec<_>>(),
            "accepted": outcome.generation.accepted,
            "regenerated": outcome.generation.regenerated,
        });

        Ok(serde_json::to_string_pretty(&output)?)
    }
}

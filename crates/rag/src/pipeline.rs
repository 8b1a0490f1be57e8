//! End-to-end run: question → search → pages → context → answer.

use crate::generator::{AnswerGenerator, GenerationResult};
use crate::query::{QueryReformulator, SearchQuery};
use crate::transcript::RunTranscript;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use webrag_core::{AppConfig, AppResult, PipelineConfig};
use webrag_knowledge::ContentReducer;
use webrag_llm::{create_client, LlmClient};
use webrag_prompt::{PromptLibrary, ANSWER_SYSTEM};
use webrag_web::{ContentFetcher, SearchClient};

/// Reduced text of one source.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextFragment {
    pub url: String,
    pub text: String,
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub query: SearchQuery,
    pub urls: Vec<String>,
    pub fragments: Vec<ContextFragment>,
    pub combined_content: String,
    pub system_prompt: String,
    pub generation: GenerationResult,
    pub transcript: RunTranscript,
}

/// Wires the retrieval and generation stages together.
pub struct Pipeline {
    reformulator: QueryReformulator,
    search: SearchClient,
    fetcher: ContentFetcher,
    reducer: ContentReducer,
    generator: AnswerGenerator,
    prompts: Arc<PromptLibrary>,
    config: PipelineConfig,
    transcript_path: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(
        reformulator: QueryReformulator,
        search: SearchClient,
        fetcher: ContentFetcher,
        reducer: ContentReducer,
        generator: AnswerGenerator,
        prompts: Arc<PromptLibrary>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            reformulator,
            search,
            fetcher,
            reducer,
            generator,
            prompts,
            config,
            transcript_path: None,
        }
    }

    /// Build every component from configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let client = create_client(&config.llm)?;
        Self::with_client(config, client)
    }

    /// Build every component from configuration around an existing client.
    pub fn with_client(config: &AppConfig, client: Arc<dyn LlmClient>) -> AppResult<Self> {
        let prompts = Arc::new(PromptLibrary::load(config.pipeline.prompts_dir.as_deref())?);

        Ok(Self::new(
            QueryReformulator::new(client.clone(), prompts.clone(), config.llm.clone()),
            SearchClient::new(config.search.clone())?,
            ContentFetcher::new(config.fetch.clone())?,
            ContentReducer::new(config.reducer.clone())?,
            AnswerGenerator::new(
                client,
                prompts.clone(),
                config.llm.clone(),
                config.generation.clone(),
            ),
            prompts,
            config.pipeline.clone(),
        ))
    }

    /// Write the transcript to `path`: everything up to the system prompt
    /// before generation starts, the response once it exists.
    pub fn with_transcript(mut self, path: impl Into<PathBuf>) -> Self {
        self.transcript_path = Some(path.into());
        self
    }

    /// Answer `question` from live web content.
    #[instrument(skip(self))]
    pub async fn run(&self, question: &str) -> AppResult<RunOutcome> {
        let reformulated = self.reformulator.reformulate(question).await?;
        let query = SearchQuery::new(question, reformulated, self.config.reformulation_ratio);
        if !query.is_accepted() {
            debug!(rejected = %query.reformulated, "Searching with the original question");
        }
        info!(query = %query.effective(), "Searching the web");

        let mut transcript = RunTranscript::new(question, query.effective());

        if self.config.pre_search_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.pre_search_delay_ms)).await;
        }

        let urls = self.search.search(query.effective()).await?;
        transcript.urls = urls.clone();

        let mut fragments = Vec::new();
        for url in &urls {
            info!(url = %url, "Fetching content");
            let content = self.fetcher.fetch(url).await;
            let content = content.trim();
            transcript.record_source(url, content);

            if content.is_empty() {
                continue;
            }

            let text = match self.reducer.reduce(content, query.effective()).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(url = %url, "Could not reduce content: {}", e);
                    continue;
                }
            };
            if !text.is_empty() {
                fragments.push(ContextFragment {
                    url: url.clone(),
                    text,
                });
            }
        }

        let combined_content = if fragments.is_empty() {
            warn!("No content was extracted from any search result");
            transcript.no_results = Some(self.config.no_results_message.clone());
            self.config.no_results_message.clone()
        } else {
            combine_fragments(&fragments)
        };

        let system_prompt = self
            .prompts
            .render(
                ANSWER_SYSTEM,
                &[
                    ("context", combined_content.as_str()),
                    ("question", question),
                    ("search_query", query.effective()),
                ],
            )?
            .text;
        transcript.system_prompt = Some(system_prompt.clone());

        if let Some(path) = &self.transcript_path {
            transcript.write_context(path).await?;
        }

        info!("Generating response");
        let generation = self
            .generator
            .answer(question, &combined_content, &system_prompt)
            .await?;
        transcript.record_response(&generation.text);

        if let Some(path) = &self.transcript_path {
            transcript.append_response(path).await?;
        }

        Ok(RunOutcome {
            query,
            urls,
            fragments,
            combined_content,
            system_prompt,
            generation,
            transcript,
        })
    }
}

/// Concatenate fragments in source order under per-URL headers.
pub fn combine_fragments(fragments: &[ContextFragment]) -> String {
    fragments
        .iter()
        .map(|f| format!("Content from {}:\n\n{}\n\n", f.url, f.text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use webrag_core::{FetchConfig, SearchFormat};
    use webrag_llm::{ScriptedClient, ScriptedReply};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const QUESTION: &str = "What is the current population of Reykjavik in Iceland today?";

    fn page(body: &str) -> String {
        format!(
            "<html><body><nav>Home | About</nav><article><p>{}</p></article>\
             <footer>Copyright</footer></body></html>",
            body
        )
    }

    const FIRST_PAGE: &str = "Reykjavik is the capital and largest city of Iceland. \
        The municipality counted roughly 139,000 residents according to recent statistics. \
        The greater capital region accounts for about two thirds of the national population.";

    const SECOND_PAGE: &str = "Iceland's population passed 380,000 people during the latest census \
        period. Most inhabitants live along the southwestern coastline around Faxaflói bay, \
        where Reykjavik and neighbouring towns form one urban area.";

    fn config(server: &MockServer) -> AppConfig {
        let mut config = AppConfig::default();
        config.search.base_url = server.uri();
        config.search.format = SearchFormat::Json;
        config.search.num_urls = 3;
        config.search.initial_backoff_ms = 1;
        config.fetch = FetchConfig {
            timeout_ms: 300,
            ..FetchConfig::default()
        };
        config
    }

    async fn mount_search(server: &MockServer, urls: &[String]) {
        let results: Vec<_> = urls.iter().map(|u| serde_json::json!({ "url": u })).collect();
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("format", "json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "results": results })),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    async fn mount_page(server: &MockServer, route: &str, body: &str, delay: Option<Duration>) {
        let mut response = ResponseTemplate::new(200)
            .insert_header("content-type", "text/html")
            .set_body_string(page(body));
        if let Some(delay) = delay {
            response = response.set_delay(delay);
        }
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_short_first_answer_regenerates_once() {
        let server = MockServer::start().await;
        let urls = vec![
            format!("{}/one", server.uri()),
            format!("{}/slow", server.uri()),
            format!("{}/two", server.uri()),
        ];
        mount_search(&server, &urls).await;
        mount_page(&server, "/one", FIRST_PAGE, None).await;
        mount_page(&server, "/slow", SECOND_PAGE, Some(Duration::from_secs(3))).await;
        mount_page(&server, "/two", SECOND_PAGE, None).await;

        let first_answer = "Reykjavik has about 139,000 residents."; // under 100 chars
        let final_answer = "Reykjavik is the capital and largest city of Iceland with roughly \
            139,000 residents, while the greater capital region holds about two thirds of the \
            national population.";
        let client = Arc::new(ScriptedClient::new([
            ScriptedReply::text("reykjavik population"),
            ScriptedReply::text(first_answer),
            ScriptedReply::text(final_answer),
        ]));

        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("log.txt");
        let pipeline = Pipeline::with_client(&config(&server), client.clone())
            .unwrap()
            .with_transcript(&log_path);

        let outcome = pipeline.run(QUESTION).await.unwrap();

        assert_eq!(outcome.query.effective(), "reykjavik population");
        assert_eq!(outcome.urls, urls);
        assert_eq!(outcome.fragments.len(), 2);
        assert_eq!(outcome.fragments[0].url, urls[0]);
        assert_eq!(outcome.fragments[1].url, urls[2]);
        assert!(outcome
            .combined_content
            .starts_with(&format!("Content from {}:\n\n", urls[0])));
        assert!(outcome.system_prompt.contains("\"reykjavik population\""));

        // One reformulation plus at most two generation calls
        assert_eq!(client.calls(), 3);
        assert!(outcome.generation.regenerated);
        assert_eq!(outcome.generation.text, final_answer);

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.starts_with(&format!(
            "Original prompt: {}\nRephrased search query: reykjavik population\n\n",
            QUESTION
        )));
        assert!(log.contains(&format!("No content could be extracted from {}", urls[1])));
        assert!(log.ends_with(&format!("\nGenerated response:\n{}\n", final_answer)));
    }

    #[tokio::test]
    async fn test_no_content_uses_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "results": [] })),
            )
            .mount(&server)
            .await;

        let long_answer = "x".repeat(150);
        let client = Arc::new(ScriptedClient::new([
            ScriptedReply::text("population of reykjavik now and then"),
            ScriptedReply::text(long_answer.clone()),
            ScriptedReply::text("fallback answer"),
        ]));

        let pipeline = Pipeline::with_client(&config(&server), client.clone()).unwrap();
        let outcome = pipeline.run(QUESTION).await.unwrap();

        assert!(outcome.urls.is_empty());
        assert_eq!(
            outcome.combined_content,
            "No relevant information found from web search."
        );
        // The sentinel has no keywords, so the first answer never counts as grounded
        assert!(outcome.generation.regenerated);
        assert_eq!(outcome.generation.text, "fallback answer");
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_long_reformulation_falls_back_to_question() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Rust?"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "results": [] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = Arc::new(ScriptedClient::new([
            ScriptedReply::text("rust programming language"),
            ScriptedReply::text("a"),
            ScriptedReply::text("b"),
        ]));

        let pipeline = Pipeline::with_client(&config(&server), client).unwrap();
        let outcome = pipeline.run("Rust?").await.unwrap();

        assert!(!outcome.query.is_accepted());
        assert_eq!(outcome.transcript.search_query, "Rust?");
    }

    #[tokio::test]
    async fn test_reformulation_failure_is_fatal() {
        let server = MockServer::start().await;
        let client = Arc::new(ScriptedClient::new([ScriptedReply::Error(
            "model offline".to_string(),
        )]));

        let pipeline = Pipeline::with_client(&config(&server), client).unwrap();
        assert!(pipeline.run(QUESTION).await.is_err());
    }

    #[test]
    fn test_combine_fragments() {
        let fragments = vec![
            ContextFragment {
                url: "https://a.test".to_string(),
                text: "A.".to_string(),
            },
            ContextFragment {
                url: "https://b.test".to_string(),
                text: "B.".to_string(),
            },
        ];

        assert_eq!(
            combine_fragments(&fragments),
            "Content from https://a.test:\n\nA.\n\nContent from https://b.test:\n\nB.\n\n"
        );
    }
}

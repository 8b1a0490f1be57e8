//! SearXNG search client with exponential backoff.
//!
//! One search is up to `max_retries` GET requests against `{base}/search`.
//! Rate limiting (HTTP 429) and other failures share the attempt counter
//! and the backoff schedule; once attempts run out the configured
//! [`FallbackSearch`] answers instead.

use crate::fallback::{FallbackSearch, NoFallback, SecondaryBackend};
use scraper::{Html, Selector};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;
use webrag_core::{AppError, AppResult, SearchConfig, SearchFormat};

/// Why a single search attempt did not produce links.
#[derive(Debug)]
pub(crate) enum AttemptError {
    /// HTTP 429
    RateLimited,
    /// Network, status or parse failure
    Failed(AppError),
}

#[derive(Debug, Deserialize)]
struct JsonResults {
    #[serde(default)]
    results: Vec<JsonResult>,
}

#[derive(Debug, Deserialize)]
struct JsonResult {
    url: Option<String>,
}

/// Client for a SearXNG-style metasearch backend.
pub struct SearchClient {
    config: SearchConfig,
    client: reqwest::Client,
    fallback: Box<dyn FallbackSearch>,
}

impl SearchClient {
    /// Create a client; the fallback is a secondary backend when
    /// `fallback_url` is set and a no-op otherwise.
    pub fn new(config: SearchConfig) -> AppResult<Self> {
        let client = build_http_client(&config)?;

        let fallback: Box<dyn FallbackSearch> = match &config.fallback_url {
            Some(url) if !url.trim().is_empty() => Box::new(SecondaryBackend::new(
                url.clone(),
                config.format,
                client.clone(),
            )),
            _ => Box::new(NoFallback),
        };

        Ok(Self {
            config,
            client,
            fallback,
        })
    }

    /// Replace the fallback strategy.
    pub fn with_fallback(mut self, fallback: Box<dyn FallbackSearch>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Search for `query`, returning at most `num_urls` result URLs in
    /// backend rank order.
    ///
    /// Only an unusable base URL is an error; exhausted retries degrade to
    /// the fallback, and zero results is an empty vector.
    #[instrument(skip(self), fields(backend = %self.config.base_url))]
    pub async fn search(&self, query: &str) -> AppResult<Vec<String>> {
        let url = build_search_url(
            &self.config.base_url,
            query,
            self.config.format,
            self.config.extra_params.as_deref(),
        )?;

        let links = retry_with_backoff(
            self.config.initial_backoff_ms,
            self.config.max_retries,
            || request_links(&self.client, url.clone(), self.config.format),
        )
        .await;

        match links {
            Some(mut links) => {
                if links.is_empty() {
                    warn!("No search results returned; the search backend may be misbehaving");
                }
                links.truncate(self.config.num_urls);
                Ok(links)
            }
            None => {
                warn!(fallback = self.fallback.name(), "Search failed, using fallback");
                Ok(self.run_fallback(query).await)
            }
        }
    }

    async fn run_fallback(&self, query: &str) -> Vec<String> {
        let mut links = self.fallback.search(query).await;
        links.truncate(self.config.num_urls);
        links
    }
}

fn build_http_client(config: &SearchConfig) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| AppError::Search(format!("Failed to build HTTP client: {}", e)))
}

/// Run `attempt_once` up to `max_retries` times (at least once), sleeping
/// [`backoff_delay`] after each failed attempt.
///
/// A rate-limited attempt always backs off, the last one included; any
/// other failure on the last attempt gives up at once. `None` means every
/// attempt failed.
pub(crate) async fn retry_with_backoff<F, Fut>(
    initial_backoff_ms: u64,
    max_retries: u32,
    mut attempt_once: F,
) -> Option<Vec<String>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<String>, AttemptError>>,
{
    let max_retries = max_retries.max(1);
    for attempt in 0..max_retries {
        let delay = backoff_delay(initial_backoff_ms, attempt);

        match attempt_once().await {
            Ok(links) => {
                info!(attempt = attempt + 1, count = links.len(), "Search succeeded");
                return Some(links);
            }
            Err(AttemptError::RateLimited) => {
                warn!(
                    attempt = attempt + 1,
                    backoff_ms = delay.as_millis() as u64,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
            }
            Err(AttemptError::Failed(e)) => {
                warn!(attempt = attempt + 1, error = %e, "Search attempt failed");
                if attempt + 1 == max_retries {
                    return None;
                }
                debug!(backoff_ms = delay.as_millis() as u64, "Retrying after error");
                tokio::time::sleep(delay).await;
            }
        }
    }

    None
}

/// Delay before the retry following `attempt` (0-based):
/// `initial_ms * 2^attempt`.
pub fn backoff_delay(initial_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt);
    Duration::from_millis(initial_ms.saturating_mul(factor))
}

/// Every delay a search with `max_retries` attempts may sleep, in order.
pub fn backoff_schedule(initial_ms: u64, max_retries: u32) -> Vec<Duration> {
    (0..max_retries)
        .map(|attempt| backoff_delay(initial_ms, attempt))
        .collect()
}

/// Build `{base}/search?q=...[&format=json][&extra]`.
pub fn build_search_url(
    base_url: &str,
    query: &str,
    format: SearchFormat,
    extra_params: Option<&str>,
) -> AppResult<Url> {
    let mut url = Url::parse(&format!("{}/search", base_url.trim_end_matches('/')))
        .map_err(|e| AppError::Search(format!("Invalid search URL '{}': {}", base_url, e)))?;

    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("q", query);
        if format == SearchFormat::Json {
            pairs.append_pair("format", "json");
        }
    }

    if let Some(extra) = extra_params.map(str::trim).filter(|s| !s.is_empty()) {
        let extra = extra.trim_start_matches('&');
        let query = match url.query() {
            Some(existing) => format!("{}&{}", existing, extra),
            None => extra.to_string(),
        };
        url.set_query(Some(&query));
    }

    Ok(url)
}

/// One GET against a search endpoint, parsed into result links.
pub(crate) async fn request_links(
    client: &reqwest::Client,
    url: Url,
    format: SearchFormat,
) -> Result<Vec<String>, AttemptError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AttemptError::Failed(AppError::Search(format!("Request failed: {}", e))))?;

    let status = response.status();
    debug!(status = status.as_u16(), "Search response");

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(AttemptError::RateLimited);
    }
    if !status.is_success() {
        return Err(AttemptError::Failed(AppError::Search(format!(
            "Search backend returned {}",
            status
        ))));
    }

    let is_json = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    let body = response.text().await.map_err(|e| {
        AttemptError::Failed(AppError::Search(format!("Failed to read body: {}", e)))
    })?;

    let links = if format == SearchFormat::Json && is_json {
        parse_json_results(&body)
    } else {
        parse_html_results(&body)
    };
    links.map_err(AttemptError::Failed)
}

/// `results[].url` from a SearXNG JSON response.
pub fn parse_json_results(body: &str) -> AppResult<Vec<String>> {
    let parsed: JsonResults = serde_json::from_str(body)
        .map_err(|e| AppError::Search(format!("Invalid JSON search response: {}", e)))?;

    Ok(parsed.results.into_iter().filter_map(|r| r.url).collect())
}

/// Result links from a SearXNG HTML page.
///
/// Each `article.result` contributes the `href` of its first
/// `a.url_wrapper`; site-relative links are dropped.
pub fn parse_html_results(html: &str) -> AppResult<Vec<String>> {
    let result_sel = selector("article.result")?;
    let link_sel = selector("a.url_wrapper")?;

    let document = Html::parse_document(html);
    let links = document
        .select(&result_sel)
        .filter_map(|article| article.select(&link_sel).next())
        .filter_map(|link| link.value().attr("href"))
        .filter(|href| !href.is_empty() && !href.starts_with('/'))
        .map(str::to_string)
        .collect();

    Ok(links)
}

fn selector(css: &str) -> AppResult<Selector> {
    Selector::parse(css).map_err(|e| AppError::Search(format!("Bad selector '{}': {:?}", css, e)))
}

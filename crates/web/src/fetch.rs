//! Time-bounded page fetching.
//!
//! The download and extraction run on a spawned task raced against a timer.
//! When the timer wins, the join handle is dropped: the task is detached
//! and finishes (or fails) on its own, and its result is ignored.

use crate::extract::extract_article;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use webrag_core::{AppError, AppResult, FetchConfig};

/// Requests abandoned by a timed-out fetch are cut off after this many
/// fetch budgets.
const ABANDON_FACTOR: u32 = 4;

/// Fetches pages and reduces them to their readable text.
#[derive(Clone)]
pub struct ContentFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl ContentFetcher {
    /// Create a fetcher. Certificate validation is skipped when
    /// `disable_ssl_validation` is set.
    pub fn new(config: FetchConfig) -> AppResult<Self> {
        if config.disable_ssl_validation {
            warn!("TLS certificate validation is disabled for page fetches");
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(config.disable_ssl_validation)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(request_timeout(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Fetch(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Fetch `url` and return its normalised article text.
    ///
    /// Never fails: timeouts, network errors, bad statuses and pages
    /// without a readable article all yield `""`.
    #[instrument(skip(self), fields(timeout_ms = self.config.timeout_ms))]
    pub async fn fetch(&self, url: &str) -> String {
        let client = self.client.clone();
        let target = url.to_string();
        let min_chars = self.config.min_article_chars;

        let task = tokio::spawn(async move { download(&client, &target, min_chars).await });

        match tokio::time::timeout(Duration::from_millis(self.config.timeout_ms), task).await {
            Err(_) => {
                warn!(
                    "Skipping {} due to timeout ({}ms)",
                    url, self.config.timeout_ms
                );
                String::new()
            }
            Ok(Err(join_error)) => {
                warn!(error = %join_error, "Fetch task did not complete");
                String::new()
            }
            Ok(Ok(Err(e))) => {
                warn!(error = %e, "Error fetching content");
                String::new()
            }
            Ok(Ok(Ok(text))) => {
                debug!(chars = text.chars().count(), "Fetched content");
                text
            }
        }
    }
}

/// Hard limit for a single request, including detached ones.
fn request_timeout(timeout_ms: u64) -> Duration {
    Duration::from_millis(timeout_ms) * ABANDON_FACTOR
}

async fn download(client: &reqwest::Client, url: &str, min_chars: usize) -> AppResult<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Fetch(format!("Request to {} failed: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Fetch(format!("{} returned {}", url, status)));
    }

    let html = response
        .text()
        .await
        .map_err(|e| AppError::Fetch(format!("Failed to read body of {}: {}", url, e)))?;

    Ok(extract_article(&html, min_chars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = "<html><body><article>\
        <p>Tokio is an asynchronous runtime for the Rust programming language.</p>\
        \n\n\n<p>   It provides the building blocks needed for writing network applications.   </p>\
        </article></body></html>";

    fn fetcher(timeout_ms: u64) -> ContentFetcher {
        ContentFetcher::new(FetchConfig {
            timeout_ms,
            min_article_chars: 20,
            ..FetchConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_extracts_and_normalizes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let text = fetcher(5000).fetch(&format!("{}/page", server.uri())).await;
        assert_eq!(
            text,
            "Tokio is an asynchronous runtime for the Rust programming language.\n\
             It provides the building blocks needed for writing network applications."
        );
    }

    #[tokio::test]
    async fn test_timeout_returns_empty_promptly() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(PAGE)
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let started = Instant::now();
        let text = fetcher(100).fetch(&format!("{}/slow", server.uri())).await;
        assert_eq!(text, "");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_detached_download_is_cut_off() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hang"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(PAGE)
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let fetcher = fetcher(100);
        assert_eq!(request_timeout(100), Duration::from_millis(400));

        let started = Instant::now();
        let result = download(&fetcher.client, &format!("{}/hang", server.uri()), 20).await;
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_error_status_returns_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string(PAGE))
            .mount(&server)
            .await;

        let text = fetcher(5000).fetch(&format!("{}/missing", server.uri())).await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_unreachable_returns_empty() {
        let text = fetcher(2000).fetch("http://127.0.0.1:9/nothing").await;
        assert_eq!(text, "");
    }

    #[test]
    fn test_insecure_client_builds() {
        let fetcher = ContentFetcher::new(FetchConfig {
            disable_ssl_validation: true,
            ..FetchConfig::default()
        });
        assert!(fetcher.is_ok());
    }
}

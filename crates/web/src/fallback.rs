//! Degraded search paths used once the primary backend gives up.
//!
//! A fallback never fails: whatever goes wrong becomes an empty result list.

use crate::search::{build_search_url, request_links, AttemptError};
use tracing::{info, warn};
use webrag_core::SearchFormat;

/// Search path of last resort.
#[async_trait::async_trait]
pub trait FallbackSearch: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Return result URLs, possibly none.
    async fn search(&self, query: &str) -> Vec<String>;
}

/// No secondary path: logs and returns nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFallback;

#[async_trait::async_trait]
impl FallbackSearch for NoFallback {
    fn name(&self) -> &str {
        "none"
    }

    async fn search(&self, query: &str) -> Vec<String> {
        warn!(query, "No fallback search configured, continuing without results");
        Vec::new()
    }
}

/// A second SearXNG-style instance, tried exactly once.
pub struct SecondaryBackend {
    base_url: String,
    format: SearchFormat,
    client: reqwest::Client,
}

impl SecondaryBackend {
    /// Create a fallback against `base_url`, reusing an HTTP client.
    pub fn new(base_url: impl Into<String>, format: SearchFormat, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            format,
            client,
        }
    }
}

#[async_trait::async_trait]
impl FallbackSearch for SecondaryBackend {
    fn name(&self) -> &str {
        "secondary"
    }

    async fn search(&self, query: &str) -> Vec<String> {
        let url = match build_search_url(&self.base_url, query, self.format, None) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Fallback search URL is unusable");
                return Vec::new();
            }
        };

        match request_links(&self.client, url, self.format).await {
            Ok(links) => {
                info!(count = links.len(), "Fallback search succeeded");
                links
            }
            Err(AttemptError::RateLimited) => {
                warn!("Fallback search backend is rate limiting");
                Vec::new()
            }
            Err(AttemptError::Failed(e)) => {
                warn!(error = %e, "Fallback search failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_no_fallback_is_empty() {
        assert!(NoFallback.search("anything").await.is_empty());
    }

    #[tokio::test]
    async fn test_secondary_errors_become_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let fallback = SecondaryBackend::new(server.uri(), SearchFormat::Html, reqwest::Client::new());
        assert!(fallback.search("q").await.is_empty());
    }

    #[tokio::test]
    async fn test_secondary_bad_url_is_empty() {
        let fallback = SecondaryBackend::new("::nope::", SearchFormat::Html, reqwest::Client::new());
        assert!(fallback.search("q").await.is_empty());
    }
}

//! Web retrieval for webrag: metasearch, page fetching and article
//! extraction.
//!
//! # Example
//! ```no_run
//! use webrag_core::{FetchConfig, SearchConfig};
//! use webrag_web::{ContentFetcher, SearchClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let search = SearchClient::new(SearchConfig {
//!     base_url: "http://localhost:8080".to_string(),
//!     ..SearchConfig::default()
//! })?;
//! let fetcher = ContentFetcher::new(FetchConfig::default())?;
//!
//! for url in search.search("rust async runtimes").await? {
//!     println!("{}: {} chars", url, fetcher.fetch(&url).await.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod extract;
pub mod fallback;
pub mod fetch;
pub mod search;

pub use extract::extract_article;
pub use fallback::{FallbackSearch, NoFallback, SecondaryBackend};
pub use fetch::ContentFetcher;
pub use search::{backoff_delay, backoff_schedule, build_search_url, SearchClient};

/// Trim every line, drop blank lines and trim the result.
pub fn normalize(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

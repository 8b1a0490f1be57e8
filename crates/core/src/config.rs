//! Configuration management for webrag.
//!
//! Configuration is assembled from several layers, later layers winning:
//! 1. Built-in defaults
//! 2. An optional YAML file (`--config` / `WEBRAG_CONFIG`)
//! 3. Environment variables (a `.env` file is loaded by the binary first)
//! 4. Command-line flags
//!
//! Each pipeline component receives only its own section (`SearchConfig`,
//! `FetchConfig`, ...) through its constructor, so components can be built
//! and tested with injected values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Browser-like User-Agent sent to search backends and content sources.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Known LLM providers.
pub const KNOWN_PROVIDERS: [&str; 2] = ["openai", "ollama"];

/// Known embedding providers.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 3] = ["trigram", "ollama", "openai"];

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Config file this configuration was read from
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Search backend settings
    pub search: SearchConfig,

    /// Page fetching settings
    pub fetch: FetchConfig,

    /// Content reduction settings
    pub reducer: ReducerConfig,

    /// Language model backend settings
    pub llm: LlmSettings,

    /// Answer generation guards
    pub generation: GenerationConfig,

    /// Orchestration settings
    pub pipeline: PipelineConfig,
}

/// Response format requested from the search backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchFormat {
    /// HTML results page, links scraped from result items
    #[default]
    Html,
    /// JSON body with a `results[].url` array
    Json,
}

impl FromStr for SearchFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            other => Err(AppError::Config(format!(
                "Unknown search format: {}. Supported: html, json",
                other
            ))),
        }
    }
}

/// Search backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchConfig {
    /// Base URL of the SearXNG-style backend (required)
    pub base_url: String,

    /// Maximum number of URLs returned per search
    pub num_urls: usize,

    /// Requested response format
    pub format: SearchFormat,

    /// Extra raw query parameters appended to the search URL (e.g. "language=en")
    pub extra_params: Option<String>,

    /// Attempts before the fallback search is used
    pub max_retries: u32,

    /// Base delay for exponential backoff
    pub initial_backoff_ms: u64,

    /// Secondary backend used once the primary exhausts its retries
    pub fallback_url: Option<String>,

    /// User-Agent header
    pub user_agent: String,

    /// Per-request timeout
    pub request_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            num_urls: 5,
            format: SearchFormat::Html,
            extra_params: None,
            max_retries: 5,
            initial_backoff_ms: 2000,
            fallback_url: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Content fetching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchConfig {
    /// Time budget for fetch + extraction of one URL
    pub timeout_ms: u64,

    /// Accept invalid TLS certificates (self-signed/test endpoints)
    pub disable_ssl_validation: bool,

    /// User-Agent header
    pub user_agent: String,

    /// Minimum amount of text for a block to count as an article
    pub min_article_chars: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            disable_ssl_validation: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            min_article_chars: 140,
        }
    }
}

/// Which reduction strategy the reducer applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReducerStrategy {
    /// Sentence-boundary truncation
    #[default]
    Truncate,
    /// Embedding-based chunk selection with truncation fallback
    Semantic,
}

impl FromStr for ReducerStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "truncate" | "truncation" | "summary" => Ok(Self::Truncate),
            "semantic" | "chunk" | "chunking" => Ok(Self::Semantic),
            other => Err(AppError::Config(format!(
                "Unknown reducer strategy: {}. Supported: truncate, semantic",
                other
            ))),
        }
    }
}

/// Content reducer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReducerConfig {
    /// Active strategy
    pub strategy: ReducerStrategy,

    /// Maximum fragment length in characters, shared by both strategies
    pub max_length: usize,

    /// Semantic chunk-selection parameters
    pub semantic: SemanticConfig,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            strategy: ReducerStrategy::Truncate,
            max_length: 1000,
            semantic: SemanticConfig::default(),
        }
    }
}

/// Parameters of the semantic chunking strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SemanticConfig {
    /// Maximum chunk size in characters
    pub max_chunk_size: usize,

    /// Number of chunks kept after ranking
    pub top_k: usize,

    /// Minimum query similarity for a chunk to be kept
    pub similarity_floor: f32,

    /// Base adjacent-sentence similarity threshold
    pub similarity_threshold: f32,

    /// Lower clamp for the dynamic threshold
    pub lower_bound: f32,

    /// Upper clamp for the dynamic threshold
    pub upper_bound: f32,

    /// Sentences looked ahead when scoring a boundary
    pub lookahead: usize,

    /// Trailing sentences of a chunk repeated at the start of the next one
    pub overlap_sentences: usize,

    /// Merge adjacent chunks that are highly similar before ranking
    pub combine_chunks: bool,

    /// Similarity above which adjacent chunks merge
    pub combine_threshold: f32,

    /// Embedding backend
    pub embedding: EmbeddingSettings,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 500,
            top_k: 3,
            similarity_floor: 0.3,
            similarity_threshold: 0.5,
            lower_bound: 0.2,
            upper_bound: 0.8,
            lookahead: 3,
            overlap_sentences: 1,
            combine_chunks: true,
            combine_threshold: 0.5,
            embedding: EmbeddingSettings::default(),
        }
    }
}

/// Numeric precision applied to embedding vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingPrecision {
    /// Full 32-bit floats
    #[default]
    Fp32,
    /// Half precision mantissa
    Fp16,
    /// Symmetric 8-bit quantisation
    Q8,
}

impl FromStr for EmbeddingPrecision {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fp32" | "f32" => Ok(Self::Fp32),
            "fp16" | "f16" => Ok(Self::Fp16),
            "q8" | "int8" => Ok(Self::Q8),
            other => Err(AppError::Config(format!(
                "Unknown embedding precision: {}. Supported: fp32, fp16, q8",
                other
            ))),
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider name: "trigram", "ollama", "openai"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Endpoint override
    pub endpoint: Option<String>,

    /// API key (never written back to disk)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Expected vector dimensions
    pub dimensions: usize,

    /// Precision applied to returned vectors
    pub precision: EmbeddingPrecision,

    /// Request timeout
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            endpoint: None,
            api_key: None,
            dimensions: 384,
            precision: EmbeddingPrecision::Fp32,
            timeout_secs: 30,
        }
    }
}

/// Language model backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LlmSettings {
    /// Provider ("openai" for any OpenAI-compatible endpoint, or "ollama")
    pub provider: String,

    /// Base URL of the backend
    pub base_url: String,

    /// API key (never written back to disk)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Model identifier
    pub model: String,

    /// Stream answer tokens
    pub stream: bool,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "http://localhost:11434/v1".to_string(),
            api_key: None,
            model: "llama3.2".to_string(),
            stream: false,
            max_tokens: 2048,
            temperature: 0.1,
            timeout_secs: 120,
        }
    }
}

/// Guards applied while generating the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Jaccard similarity above which streaming stops as repetitive
    pub repetition_threshold: f32,

    /// Answers shorter than this trigger a regeneration
    pub min_answer_chars: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            repetition_threshold: 0.5,
            min_answer_chars: 100,
        }
    }
}

/// Orchestration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Pause before the search request
    pub pre_search_delay_ms: u64,

    /// Reformulations longer than this fraction of the question are discarded
    pub reformulation_ratio: f32,

    /// Directory with `<id>.yml` prompt overrides
    pub prompts_dir: Option<PathBuf>,

    /// Context used when no page yielded any text
    pub no_results_message: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pre_search_delay_ms: 0,
            reformulation_ratio: 0.8,
            prompts_dir: None,
            no_results_message: "No relevant information found from web search.".to_string(),
        }
    }
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub search_url: Option<String>,
    pub num_urls: Option<usize>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub stream: Option<bool>,
    pub strategy: Option<ReducerStrategy>,
    pub log_level: Option<String>,
    pub verbose: bool,
    pub no_color: bool,
}

impl AppConfig {
    /// Load configuration from the YAML file named by `WEBRAG_CONFIG` (if any)
    /// and the process environment.
    ///
    /// # Example
    /// ```no_run
    /// use webrag_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Search backend: {}", config.search.base_url);
    /// ```
    pub fn load() -> AppResult<Self> {
        let config_file = std::env::var("WEBRAG_CONFIG").ok().map(PathBuf::from);
        Self::load_with(config_file.as_deref(), |name| std::env::var(name).ok())
    }

    /// Load configuration from an optional YAML file and an environment lookup.
    pub fn load_with<F>(config_file: Option<&Path>, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match config_file {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };

        config.apply_env(lookup)?;
        Ok(config)
    }

    /// Read a YAML configuration file. Missing keys keep their defaults.
    pub fn from_yaml_file(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let mut config: AppConfig = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        config.config_file = Some(path.to_path_buf());
        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Apply environment variables on top of the current values.
    pub fn apply_env<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |names: &[&str]| -> Option<String> {
            names
                .iter()
                .copied()
                .find_map(|name| lookup(name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        // Search
        if let Some(v) = get(&["SEARXNG_URL"]) {
            self.search.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = parse_var(&get, "NUM_URLS")? {
            self.search.num_urls = v;
        }
        if let Some(v) = get(&["SEARXNG_FORMAT"]) {
            self.search.format = v.parse()?;
        }
        if let Some(v) = get(&["SEARXNG_URL_EXTRA_PARAMETER"]) {
            self.search.extra_params = Some(v);
        }
        if let Some(v) = get(&["SEARXNG_FALLBACK_URL"]) {
            self.search.fallback_url = Some(v.trim_end_matches('/').to_string());
        }

        // Fetch
        if let Some(v) = parse_var(&get, "FETCH_TIMEOUT_MS")? {
            self.fetch.timeout_ms = v;
        }
        if let Some(v) = get(&["DISABLE_SSL_VALIDATION"]) {
            self.fetch.disable_ssl_validation = parse_bool(&v);
        }

        // LLM
        if let Some(v) = get(&["LLM_PROVIDER"]) {
            self.llm.provider = v.to_lowercase();
        }
        if let Some(v) = get(&["LLM_BASE_URL", "OLLAMA_BASE_URL"]) {
            self.llm.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get(&["LLM_API_KEY", "OPENAI_API_KEY"]) {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get(&["LLM_MODEL", "OLLAMA_MODEL"]) {
            self.llm.model = v;
        }
        if let Some(v) = get(&["LLM_STREAM"]) {
            self.llm.stream = parse_bool(&v);
        }
        if let Some(v) = parse_var(&get, "LLM_MAX_TOKENS")? {
            self.llm.max_tokens = v;
        }

        // Reducer
        if let Some(v) = get(&["REDUCER_STRATEGY"]) {
            self.reducer.strategy = v.parse()?;
        } else if let Some(v) = get(&["USE_SEMANTIC_CHUNKING"]) {
            if parse_bool(&v) {
                self.reducer.strategy = ReducerStrategy::Semantic;
            }
        }
        if let Some(v) = parse_var(&get, "REDUCER_MAX_LENGTH")? {
            self.reducer.max_length = v;
        }
        let semantic = &mut self.reducer.semantic;
        if let Some(v) = parse_var(&get, "CHUNK_TOP_K")? {
            semantic.top_k = v;
        }
        if let Some(v) = parse_var(&get, "CHUNK_SIMILARITY_FLOOR")? {
            semantic.similarity_floor = v;
        }
        if let Some(v) = parse_var(&get, "CHUNK_SIMILARITY_THRESHOLD")? {
            semantic.similarity_threshold = v;
        }
        if let Some(v) = parse_var(&get, "CHUNK_LOWER_BOUND")? {
            semantic.lower_bound = v;
        }
        if let Some(v) = parse_var(&get, "CHUNK_UPPER_BOUND")? {
            semantic.upper_bound = v;
        }
        if let Some(v) = parse_var(&get, "CHUNK_LOOKAHEAD")? {
            semantic.lookahead = v;
        }
        if let Some(v) = get(&["CHUNK_COMBINE"]) {
            semantic.combine_chunks = parse_bool(&v);
        }
        if let Some(v) = get(&["EMBEDDING_PROVIDER"]) {
            semantic.embedding.provider = v.to_lowercase();
        }
        if let Some(v) = get(&["EMBEDDING_MODEL"]) {
            semantic.embedding.model = v;
        }
        if let Some(v) = get(&["EMBEDDING_PRECISION"]) {
            semantic.embedding.precision = v.parse()?;
        }

        // Pipeline
        if let Some(v) = get(&["WEBRAG_PROMPTS_DIR"]) {
            self.pipeline.prompts_dir = Some(PathBuf::from(v));
        }

        // Logging
        if let Some(v) = get(&["RUST_LOG"]) {
            self.log_level = Some(v);
        }
        if lookup("NO_COLOR").is_some() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the file.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(config_file) = overrides.config_file {
            self.config_file = Some(config_file);
        }

        if let Some(url) = overrides.search_url {
            self.search.base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(num_urls) = overrides.num_urls {
            self.search.num_urls = num_urls;
        }

        if let Some(provider) = overrides.provider {
            self.llm.provider = provider.to_lowercase();
        }

        if let Some(model) = overrides.model {
            self.llm.model = model;
        }

        if let Some(stream) = overrides.stream {
            self.llm.stream = stream;
        }

        if let Some(strategy) = overrides.strategy {
            self.reducer.strategy = strategy;
        }

        if let Some(log_level) = overrides.log_level {
            self.log_level = Some(log_level);
        }

        if overrides.verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if overrides.no_color {
            self.no_color = true;
        }

        self
    }

    /// Validate the configuration before any component is built.
    pub fn validate(&self) -> AppResult<()> {
        if self.search.base_url.is_empty() {
            return Err(AppError::Config(
                "SEARXNG_URL is not set. Please check your .env file.".to_string(),
            ));
        }

        if self.search.num_urls == 0 {
            return Err(AppError::Config("NUM_URLS must be at least 1".to_string()));
        }

        if self.search.max_retries == 0 {
            return Err(AppError::Config(
                "search.maxRetries must be at least 1".to_string(),
            ));
        }

        if !KNOWN_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        let semantic = &self.reducer.semantic;
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&semantic.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                semantic.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.reducer.max_length == 0 {
            return Err(AppError::Config(
                "reducer.maxLength must be greater than zero".to_string(),
            ));
        }

        if semantic.lower_bound >= semantic.upper_bound {
            return Err(AppError::Config(format!(
                "Similarity lower bound ({}) must be below the upper bound ({})",
                semantic.lower_bound, semantic.upper_bound
            )));
        }

        if semantic.max_chunk_size == 0 || semantic.max_chunk_size > self.reducer.max_length {
            return Err(AppError::Config(format!(
                "Chunk size ({}) must be between 1 and reducer.maxLength ({})",
                semantic.max_chunk_size, self.reducer.max_length
            )));
        }

        if semantic.top_k == 0 {
            return Err(AppError::Config("CHUNK_TOP_K must be at least 1".to_string()));
        }

        Ok(())
    }
}

/// Parse an environment value, reporting the variable name on failure.
fn parse_var<T, G>(get: &G, name: &str) -> AppResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&[&str]) -> Option<String>,
{
    match get(&[name]) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("Invalid value for {}: {} ({})", name, raw, e))),
        None => Ok(None),
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.search.base_url = "http://localhost:8080".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.search.num_urls, 5);
        assert_eq!(config.search.max_retries, 5);
        assert_eq!(config.search.initial_backoff_ms, 2000);
        assert_eq!(config.fetch.timeout_ms, 5000);
        assert_eq!(config.reducer.max_length, 1000);
        assert_eq!(config.reducer.strategy, ReducerStrategy::Truncate);
        assert_eq!(config.llm.temperature, 0.1);
        assert_eq!(config.generation.repetition_threshold, 0.5);
        assert!(!config.verbose);
    }

    #[test]
    fn test_apply_env() {
        let vars = env(&[
            ("SEARXNG_URL", "http://searx.local/"),
            ("NUM_URLS", "3"),
            ("SEARXNG_FORMAT", "json"),
            ("FETCH_TIMEOUT_MS", "2500"),
            ("DISABLE_SSL_VALIDATION", "true"),
            ("OLLAMA_MODEL", "qwen2.5"),
            ("USE_SEMANTIC_CHUNKING", "true"),
            ("EMBEDDING_PRECISION", "q8"),
        ]);

        let config = AppConfig::load_with(None, |k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.search.base_url, "http://searx.local");
        assert_eq!(config.search.num_urls, 3);
        assert_eq!(config.search.format, SearchFormat::Json);
        assert_eq!(config.fetch.timeout_ms, 2500);
        assert!(config.fetch.disable_ssl_validation);
        assert_eq!(config.llm.model, "qwen2.5");
        assert_eq!(config.reducer.strategy, ReducerStrategy::Semantic);
        assert_eq!(
            config.reducer.semantic.embedding.precision,
            EmbeddingPrecision::Q8
        );
    }

    #[test]
    fn test_invalid_env_number() {
        let vars = env(&[("NUM_URLS", "many")]);
        let result = AppConfig::load_with(None, |k| vars.get(k).cloned());
        match result {
            Err(AppError::Config(msg)) => assert!(msg.contains("NUM_URLS")),
            other => panic!("Expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_yaml_file_then_env() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("webrag.yaml");
        std::fs::write(
            &path,
            r#"
search:
  baseUrl: http://from-file:8888
  numUrls: 7
reducer:
  strategy: semantic
  semantic:
    topK: 5
llm:
  model: mistral
"#,
        )
        .unwrap();

        let vars = env(&[("LLM_MODEL", "llama3.1")]);
        let config = AppConfig::load_with(Some(&path), |k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.search.base_url, "http://from-file:8888");
        assert_eq!(config.search.num_urls, 7);
        assert_eq!(config.reducer.strategy, ReducerStrategy::Semantic);
        assert_eq!(config.reducer.semantic.top_k, 5);
        // Untouched keys keep defaults
        assert_eq!(config.reducer.semantic.lookahead, 3);
        // Environment wins over the file
        assert_eq!(config.llm.model, "llama3.1");
        assert_eq!(config.config_file.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_with_overrides() {
        let config = valid_config();
        let overridden = config.with_overrides(ConfigOverrides {
            provider: Some("Ollama".to_string()),
            model: Some("gemma2".to_string()),
            stream: Some(true),
            verbose: true,
            ..Default::default()
        });

        assert_eq!(overridden.llm.provider, "ollama");
        assert_eq!(overridden.llm.model, "gemma2");
        assert!(overridden.llm.stream);
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_missing_search_url() {
        let config = AppConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SEARXNG_URL"));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = valid_config();
        config.llm.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_inverted_bounds() {
        let mut config = valid_config();
        config.reducer.semantic.lower_bound = 0.9;
        config.reducer.semantic.upper_bound = 0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = valid_config();
        config.llm.api_key = Some("secret".to_string());
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("secret"));
    }
}

//! Embedding provider trait and factory.

use crate::embeddings::precision::QuantizedProvider;
use crate::embeddings::providers::{OllamaProvider, OpenAiProvider, TrigramProvider};
use std::sync::Arc;
use webrag_core::{AppError, AppResult, EmbeddingSettings};

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Reduce("No embedding returned".to_string()))
    }
}

/// Create an embedding provider from settings, wrapped so every vector
/// passes through the configured precision.
pub fn create_provider(settings: &EmbeddingSettings) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let inner: Arc<dyn EmbeddingProvider> = match settings.provider.to_lowercase().as_str() {
        "trigram" => Arc::new(TrigramProvider::new(settings.dimensions)),
        "ollama" => Arc::new(OllamaProvider::new(settings)?),
        "openai" => Arc::new(OpenAiProvider::new(settings)?),
        _ => {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: '{}'. Supported providers: trigram, ollama, openai",
                settings.provider
            )))
        }
    };

    tracing::debug!(
        provider = inner.provider_name(),
        model = inner.model_name(),
        dimensions = inner.dimensions(),
        precision = ?settings.precision,
        "Created embedding provider"
    );

    Ok(Arc::new(QuantizedProvider::new(inner, settings.precision)))
}

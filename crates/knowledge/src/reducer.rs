//! Page text → bounded context fragment.
//!
//! Two strategies share one length cap: sentence-boundary truncation, and
//! semantic selection of the chunks closest to the query. The semantic path
//! falls back to truncation whenever it cannot produce anything.

use crate::chunk::{
    group_sentences, lookahead_similarities, merge_similar_chunks, Chunk, GroupingParams,
};
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::sentences::{char_len, split_oversized, split_sentences};
use crate::similarity::{cosine_similarity, dynamic_threshold};
use crate::truncate::truncate_to_sentences;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use webrag_core::{AppResult, ReducerConfig, ReducerStrategy};

/// A chunk and its similarity to the query.
#[derive(Debug, Clone)]
struct ScoredChunk {
    chunk: Chunk,
    score: f32,
}

/// Reduces fetched page text to a context fragment for one query.
#[derive(Debug, Clone)]
pub struct ContentReducer {
    config: ReducerConfig,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl ContentReducer {
    /// Create a reducer. The semantic strategy gets its embedding provider
    /// from the configured settings.
    pub fn new(config: ReducerConfig) -> AppResult<Self> {
        let embedder = match config.strategy {
            ReducerStrategy::Semantic => Some(create_provider(&config.semantic.embedding)?),
            ReducerStrategy::Truncate => None,
        };
        Ok(Self { config, embedder })
    }

    /// Use a specific embedding provider for semantic selection.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn strategy(&self) -> ReducerStrategy {
        self.config.strategy
    }

    pub fn max_length(&self) -> usize {
        self.config.max_length
    }

    /// Reduce `text` to at most `max_length` characters.
    #[instrument(skip(self, text, query), fields(strategy = ?self.config.strategy, text_len = text.len()))]
    pub async fn reduce(&self, text: &str, query: &str) -> AppResult<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let embedder = match (self.config.strategy, &self.embedder) {
            (ReducerStrategy::Semantic, Some(embedder)) => embedder,
            _ => return Ok(self.truncate(text)),
        };

        match self.select_chunks(embedder.as_ref(), text, query).await {
            Ok(selected) if !selected.is_empty() => Ok(selected),
            Ok(_) => {
                debug!("No chunk reached the similarity floor, truncating instead");
                Ok(self.truncate(text))
            }
            Err(e) => {
                warn!("Semantic selection failed, truncating instead: {}", e);
                Ok(self.truncate(text))
            }
        }
    }

    fn truncate(&self, text: &str) -> String {
        truncate_to_sentences(text, self.config.max_length)
    }

    async fn select_chunks(
        &self,
        embedder: &dyn EmbeddingProvider,
        text: &str,
        query: &str,
    ) -> AppResult<String> {
        let semantic = &self.config.semantic;

        let sentences = split_oversized(split_sentences(text), semantic.max_chunk_size);
        if sentences.is_empty() {
            return Ok(String::new());
        }

        let sentence_embeddings = embedder.embed_batch(&sentences).await?;
        let similarities = lookahead_similarities(&sentence_embeddings, semantic.lookahead);
        let threshold = dynamic_threshold(
            &similarities,
            semantic.lower_bound,
            semantic.upper_bound,
            semantic.similarity_threshold,
        );

        let mut chunks = group_sentences(
            &sentences,
            &similarities,
            GroupingParams {
                threshold,
                max_chunk_size: semantic.max_chunk_size,
                overlap_sentences: semantic.overlap_sentences,
            },
        );
        debug!(
            sentences = sentences.len(),
            chunks = chunks.len(),
            threshold,
            "Grouped sentences"
        );

        let mut chunk_embeddings = embedder.embed_batch(&chunk_texts(&chunks)).await?;
        if semantic.combine_chunks && chunks.len() > 1 {
            let before = chunks.len();
            chunks = merge_similar_chunks(
                chunks,
                &chunk_embeddings,
                &sentences,
                semantic.combine_threshold,
                self.config.max_length,
            );
            if chunks.len() != before {
                debug!(before, after = chunks.len(), "Merged similar chunks");
                chunk_embeddings = embedder.embed_batch(&chunk_texts(&chunks)).await?;
            }
        }

        let query_embedding = embedder.embed(query).await?;
        let ranked = rank_chunks(
            chunks,
            &chunk_embeddings,
            &query_embedding,
            semantic.similarity_floor,
        );

        let selected = ranked.into_iter().take(semantic.top_k).map(|s| s.chunk);
        Ok(join_within(
            without_repeats(selected, &sentences),
            self.config.max_length,
        ))
    }
}

fn chunk_texts(chunks: &[Chunk]) -> Vec<String> {
    chunks.iter().map(|c| c.text.clone()).collect()
}

/// Chunks scoring at least `floor`, best first. Ties keep document order.
fn rank_chunks(
    chunks: Vec<Chunk>,
    embeddings: &[Vec<f32>],
    query: &[f32],
    floor: f32,
) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = chunks
        .into_iter()
        .zip(embeddings)
        .map(|(chunk, embedding)| ScoredChunk {
            score: cosine_similarity(embedding, query),
            chunk,
        })
        .filter(|s| s.score >= floor)
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}

/// Chunk texts minus the sentences an earlier chunk already contributed.
/// Chunks left with nothing new are dropped.
fn without_repeats(chunks: impl IntoIterator<Item = Chunk>, sentences: &[String]) -> Vec<String> {
    let mut used = vec![false; sentences.len()];

    chunks
        .into_iter()
        .filter_map(|chunk| {
            let fresh: Vec<&str> = chunk
                .sentences
                .clone()
                .filter(|&i| !used[i])
                .map(|i| sentences[i].as_str())
                .collect();
            for i in chunk.sentences {
                used[i] = true;
            }
            (!fresh.is_empty()).then(|| fresh.join(" "))
        })
        .collect()
}

/// Join with blank lines, stopping before the result would exceed `max_chars`.
fn join_within(texts: impl IntoIterator<Item = String>, max_chars: usize) -> String {
    let mut joined = String::new();
    let mut length = 0;

    for text in texts {
        let separator = if joined.is_empty() { 0 } else { 2 };
        let next = char_len(&text);
        if length + separator + next > max_chars {
            break;
        }
        if separator > 0 {
            joined.push_str("\n\n");
        }
        joined.push_str(&text);
        length += separator + next;
    }

    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use webrag_core::{AppError, SemanticConfig};

    const TOPICS: [&str; 3] = ["rust", "bread", "ocean"];

    /// One dimension per topic word.
    #[derive(Debug)]
    struct TopicProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for TopicProvider {
        fn provider_name(&self) -> &str {
            "topic"
        }

        fn model_name(&self) -> &str {
            "topic"
        }

        fn dimensions(&self) -> usize {
            TOPICS.len()
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|text| {
                    let lower = text.to_lowercase();
                    TOPICS
                        .iter()
                        .map(|t| lower.matches(t).count() as f32)
                        .collect()
                })
                .collect())
        }
    }

    #[derive(Debug)]
    struct BrokenProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for BrokenProvider {
        fn provider_name(&self) -> &str {
            "broken"
        }

        fn model_name(&self) -> &str {
            "broken"
        }

        fn dimensions(&self) -> usize {
            3
        }

        async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Err(AppError::Reduce("embedding service down".to_string()))
        }
    }

    fn semantic_config(max_length: usize) -> ReducerConfig {
        ReducerConfig {
            strategy: ReducerStrategy::Semantic,
            max_length,
            semantic: SemanticConfig {
                top_k: 1,
                ..SemanticConfig::default()
            },
        }
    }

    const PAGE: &str = "Bread needs flour and water. Good bread rises slowly. \
        Rust has a borrow checker. Rust programs avoid data races. \
        The ocean covers most of the planet. Ocean tides follow the moon.";

    #[tokio::test]
    async fn test_truncate_strategy() {
        let reducer = ContentReducer::new(ReducerConfig {
            max_length: 60,
            ..ReducerConfig::default()
        })
        .unwrap();

        let reduced = reducer.reduce(PAGE, "anything").await.unwrap();
        assert_eq!(reduced, "Bread needs flour and water. Good bread rises slowly.");
    }

    #[tokio::test]
    async fn test_semantic_selects_relevant_chunk() {
        let reducer = ContentReducer::new(semantic_config(1000))
            .unwrap()
            .with_embedder(Arc::new(TopicProvider));

        let reduced = reducer.reduce(PAGE, "Why is rust safe?").await.unwrap();
        assert!(reduced.contains("borrow checker"), "got: {reduced}");
        assert!(!reduced.contains("tides"));
        assert!(char_len(&reduced) <= 1000);
    }

    #[tokio::test]
    async fn test_semantic_falls_back_below_floor() {
        let reducer = ContentReducer::new(semantic_config(60))
            .unwrap()
            .with_embedder(Arc::new(TopicProvider));

        // The query shares no topic with the page
        let reduced = reducer.reduce(PAGE, "mountains").await.unwrap();
        assert_eq!(reduced, "Bread needs flour and water. Good bread rises slowly.");
    }

    #[tokio::test]
    async fn test_semantic_falls_back_on_embedding_error() {
        let reducer = ContentReducer::new(semantic_config(60))
            .unwrap()
            .with_embedder(Arc::new(BrokenProvider));

        let reduced = reducer.reduce(PAGE, "rust").await.unwrap();
        assert_eq!(reduced, "Bread needs flour and water. Good bread rises slowly.");
    }

    #[tokio::test]
    async fn test_semantic_with_default_trigram_provider() {
        let reducer = ContentReducer::new(ReducerConfig {
            strategy: ReducerStrategy::Semantic,
            ..ReducerConfig::default()
        })
        .unwrap();

        let reduced = reducer.reduce(PAGE, "rust borrow checker").await.unwrap();
        assert!(!reduced.is_empty());
        assert!(char_len(&reduced) <= reducer.max_length());
    }

    #[tokio::test]
    async fn test_empty_text() {
        let reducer = ContentReducer::new(ReducerConfig::default()).unwrap();
        assert_eq!(reducer.reduce("  \n ", "q").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_overlapping_chunks_do_not_repeat_sentences() {
        let reducer = ContentReducer::new(ReducerConfig {
            strategy: ReducerStrategy::Semantic,
            max_length: 1000,
            semantic: SemanticConfig {
                top_k: 3,
                overlap_sentences: 1,
                combine_chunks: false,
                ..SemanticConfig::default()
            },
        })
        .unwrap()
        .with_embedder(Arc::new(TopicProvider));

        let reduced = reducer.reduce(PAGE, "rust bread ocean").await.unwrap();
        for sentence in split_sentences(PAGE) {
            assert!(
                reduced.matches(sentence.as_str()).count() <= 1,
                "{sentence:?} repeated in {reduced:?}"
            );
        }
    }

    #[test]
    fn test_without_repeats_trims_shared_sentences() {
        let sentences: Vec<String> = vec!["A one.".into(), "B two.".into(), "C three.".into()];
        let chunks = vec![
            Chunk::from_range(&sentences, 1..3),
            Chunk::from_range(&sentences, 0..2),
            Chunk::from_range(&sentences, 1..2),
        ];

        assert_eq!(
            without_repeats(chunks, &sentences),
            vec!["B two. C three.", "A one."]
        );
    }

    #[test]
    fn test_join_within_stops_before_limit() {
        let texts = vec!["aaaa".to_string(), "bbbb".to_string(), "cc".to_string()];
        assert_eq!(join_within(texts.clone(), 10), "aaaa\n\nbbbb");
        assert_eq!(join_within(texts, 9), "aaaa");
    }

    #[test]
    fn test_rank_chunks_filters_and_orders() {
        let sentences: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        let chunks = (0..3).map(|i| Chunk::from_range(&sentences, i..i + 1)).collect();
        let embeddings = vec![vec![0.5, 0.5], vec![1.0, 0.0], vec![0.0, 1.0]];

        let ranked = rank_chunks(chunks, &embeddings, &[1.0, 0.0], 0.3);
        let texts: Vec<&str> = ranked.iter().map(|s| s.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "a"]);
    }
}

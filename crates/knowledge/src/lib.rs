//! Content reduction for retrieved web pages.
//!
//! Turns extracted page text into a context fragment of bounded length,
//! either by keeping leading whole sentences or by selecting the chunks most
//! similar to the query.

pub mod chunk;
pub mod embeddings;
pub mod reducer;
pub mod sentences;
pub mod similarity;
pub mod truncate;

// Re-export commonly used types
pub use chunk::{Chunk, GroupingParams};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use reducer::ContentReducer;
pub use sentences::{split_oversized, split_sentences};
pub use similarity::{cosine_similarity, dynamic_threshold};
pub use truncate::truncate_to_sentences;

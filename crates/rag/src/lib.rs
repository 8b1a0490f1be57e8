//! Retrieval-augmented answering over live web content.
//!
//! A run rephrases the question into a search query, fetches and reduces
//! the top results, and asks the model to answer from that context. The
//! answer is checked for length and grounding and regenerated at most once.
//!
//! # Example
//! ```no_run
//! use webrag_core::AppConfig;
//! use webrag_rag::Pipeline;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! let outcome = Pipeline::from_config(&config)?
//!     .run("How tall is Mount Everest?")
//!     .await?;
//! println!("{}", outcome.generation.text);
//! # Ok(())
//! # }
//! ```

pub mod generator;
pub mod grounding;
pub mod pipeline;
pub mod query;
pub mod repetition;
pub mod transcript;

mod request;

pub use generator::{AnswerGenerator, GenerationResult};
pub use grounding::contains_context_info;
pub use pipeline::{combine_fragments, ContextFragment, Pipeline, RunOutcome};
pub use query::{QueryReformulator, SearchQuery, MAX_QUERY_CHARS};
pub use repetition::{jaccard_similarity, RepetitionGuard};
pub use transcript::{RunTranscript, SourceRecord};

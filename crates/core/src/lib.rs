//! webrag core library
//!
//! This crate provides the foundational utilities shared by every webrag crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration for each pipeline component

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{
    AppConfig, EmbeddingPrecision, EmbeddingSettings, FetchConfig, GenerationConfig, LlmSettings,
    PipelineConfig, ReducerConfig, ReducerStrategy, SearchConfig, SearchFormat, SemanticConfig,
};
pub use error::{AppError, AppResult};

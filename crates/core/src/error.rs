//! Error types for webrag.
//!
//! This module defines a unified error enum that covers every failure
//! category in the pipeline: configuration, I/O, search, fetch, content
//! reduction, LLM calls and prompt rendering.

use thiserror::Error;

/// Unified error type for webrag.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// Only reformulation and generation failures are fatal to a run; search and
/// fetch errors are absorbed by their components.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors, including malformed responses
    #[error("LLM error: {0}")]
    Llm(String),

    /// Search backend errors
    #[error("Search error: {0}")]
    Search(String),

    /// Page fetch and extraction errors
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Content reduction and embedding errors
    #[error("Reduce error: {0}")]
    Reduce(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Other(format!("{:#}", err))
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

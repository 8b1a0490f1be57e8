//! Embedding providers used by semantic chunk selection.
//!
//! Every provider created through [`create_provider`] is wrapped so that the
//! configured precision mode applies to all vectors it returns.

pub mod precision;
pub mod provider;
pub mod providers;

pub use precision::{apply_precision, QuantizedProvider};
pub use provider::{create_provider, EmbeddingProvider};

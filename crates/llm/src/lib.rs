//! LLM integration crate for webrag.
//!
//! This crate provides a provider-agnostic abstraction for chat-style
//! language model backends, used both for query reformulation and for
//! answer generation.
//!
//! # Providers
//! - **OpenAI-compatible**: any `/chat/completions` endpoint (default)
//! - **Ollama**: native `/api/chat` endpoint
//! - **Scripted**: canned replies for tests and offline runs
//!
//! # Example
//! ```no_run
//! use webrag_llm::{LlmClient, LlmRequest, providers::OpenAiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiClient::new("http://localhost:11434/v1", None, 60)?;
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

mod lines;

// Re-export main types
pub use client::{
    ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage,
};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient, ScriptedClient, ScriptedReply};
pub use types::ProviderType;

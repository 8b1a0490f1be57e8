//! Scripted LLM client.
//!
//! Replays a fixed sequence of replies and records every request it saw.
//! Used to drive the reformulation and generation stages deterministically.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use std::collections::VecDeque;
use std::sync::Mutex;
use webrag_core::{AppError, AppResult};

/// One canned reply.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Whole text; streamed as a single increment
    Text(String),
    /// Streamed increments; concatenated for non-streaming calls
    Increments(Vec<String>),
    /// The call fails with `AppError::Llm`
    Error(String),
}

impl ScriptedReply {
    /// Shorthand for [`ScriptedReply::Text`].
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// An `LlmClient` that answers from a script.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedClient {
    /// Create a client that will return `replies` in order.
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn next_reply(&self, request: &LlmRequest) -> AppResult<ScriptedReply> {
        self.requests
            .lock()
            .map_err(|_| AppError::Llm("Scripted client lock poisoned".to_string()))?
            .push(request.clone());

        self.replies
            .lock()
            .map_err(|_| AppError::Llm("Scripted client lock poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| AppError::Llm("Scripted client has no replies left".to_string()))
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let content = match self.next_reply(request)? {
            ScriptedReply::Text(text) => text,
            ScriptedReply::Increments(parts) => parts.concat(),
            ScriptedReply::Error(message) => return Err(AppError::Llm(message)),
        };

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
            finish_reason: Some("stop".to_string()),
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        let parts = match self.next_reply(request)? {
            ScriptedReply::Text(text) => vec![text],
            ScriptedReply::Increments(parts) => parts,
            ScriptedReply::Error(message) => return Err(AppError::Llm(message)),
        };

        let chunks: Vec<AppResult<LlmStreamChunk>> = parts
            .into_iter()
            .map(|part| Ok(LlmStreamChunk::text(part)))
            .chain(std::iter::once(Ok(LlmStreamChunk::finished(None))))
            .collect();

        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

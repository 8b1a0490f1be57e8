//! OpenAI-compatible chat completions provider.
//!
//! Works against any server exposing `/chat/completions` (OpenAI, Ollama's
//! `/v1` shim, vLLM, llama.cpp server). Streaming uses server-sent events
//! terminated by `data: [DONE]`.

use crate::client::{
    ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage,
};
use crate::lines::{decode_stream, sse_data};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use webrag_core::{AppError, AppResult};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl From<Usage> for LlmUsage {
    fn from(usage: Usage) -> Self {
        LlmUsage::new(usage.prompt_tokens, usage.completion_tokens)
    }
}

/// Client for OpenAI-compatible chat completion servers.
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
}

impl OpenAiClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. `http://localhost:11434/v1`
    /// * `api_key` - Sent as a bearer token when present
    /// * `timeout_secs` - Budget for a whole non-streaming completion
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    fn to_request(&self, request: &LlmRequest, stream: bool) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: request.model.clone(),
            messages: request.messages(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        }
    }

    fn post(&self, body: &ChatCompletionRequest) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(body);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

async fn check_status(response: reqwest::Response) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(AppError::Llm(format!(
        "Chat completion API error ({}): {}",
        status, error_text
    )))
}

fn parse_sse_line(line: &str) -> Option<AppResult<LlmStreamChunk>> {
    let data = sse_data(line)?;
    if data == "[DONE]" {
        return Some(Ok(LlmStreamChunk::finished(None)));
    }

    let chunk: ChatCompletionChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => return Some(Err(AppError::Llm(format!("Failed to parse chunk: {}", e)))),
    };

    let usage = chunk.usage.map(LlmUsage::from);
    let Some(choice) = chunk.choices.into_iter().next() else {
        // Usage-only trailer some servers send before [DONE]
        return usage.map(|u| {
            Ok(LlmStreamChunk {
                content: String::new(),
                done: false,
                usage: Some(u),
            })
        });
    };

    Some(Ok(LlmStreamChunk {
        content: choice.delta.content.unwrap_or_default(),
        done: choice.finish_reason.is_some(),
        usage,
    }))
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, "Sending chat completion request");

        let response = self
            .post(&self.to_request(request, false))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send chat request: {}", e)))?;
        let response = check_status(response).await?;

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse chat response: {}", e)))?;

        let usage = parsed.usage.map(LlmUsage::from).unwrap_or_default();
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Llm("Chat response has no choices".to_string()))?;
        let content = choice
            .message
            .and_then(|m| m.content)
            .ok_or_else(|| AppError::Llm("Chat response has no message content".to_string()))?;

        tracing::debug!(tokens = usage.total_tokens, "Received chat completion");

        Ok(LlmResponse {
            content,
            model: parsed.model,
            usage,
            finish_reason: choice.finish_reason,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::debug!(model = %request.model, "Starting streaming chat request");

        let response = self
            .post(&self.to_request(request, true))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send streaming request: {}", e)))?;
        let response = check_status(response).await?;

        Ok(decode_stream(response, parse_sse_line))
    }
}

//! Ollama LLM provider implementation.
//!
//! This module talks to Ollama's native chat endpoint.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{
    ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage,
};
use crate::lines::decode_stream;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use webrag_core::{AppError, AppResult};

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

/// Ollama API response format (also one NDJSON line when streaming).
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    model: String,
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

impl OllamaChatResponse {
    fn usage(&self) -> LlmUsage {
        LlmUsage::new(
            self.prompt_eval_count.unwrap_or(0),
            self.eval_count.unwrap_or(0),
        )
    }
}

/// Ollama LLM client.
pub struct OllamaClient {
    /// Base URL for Ollama API, without the OpenAI-compatible `/v1` suffix
    base_url: String,

    /// HTTP client
    client: reqwest::Client,

    /// Budget for a whole non-streaming completion
    timeout: Duration,
}

impl OllamaClient {
    /// Create a new Ollama client.
    ///
    /// A trailing `/v1` is stripped so the same base URL works for both the
    /// OpenAI-compatible and native providers.
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: normalize_base_url(&base_url.into()),
            client,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Create a client against the local default endpoint.
    pub fn local() -> AppResult<Self> {
        Self::new("http://localhost:11434", 120)
    }

    /// Convert LlmRequest to Ollama format.
    fn to_ollama_request(&self, request: &LlmRequest, stream: bool) -> OllamaChatRequest {
        OllamaChatRequest {
            model: request.model.clone(),
            messages: request.messages(),
            stream,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    trimmed
        .strip_suffix("/v1")
        .unwrap_or(trimmed)
        .to_string()
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
        "Ollama API error ({}): {}",
        status, error_text
    )))
}

fn parse_stream_line(line: &str) -> Option<AppResult<LlmStreamChunk>> {
    let parsed: OllamaChatResponse = match serde_json::from_str(line) {
        Ok(parsed) => parsed,
        Err(e) => return Some(Err(AppError::Llm(format!("Failed to parse chunk: {}", e)))),
    };

    let content = parsed
        .message
        .as_ref()
        .map(|m| m.content.clone())
        .unwrap_or_default();

    Some(Ok(LlmStreamChunk {
        content,
        done: parsed.done,
        usage: parsed.done.then(|| parsed.usage()),
    }))
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, "Sending completion request to Ollama");

        let response = self
            .client
            .post(self.chat_url())
            .timeout(self.timeout)
            .json(&self.to_ollama_request(request, false))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Ollama: {}", e)))?;
        let response = check_status(response).await?;

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        let usage = parsed.usage();
        let content = parsed
            .message
            .map(|m| m.content)
            .ok_or_else(|| AppError::Llm("Ollama response has no message".to_string()))?;

        tracing::debug!(tokens = usage.total_tokens, "Received completion from Ollama");

        Ok(LlmResponse {
            content,
            model: parsed.model,
            usage,
            finish_reason: parsed.done_reason,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::debug!(model = %request.model, "Starting streaming request to Ollama");

        let response = self
            .client
            .post(self.chat_url())
            .json(&self.to_ollama_request(request, true))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send streaming request: {}", e)))?;
        let response = check_status(response).await?;

        Ok(decode_stream(response, parse_stream_line))
    }
}

//! Line reassembly for streamed response bodies.
//!
//! Network chunks do not respect line boundaries, so both NDJSON (Ollama)
//! and server-sent events (OpenAI) need a buffer that only releases
//! complete lines.

use crate::client::{LlmStream, LlmStreamChunk};
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use webrag_core::{AppError, AppResult};

type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>;

struct DecodeState<F> {
    body: ByteStream,
    decoder: LineDecoder,
    pending: VecDeque<AppResult<LlmStreamChunk>>,
    parse: F,
    finished: bool,
}

/// Turn a streaming HTTP body into an `LlmStream`, one parsed item per line.
///
/// `parse` returns `None` for lines that carry no chunk (comments,
/// keep-alives).
pub(crate) fn decode_stream<F>(response: reqwest::Response, parse: F) -> LlmStream
where
    F: Fn(&str) -> Option<AppResult<LlmStreamChunk>> + Send + 'static,
{
    let body: ByteStream = Box::pin(response.bytes_stream().map(|r| r.map(|b| b.to_vec())));

    let state = DecodeState {
        body,
        decoder: LineDecoder::default(),
        pending: VecDeque::new(),
        parse,
        finished: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => {
                    for line in state.decoder.push(&bytes) {
                        if let Some(item) = (state.parse)(&line) {
                            state.pending.push_back(item);
                        }
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state
                        .pending
                        .push_back(Err(AppError::Llm(format!("Stream error: {}", e))));
                }
                None => {
                    state.finished = true;
                    if let Some(line) = state.decoder.finish() {
                        if let Some(item) = (state.parse)(&line) {
                            state.pending.push_back(item);
                        }
                    }
                }
            }
        }
    }))
}

#[derive(Debug, Default)]
pub(crate) struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    /// Feed bytes, returning every complete non-empty line.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            let text = text.trim();
            if !text.is_empty() {
                lines.push(text.to_string());
            }
        }
        lines
    }

    /// Whatever is left once the body ends.
    pub(crate) fn finish(&mut self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.buffer).trim().to_string();
        self.buffer.clear();
        (!rest.is_empty()).then_some(rest)
    }
}

/// Extract the payload of an SSE `data:` line.
pub(crate) fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

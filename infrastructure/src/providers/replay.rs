//! Replay model client.
//!
//! Serves a fixed script of model turns instead of calling a provider. Used
//! by the CLI for offline runs and by tests that need a deterministic model.
//!
//! Script format (JSON):
//!
//! ```json
//! {
//!   "model": "replay",
//!   "turns": [
//!     { "text": "Let me check.",
//!       "tool_calls": [ { "name": "get_weather", "arguments": { "city": "Oslo" } } ] },
//!     { "text": "It is sunny in Oslo." }
//!   ]
//! }
//! ```
//!
//! `arguments` may be a JSON object or a pre-encoded string. Missing call ids
//! are generated as `call_<turn>_<index>`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tooloop_application::{GatewayError, LlmGateway, StreamHandle};
use tooloop_domain::{
    ContentBlock, LlmResponse, Message, StopReason, StreamChunk, ToolCallChunk,
};
use tracing::{debug, trace};

/// Default capacity of the streaming channel
pub const DEFAULT_STREAM_BUFFER: usize = 64;

/// Bytes of argument text per streamed fragment
const DEFAULT_FRAGMENT_SIZE: usize = 8;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Failed to read replay script {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid replay script: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct Script {
    #[serde(default)]
    model: Option<String>,
    turns: Vec<ScriptTurn>,
}

#[derive(Debug, Deserialize)]
struct ScriptTurn {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ScriptToolCall>,
}

#[derive(Debug, Deserialize)]
struct ScriptToolCall {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    arguments: Value,
}

impl ScriptToolCall {
    fn encoded_arguments(&self) -> String {
        match &self.arguments {
            Value::Null => "{}".to_string(),
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        }
    }
}

impl ScriptTurn {
    fn into_response(self, turn: usize, model: Option<&str>) -> LlmResponse {
        let mut content = Vec::new();
        if let Some(text) = self.text
            && !text.is_empty()
        {
            content.push(ContentBlock::text(text));
        }
        let has_calls = !self.tool_calls.is_empty();
        for (index, call) in self.tool_calls.iter().enumerate() {
            let id = call
                .id
                .clone()
                .unwrap_or_else(|| format!("call_{}_{}", turn, index));
            content.push(ContentBlock::tool_use(id, &call.name, call.encoded_arguments()));
        }

        let stop_reason = if has_calls {
            StopReason::ToolUse
        } else {
            StopReason::EndTurn
        };
        let response = LlmResponse::new(content).with_stop_reason(stop_reason);
        match model {
            Some(model) => response.with_model(model),
            None => response,
        }
    }
}

/// Model client that replays scripted turns in order.
pub struct ReplayModelClient {
    turns: Mutex<VecDeque<LlmResponse>>,
    stream_buffer: usize,
    fragment_size: usize,
}

impl ReplayModelClient {
    pub fn new(turns: Vec<LlmResponse>) -> Self {
        Self {
            turns: Mutex::new(VecDeque::from(turns)),
            stream_buffer: DEFAULT_STREAM_BUFFER,
            fragment_size: DEFAULT_FRAGMENT_SIZE,
        }
    }

    /// Parse a JSON script.
    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        let script: Script = serde_json::from_str(json)?;
        let model = script.model.as_deref();
        let turns = script
            .turns
            .into_iter()
            .enumerate()
            .map(|(i, turn)| turn.into_response(i + 1, model))
            .collect();
        Ok(Self::new(turns))
    }

    /// Load a JSON script from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Capacity of the chunk channel used by `chat_stream`.
    pub fn with_stream_buffer(mut self, capacity: usize) -> Self {
        self.stream_buffer = capacity.max(1);
        self
    }

    /// Size of each streamed argument fragment.
    pub fn with_fragment_size(mut self, size: usize) -> Self {
        self.fragment_size = size.max(1);
        self
    }

    /// Turns not yet served.
    pub fn remaining(&self) -> usize {
        self.turns.lock().map(|turns| turns.len()).unwrap_or(0)
    }

    fn next_turn(&self, messages: &[Message], tools: Option<&[Value]>) -> Result<LlmResponse, GatewayError> {
        let mut turns = self
            .turns
            .lock()
            .map_err(|_| GatewayError::Other("replay script lock poisoned".to_string()))?;
        let response = turns.pop_front().ok_or_else(|| {
            GatewayError::RequestFailed("replay script has no more turns".to_string())
        })?;
        debug!(
            messages = messages.len(),
            tools = tools.map_or(0, |t| t.len()),
            remaining = turns.len(),
            "Replaying model turn"
        );
        Ok(response)
    }

    /// Break a response into the chunks a streaming provider would send.
    fn fragment(&self, response: LlmResponse) -> Vec<StreamChunk> {
        let mut chunks = Vec::new();
        let mut index = 0;
        for block in response.content {
            match block {
                ContentBlock::Text { text } => {
                    for word in text.split_inclusive(' ') {
                        chunks.push(StreamChunk::text(word));
                    }
                }
                ContentBlock::ToolUse {
                    id,
                    name,
                    arguments,
                } => {
                    chunks.push(StreamChunk::tool_call(
                        ToolCallChunk::new(index).with_id(id).with_name(name),
                    ));
                    for piece in split_at_chars(&arguments, self.fragment_size) {
                        chunks.push(StreamChunk::tool_call(
                            ToolCallChunk::new(index).with_arguments(piece),
                        ));
                    }
                    index += 1;
                }
            }
        }
        chunks.push(StreamChunk::finished());
        chunks
    }
}

/// Split `text` into pieces of about `size` bytes on char boundaries.
fn split_at_chars(text: &str, size: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if current.len() >= size {
            pieces.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

#[async_trait]
impl LlmGateway for ReplayModelClient {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[Value]>,
    ) -> Result<LlmResponse, GatewayError> {
        self.next_turn(messages, tools)
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: Option<&[Value]>,
    ) -> Result<StreamHandle, GatewayError> {
        let chunks = self.fragment(self.next_turn(messages, tools)?);
        let (tx, rx) = mpsc::channel(self.stream_buffer);

        tokio::spawn(async move {
            for chunk in chunks {
                if tx.send(Ok(chunk)).await.is_err() {
                    trace!("Stream receiver dropped");
                    break;
                }
            }
        });

        Ok(StreamHandle::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tooloop_domain::StreamAccumulator;

    const SCRIPT: &str = r#"{
        "model": "replay-1",
        "turns": [
            {
                "text": "Let me check.",
                "tool_calls": [
                    { "name": "get_weather", "arguments": { "city": "Oslo" } },
                    { "id": "fixed", "name": "echo", "arguments": "{\"text\":\"hi\"}" }
                ]
            },
            { "text": "It is sunny in Oslo." }
        ]
    }"#;

    #[tokio::test]
    async fn test_chat_replays_turns_in_order() {
        let client = ReplayModelClient::from_json(SCRIPT).unwrap();
        assert_eq!(client.remaining(), 2);

        let first = client.chat(&[], None).await.unwrap();
        assert_eq!(first.model.as_deref(), Some("replay-1"));
        assert_eq!(first.stop_reason, Some(StopReason::ToolUse));
        let calls = first.tool_calls();
        assert_eq!(calls[0].id, "call_1_0");
        assert_eq!(calls[0].arguments, r#"{"city":"Oslo"}"#);
        assert_eq!(calls[1].id, "fixed");
        assert_eq!(calls[1].arguments, r#"{"text":"hi"}"#);

        let second = client.chat(&[], None).await.unwrap();
        assert_eq!(second.text_content(), "It is sunny in Oslo.");

        let err = client.chat(&[], None).await.unwrap_err();
        assert!(matches!(err, GatewayError::RequestFailed(_)));
    }

    #[tokio::test]
    async fn test_stream_reassembles_to_same_calls() {
        let client = ReplayModelClient::from_json(SCRIPT)
            .unwrap()
            .with_stream_buffer(2)
            .with_fragment_size(3);

        let chunks = client.chat_stream(&[], None).await.unwrap().collect().await.unwrap();
        assert!(chunks.len() > 6);
        assert!(chunks.last().unwrap().is_final);

        let mut accumulator = StreamAccumulator::new();
        for chunk in &chunks {
            accumulator.push(chunk);
        }
        let turn = accumulator.finish();
        assert_eq!(turn.content, "Let me check.");
        assert_eq!(turn.tool_calls.len(), 2);
        assert_eq!(turn.tool_calls[0].arguments, r#"{"city":"Oslo"}"#);
        assert_eq!(turn.tool_calls[1].id, "fixed");
    }

    #[test]
    fn test_split_keeps_multibyte_chars_whole() {
        let pieces = split_at_chars("aéü€b", 2);
        assert_eq!(pieces.concat(), "aéü€b");
        assert!(pieces.iter().all(|p| !p.is_empty()));
    }

    #[test]
    fn test_invalid_script() {
        assert!(matches!(
            ReplayModelClient::from_json("{\"turns\": 3}"),
            Err(ReplayError::Parse(_))
        ));
        assert!(matches!(
            ReplayModelClient::from_file("/definitely/not/here.json"),
            Err(ReplayError::Io { .. })
        ));
    }
}

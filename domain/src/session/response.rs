//! Model response types.
//!
//! A single model turn returns an [`LlmResponse`]: an ordered list of content
//! blocks mixing text and tool-use requests. In streaming mode the same
//! response is reassembled from [`StreamChunk`]s by the
//! [`StreamAccumulator`](crate::tool::accumulator::StreamAccumulator).
//!
//! ```text
//! chat()        → LlmResponse                        → tool_calls()
//! chat_stream() → StreamChunk* → StreamAccumulator  → LlmResponse
//! ```

use super::stream::{StreamChunk, ToolCallChunk};
use crate::tool::entities::ToolCallRequest;
use serde::{Deserialize, Serialize};

/// A single block of content within a model response.
///
/// # Examples
///
/// ```
/// use tooloop_domain::session::response::ContentBlock;
///
/// let text = ContentBlock::Text { text: "Checking the weather.".to_string() };
/// assert!(text.as_text().is_some());
///
/// let tool = ContentBlock::ToolUse {
///     id: "call_1".to_string(),
///     name: "get_weather".to_string(),
///     arguments: r#"{"city":"Paris"}"#.to_string(),
/// };
/// assert!(tool.as_tool_use().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text produced by the model.
    Text { text: String },

    /// A tool-use request.
    ToolUse {
        /// Provider-assigned id, echoed back on the tool reply.
        id: String,
        /// Requested tool name.
        name: String,
        /// Raw JSON-encoded arguments, exactly as the model sent them.
        arguments: String,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn tool_use(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        ContentBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Returns the text content if this is a `Text` block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Returns `(id, name, arguments)` if this is a `ToolUse` block.
    pub fn as_tool_use(&self) -> Option<(&str, &str, &str)> {
        match self {
            ContentBlock::ToolUse {
                id,
                name,
                arguments,
            } => Some((id, name, arguments)),
            _ => None,
        }
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of response.
    EndTurn,
    /// The model wants tools executed.
    ToolUse,
    /// Hit the token limit; the response may be truncated.
    MaxTokens,
    /// Provider-specific stop reason.
    Other(String),
}

/// A complete response from one model call.
///
/// # Examples
///
/// ```
/// use tooloop_domain::session::response::{ContentBlock, LlmResponse, StopReason};
///
/// let response = LlmResponse::from_text("Hello!");
/// assert_eq!(response.text_content(), "Hello!");
/// assert!(!response.has_tool_calls());
///
/// let response = LlmResponse::new(vec![
///     ContentBlock::text("Looking it up."),
///     ContentBlock::tool_use("call_1", "get_weather", r#"{"city":"A"}"#),
/// ])
/// .with_stop_reason(StopReason::ToolUse);
/// assert_eq!(response.tool_calls().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Content blocks in arrival order.
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    /// Why the model stopped generating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    /// Model identifier, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl LlmResponse {
    pub fn new(content: Vec<ContentBlock>) -> Self {
        Self {
            content,
            stop_reason: None,
            model: None,
        }
    }

    /// Create a text-only response.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            stop_reason: Some(StopReason::EndTurn),
            model: None,
        }
    }

    pub fn with_stop_reason(mut self, reason: StopReason) -> Self {
        self.stop_reason = Some(reason);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Concatenate all `Text` blocks into a single string.
    pub fn text_content(&self) -> String {
        self.content.iter().filter_map(|b| b.as_text()).collect()
    }

    /// Extract all `ToolUse` blocks, in order.
    pub fn tool_calls(&self) -> Vec<ToolCallRequest> {
        self.content
            .iter()
            .filter_map(|b| b.as_tool_use())
            .map(|(id, name, arguments)| ToolCallRequest::new(id, name, arguments))
            .collect()
    }

    /// Returns `true` if the response contains any tool-use requests.
    pub fn has_tool_calls(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }

    /// Split this response into stream chunks.
    ///
    /// Used by model clients that cannot stream natively: text blocks become
    /// text deltas, each tool-use block becomes one indexed chunk, and a
    /// final marker closes the sequence.
    pub fn into_chunks(self) -> Vec<StreamChunk> {
        let mut chunks = Vec::with_capacity(self.content.len() + 1);
        let mut index = 0;
        for block in self.content {
            match block {
                ContentBlock::Text { text } => chunks.push(StreamChunk::text(text)),
                ContentBlock::ToolUse {
                    id,
                    name,
                    arguments,
                } => {
                    chunks.push(StreamChunk::tool_call(
                        ToolCallChunk::new(index)
                            .with_id(id)
                            .with_name(name)
                            .with_arguments(arguments),
                    ));
                    index += 1;
                }
            }
        }
        chunks.push(StreamChunk::finished());
        chunks
    }
}

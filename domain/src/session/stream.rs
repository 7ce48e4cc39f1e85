//! Streaming chunks from a model response.
//!
//! A streamed turn arrives as a sequence of [`StreamChunk`]s. Each chunk may
//! carry a text delta, a fragment of one tool call, or both. Tool-call
//! fragments are keyed by `index`: the id and name usually arrive first, then
//! the argument JSON trickles in across many chunks and must be concatenated.

use serde::{Deserialize, Serialize};

/// Fragment of a tool call within a streamed response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolCallChunk {
    /// Position of the call within the turn. Chunks without an index are
    /// malformed and get dropped by the accumulator.
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments_fragment: Option<String>,
}

impl ToolCallChunk {
    pub fn new(index: usize) -> Self {
        Self {
            index: Some(index),
            ..Self::default()
        }
    }

    /// A fragment with no index.
    pub fn unindexed() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_arguments(mut self, fragment: impl Into<String>) -> Self {
        self.arguments_fragment = Some(fragment.into());
        self
    }
}

/// One incremental unit of a streamed model response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_delta: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallChunk>,
    #[serde(default)]
    pub is_final: bool,
}

impl StreamChunk {
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            text_delta: Some(delta.into()),
            ..Self::default()
        }
    }

    pub fn tool_call(chunk: ToolCallChunk) -> Self {
        Self {
            tool_call: Some(chunk),
            ..Self::default()
        }
    }

    /// Terminal marker for the turn.
    pub fn finished() -> Self {
        Self {
            is_final: true,
            ..Self::default()
        }
    }
}

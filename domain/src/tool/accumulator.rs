//! Reassembly of streamed tool calls.
//!
//! Providers stream a tool call as a series of fragments sharing an `index`:
//!
//! ```text
//! {index: 0, id: "c1", name: "f"}
//! {index: 0, args: "{\"x\":"}
//! {index: 0, args: "1}"}          →  ToolCallRequest { id: "c1", name: "f", arguments: "{\"x\":1}" }
//! ```
//!
//! [`StreamAccumulator`] folds a whole turn's chunks into complete
//! [`ToolCallRequest`]s plus the concatenated text content.

use super::entities::ToolCallRequest;
use crate::session::response::{ContentBlock, LlmResponse, StopReason};
use crate::session::stream::{StreamChunk, ToolCallChunk};
use std::collections::BTreeMap;
use tracing::{trace, warn};

#[derive(Debug, Clone, Default)]
struct PartialCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Result of draining one streamed turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulatedTurn {
    /// Text deltas, concatenated in arrival order
    pub content: String,
    /// Complete tool calls, in index order
    pub tool_calls: Vec<ToolCallRequest>,
}

impl AccumulatedTurn {
    /// View this turn as a non-streamed response.
    pub fn into_response(self) -> LlmResponse {
        let stop_reason = if self.tool_calls.is_empty() {
            StopReason::EndTurn
        } else {
            StopReason::ToolUse
        };
        let mut content = Vec::with_capacity(self.tool_calls.len() + 1);
        if !self.content.is_empty() {
            content.push(ContentBlock::text(self.content));
        }
        content.extend(
            self.tool_calls
                .into_iter()
                .map(|c| ContentBlock::tool_use(c.id, c.name, c.arguments)),
        );
        LlmResponse::new(content).with_stop_reason(stop_reason)
    }
}

/// Folds stream chunks into text and complete tool calls.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    calls: BTreeMap<usize, PartialCall>,
    dropped: usize,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk.
    pub fn push(&mut self, chunk: &StreamChunk) {
        if let Some(delta) = &chunk.text_delta {
            self.text.push_str(delta);
        }
        if let Some(call) = &chunk.tool_call {
            self.push_tool_call(call);
        }
    }

    /// Feed one tool-call fragment.
    ///
    /// Fragments without an index are dropped. Empty id, name and argument
    /// strings are ignored; later ids and names overwrite earlier ones while
    /// argument fragments are appended.
    pub fn push_tool_call(&mut self, chunk: &ToolCallChunk) {
        let Some(index) = chunk.index else {
            self.dropped += 1;
            warn!(
                id = chunk.id.as_deref().unwrap_or(""),
                name = chunk.name.as_deref().unwrap_or(""),
                "Dropping tool call chunk without index"
            );
            return;
        };

        let entry = self.calls.entry(index).or_default();
        if let Some(id) = chunk.id.as_deref().filter(|s| !s.is_empty()) {
            entry.id = Some(id.to_string());
        }
        if let Some(name) = chunk.name.as_deref().filter(|s| !s.is_empty()) {
            entry.name = Some(name.to_string());
        }
        if let Some(fragment) = &chunk.arguments_fragment {
            entry.arguments.push_str(fragment);
        }
    }

    /// Number of fragments dropped for lacking an index
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Consume the accumulator, emitting calls that have both an id and a name.
    pub fn finish(self) -> AccumulatedTurn {
        let tool_calls = self
            .calls
            .into_iter()
            .filter_map(|(index, partial)| match (partial.id, partial.name) {
                (Some(id), Some(name)) => Some(ToolCallRequest::new(id, name, partial.arguments)),
                _ => {
                    trace!(index, "Discarding incomplete tool call");
                    None
                }
            })
            .collect();

        AccumulatedTurn {
            content: self.text,
            tool_calls,
        }
    }
}

/// Assemble complete tool calls from a finite sequence of fragments.
pub fn accumulate<'a>(chunks: impl IntoIterator<Item = &'a ToolCallChunk>) -> Vec<ToolCallRequest> {
    let mut acc = StreamAccumulator::new();
    for chunk in chunks {
        acc.push_tool_call(chunk);
    }
    acc.finish().tool_calls
}

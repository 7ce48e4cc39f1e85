//! Run progress port.
//!
//! [`RunObserver`] is an **output port** for callers that want to follow a
//! run as it happens: every raw model chunk and response, and every tool
//! invocation. All methods default to no-ops, so implementers only override
//! the callbacks they care about.
//!
//! [`ChannelObserver`] forwards owned [`RunEvent`]s over an unbounded channel,
//! which is the simplest way to consume them from another task.

use std::time::Duration;
use tokio::sync::mpsc;
use tooloop_domain::{LlmResponse, StreamChunk, ToolCallRequest, ToolOutcome};

/// Progress callbacks for one orchestration run.
pub trait RunObserver: Send + Sync {
    /// Called before each model call. `turn` counts from 1.
    fn on_turn_start(&self, _turn: usize, _tools_attached: bool) {}

    /// Called for every raw chunk of a streamed turn, in arrival order.
    fn on_chunk(&self, _chunk: &StreamChunk) {}

    /// Called with each complete (or reassembled) model response.
    fn on_response(&self, _response: &LlmResponse) {}

    /// Called when a tool call is dispatched.
    fn on_tool_started(&self, _call: &ToolCallRequest) {}

    /// Called when a tool call resolves, in request order.
    fn on_tool_finished(&self, _call: &ToolCallRequest, _outcome: &ToolOutcome, _elapsed: Duration) {}

    /// Called when the turn cap is reached and tools are withheld.
    fn on_forced_final(&self, _turns: usize) {}
}

/// No-op observer.
pub struct NoRunObserver;

impl RunObserver for NoRunObserver {}

/// Owned copy of an observer callback.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    TurnStarted { turn: usize, tools_attached: bool },
    Chunk(StreamChunk),
    Response(LlmResponse),
    ToolStarted(ToolCallRequest),
    ToolFinished {
        call: ToolCallRequest,
        outcome: ToolOutcome,
        elapsed: Duration,
    },
    ForcedFinal { turns: usize },
}

/// Observer that forwards every callback as a [`RunEvent`].
///
/// Send failures (receiver dropped) are ignored.
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelObserver {
    pub fn new(sender: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self { sender }
    }

    /// Observer plus the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn emit(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }
}

impl RunObserver for ChannelObserver {
    fn on_turn_start(&self, turn: usize, tools_attached: bool) {
        self.emit(RunEvent::TurnStarted {
            turn,
            tools_attached,
        });
    }

    fn on_chunk(&self, chunk: &StreamChunk) {
        self.emit(RunEvent::Chunk(chunk.clone()));
    }

    fn on_response(&self, response: &LlmResponse) {
        self.emit(RunEvent::Response(response.clone()));
    }

    fn on_tool_started(&self, call: &ToolCallRequest) {
        self.emit(RunEvent::ToolStarted(call.clone()));
    }

    fn on_tool_finished(&self, call: &ToolCallRequest, outcome: &ToolOutcome, elapsed: Duration) {
        self.emit(RunEvent::ToolFinished {
            call: call.clone(),
            outcome: outcome.clone(),
            elapsed,
        });
    }

    fn on_forced_final(&self, turns: usize) {
        self.emit(RunEvent::ForcedFinal { turns });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_observer_forwards_events() {
        let (observer, mut rx) = ChannelObserver::channel();
        observer.on_turn_start(1, true);
        observer.on_chunk(&StreamChunk::text("he"));
        observer.on_forced_final(3);

        assert_eq!(
            rx.try_recv().unwrap(),
            RunEvent::TurnStarted {
                turn: 1,
                tools_attached: true
            }
        );
        assert_eq!(rx.try_recv().unwrap(), RunEvent::Chunk(StreamChunk::text("he")));
        assert_eq!(rx.try_recv().unwrap(), RunEvent::ForcedFinal { turns: 3 });
    }

    #[test]
    fn dropped_receiver_is_ignored() {
        let (observer, rx) = ChannelObserver::channel();
        drop(rx);
        observer.on_turn_start(1, false);
    }
}

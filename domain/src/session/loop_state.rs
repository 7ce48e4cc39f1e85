//! Turn bookkeeping for the orchestration loop.

/// Counts tool-executing turns against a cap.
///
/// The loop is done either when a turn requests no tools or when
/// `turn_count` reaches `cap`; in the latter case one final call is made
/// with tools withheld.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopState {
    turn_count: usize,
    cap: usize,
}

impl LoopState {
    pub fn new(cap: usize) -> Self {
        Self { turn_count: 0, cap }
    }

    /// Record one finished tool-executing turn.
    pub fn record_tool_turn(&mut self) {
        self.turn_count += 1;
    }

    /// Whether the cap has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.turn_count >= self.cap
    }

    pub fn turn_count(&self) -> usize {
        self.turn_count
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn remaining(&self) -> usize {
        self.cap.saturating_sub(self.turn_count)
    }
}

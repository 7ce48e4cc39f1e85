//! Terminal rendering of run events.
//!
//! Streamed text goes to stdout as it arrives; tool activity goes to stderr.

use std::io::Write;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tooloop_application::RunEvent;
use tooloop_domain::ToolOutcome;
use tooloop_domain::core::string::{preview, single_line};

pub struct ProgressPrinter {
    quiet: bool,
}

impl ProgressPrinter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Print events until the observer is dropped.
    ///
    /// Resolves to whether any streamed text was printed.
    pub fn spawn(self, mut events: UnboundedReceiver<RunEvent>) -> JoinHandle<bool> {
        tokio::spawn(async move {
            let mut streamed = false;
            while let Some(event) = events.recv().await {
                streamed |= self.render(&event);
            }
            streamed
        })
    }

    fn render(&self, event: &RunEvent) -> bool {
        match event {
            RunEvent::Chunk(chunk) => {
                if let Some(delta) = &chunk.text_delta {
                    let mut stdout = std::io::stdout().lock();
                    let _ = write!(stdout, "{}", delta);
                    let _ = stdout.flush();
                    return !delta.is_empty();
                }
            }
            _ if self.quiet => {}
            RunEvent::ToolStarted(call) => {
                eprintln!(
                    "  -> {}({})",
                    call.name,
                    preview(&single_line(&call.arguments), 80)
                );
            }
            RunEvent::ToolFinished {
                call,
                outcome,
                elapsed,
            } => {
                let status = match outcome {
                    ToolOutcome::Error(message) => format!("failed: {}", preview(message, 80)),
                    ToolOutcome::Multimodal { caption, .. } => format!("image: {}", caption),
                    ToolOutcome::Plain(_) => "ok".to_string(),
                };
                eprintln!("  <- {} {} ({}ms)", call.name, status, elapsed.as_millis());
            }
            RunEvent::ForcedFinal { turns } => {
                eprintln!("  tool turn cap reached after {} turns, asking for a final answer", turns);
            }
            RunEvent::TurnStarted { .. } | RunEvent::Response(_) => {}
        }
        false
    }
}

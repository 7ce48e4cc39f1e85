//! Concurrent tool executor.
//!
//! Runs every tool call of one model turn at the same time and turns the
//! outcomes into transcript entries. `Tool` replies come first in request
//! order, followed by the entries for image results in request order.
//!
//! ```text
//! requests ──┬─ lookup ✗ ─────────────────────────────▶ Error (no task)
//!            ├─ parse args ✗ ─────────────────────────▶ Error (no task)
//!            └─ tokio::spawn(timeout(invoke(args))) ──▶ Plain | Multimodal | Error
//!                                   │
//!                          join_all (fan-in barrier)
//!                                   │
//!      tool replies in request order, then image pairs in request order
//! ```
//!
//! Failures never escape: unknown tools, malformed arguments, capability
//! errors, timeouts and panics all become [`ToolOutcome::Error`] and are
//! written into the transcript for the model to see. A failing call never
//! cancels its siblings.
//!
//! The executor never touches the transcript. For image results it reports
//! the call ids the loop must detach from the requesting assistant message.

use crate::ports::observer::RunObserver;
use crate::registry::CapabilityRegistry;
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tooloop_domain::core::string::{preview, single_line};
use tooloop_domain::{ContentPart, ImageRef, Message, ToolCallRequest, ToolError, ToolOutcome};
use tracing::{debug, warn};

/// Result of one executed batch.
#[derive(Debug, Clone, Default)]
pub struct ToolBatchOutput {
    /// Messages to append: tool replies, then image pairs.
    pub entries: Vec<Message>,
    /// One outcome per request, aligned with the request list.
    pub outcomes: Vec<ToolOutcome>,
    /// Call ids answered with an image; their requests must be detached
    /// from the assistant message that issued them.
    pub detached: Vec<String>,
}

impl ToolBatchOutput {
    pub fn error_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_error()).count()
    }
}

/// Executes a batch of tool calls concurrently against a registry.
#[derive(Clone)]
pub struct ConcurrentToolExecutor {
    registry: Arc<CapabilityRegistry>,
    timeout: Option<Duration>,
}

impl ConcurrentToolExecutor {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            registry,
            timeout: None,
        }
    }

    /// Per-call timeout; an elapsed call becomes a `TIMEOUT` error.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute `requests` concurrently and map the outcomes to messages.
    ///
    /// `snapshot` is the transcript as it stands, including the assistant
    /// message that issued `requests`. It is only read.
    pub async fn execute(
        &self,
        requests: &[ToolCallRequest],
        snapshot: &[Message],
        observer: &dyn RunObserver,
    ) -> ToolBatchOutput {
        for request in requests {
            if !snapshot.iter().any(|m| m.requested(&request.id)) {
                warn!(
                    tool = %request.name,
                    id = %request.id,
                    "Tool call was not issued by any assistant message in the transcript"
                );
            }
        }

        let started = Instant::now();
        let futures: Vec<BoxFuture<'static, (ToolOutcome, Duration)>> = requests
            .iter()
            .map(|request| {
                observer.on_tool_started(request);
                self.dispatch(request)
            })
            .collect();

        let results = join_all(futures).await;
        debug!(
            calls = requests.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tool batch finished"
        );

        let mut output = ToolBatchOutput::default();
        for (request, (outcome, elapsed)) in requests.iter().zip(results) {
            observer.on_tool_finished(request, &outcome, elapsed);
            if let ToolOutcome::Error(message) = &outcome {
                warn!(tool = %request.name, id = %request.id, error = %message, "Tool call failed");
            }
            output.outcomes.push(outcome);
        }

        // Tool replies must directly follow the assistant message that issued
        // the calls, so image pairs go after every reply.
        for (request, outcome) in requests.iter().zip(&output.outcomes) {
            if !outcome.is_multimodal() {
                output
                    .entries
                    .push(Message::tool(&request.id, outcome.reply_content()));
            }
        }
        for (request, outcome) in requests.iter().zip(&output.outcomes) {
            if let ToolOutcome::Multimodal { caption, image } = outcome {
                output.entries.extend(image_entries(request, caption, image));
                output.detached.push(request.id.clone());
            }
        }
        output
    }

    /// Resolve one request into a future of its outcome.
    ///
    /// Lookup and argument failures resolve immediately; everything else
    /// runs on its own task so panics stay contained.
    fn dispatch(&self, request: &ToolCallRequest) -> BoxFuture<'static, (ToolOutcome, Duration)> {
        let Some(capability) = self.registry.get(&request.name) else {
            let outcome = ToolOutcome::from(ToolError::not_found(&request.name));
            return futures::future::ready((outcome, Duration::ZERO)).boxed();
        };

        let args = match request.parse_arguments() {
            Ok(args) => args,
            Err(e) => return futures::future::ready((ToolOutcome::from(e), Duration::ZERO)).boxed(),
        };

        let name = request.name.clone();
        let timeout = self.timeout;
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let result = match timeout {
                Some(limit) => match tokio::time::timeout(limit, capability.invoke(args)).await {
                    Ok(result) => result,
                    Err(_) => Err(ToolError::timeout(&task_name, limit.as_millis())),
                },
                None => capability.invoke(args).await,
            };
            (result, started.elapsed())
        });

        async move {
            match handle.await {
                Ok((Ok(outcome), elapsed)) => (outcome, elapsed),
                Ok((Err(e), elapsed)) => (ToolOutcome::from(e), elapsed),
                Err(join_error) => {
                    let message = if join_error.is_panic() {
                        format!("Tool '{}' panicked", name)
                    } else {
                        format!("Tool '{}' was cancelled", name)
                    };
                    (ToolOutcome::from(ToolError::execution_failed(message)), Duration::ZERO)
                }
            }
        }
        .boxed()
    }
}

/// Stand-in note for a detached call, then the caption and image as a user message.
fn image_entries(request: &ToolCallRequest, caption: &str, image: &ImageRef) -> [Message; 2] {
    [
        Message::assistant(format!(
            "Called tool `{}` with arguments {}; its result follows.",
            request.name,
            preview(&single_line(&request.arguments), 500)
        )),
        Message::user_parts(vec![ContentPart::text(caption), image.to_content_part()]),
    ]
}

//! Run Tool Loop use case.
//!
//! Drives one orchestration run: model turn, concurrent tool execution,
//! next model turn, until the model stops asking for tools or the turn cap
//! is reached.
//!
//! ```text
//! Start ──▶ Turn ──(tool calls)──▶ Executing ──(turns < cap)──▶ Turn
//!            │                        │
//!            │ (no calls)             └──(turns == cap)──▶ ForcedFinal
//!            ▼                                                 │
//!          Done ◀──────────────────────────────────────────────┘
//! ```
//!
//! `ForcedFinal` sends the transcript once more with no tool schemas, so the
//! run always ends within `max_tool_turns + 1` model calls.

use crate::config::ExecutionParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::llm_gateway::{GatewayError, LlmGateway};
use crate::ports::observer::{NoRunObserver, RunObserver};
use crate::registry::CapabilityRegistry;
use crate::use_cases::execute_tools::ConcurrentToolExecutor;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tooloop_domain::core::string::preview;
use tooloop_domain::{
    DomainError, LlmResponse, LoopState, Message, StreamAccumulator, ToolCallRequest, Transcript,
};
use tracing::{debug, info};

/// Errors that abort a run.
///
/// Tool failures never show up here; they are written into the transcript.
#[derive(Error, Debug)]
pub enum RunToolLoopError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Invalid transcript: {0}")]
    Transcript(#[from] DomainError),
}

/// Input for [`RunToolLoopUseCase`].
#[derive(Debug, Clone)]
pub struct RunToolLoopInput {
    /// Run name, used in logs.
    pub name: String,
    /// Initial conversation, usually `[system, user]`.
    pub messages: Vec<Message>,
    /// Tool schemas in the model API's format. Empty means no tools.
    pub tool_schemas: Vec<Value>,
    pub execution: ExecutionParams,
}

impl RunToolLoopInput {
    pub fn new(name: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            name: name.into(),
            messages,
            tool_schemas: Vec::new(),
            execution: ExecutionParams::default(),
        }
    }

    pub fn with_tool_schemas(mut self, schemas: Vec<Value>) -> Self {
        self.tool_schemas = schemas;
        self
    }

    pub fn with_execution(mut self, execution: ExecutionParams) -> Self {
        self.execution = execution;
        self
    }
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct FinalMessage {
    /// Text of the final model turn. May be empty.
    pub content: String,
    /// The final model response, unprocessed.
    pub response: LlmResponse,
    /// Full transcript, including the final assistant message.
    pub transcript: Transcript,
    /// Number of model calls made.
    pub model_calls: usize,
    /// Number of tool-executing turns.
    pub tool_turns: usize,
    /// Whether the run ended with the no-tools forced call.
    pub forced: bool,
}

/// Use case for running the tool-calling loop.
pub struct RunToolLoopUseCase {
    gateway: Arc<dyn LlmGateway>,
    registry: Arc<CapabilityRegistry>,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl Clone for RunToolLoopUseCase {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            registry: self.registry.clone(),
            conversation_logger: self.conversation_logger.clone(),
        }
    }
}

/// One model turn after any streaming has been drained.
struct TurnOutput {
    response: LlmResponse,
    text: String,
    tool_calls: Vec<ToolCallRequest>,
}

impl RunToolLoopUseCase {
    pub fn new(gateway: Arc<dyn LlmGateway>, registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            gateway,
            registry,
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    /// Create with a conversation logger.
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Run the loop without observing intermediate events.
    pub async fn execute(&self, input: RunToolLoopInput) -> Result<FinalMessage, RunToolLoopError> {
        self.execute_with_observer(input, &NoRunObserver).await
    }

    /// Run the loop, reporting chunks, responses and tool calls to `observer`.
    pub async fn execute_with_observer(
        &self,
        input: RunToolLoopInput,
        observer: &dyn RunObserver,
    ) -> Result<FinalMessage, RunToolLoopError> {
        let RunToolLoopInput {
            name,
            messages,
            tool_schemas,
            execution,
        } = input;

        info!(
            run = %name,
            tools = tool_schemas.len(),
            max_tool_turns = execution.max_tool_turns,
            stream = execution.stream,
            "Starting tool loop"
        );

        let mut transcript = Transcript::from_messages(messages)?;
        let mut state = LoopState::new(execution.max_tool_turns);
        let executor = ConcurrentToolExecutor::new(self.registry.clone())
            .with_timeout(execution.tool_timeout);
        let tools = (!tool_schemas.is_empty()).then_some(tool_schemas.as_slice());
        let mut model_calls = 0;

        loop {
            // A cap of zero never allows a tool turn
            if state.is_exhausted() {
                return self
                    .forced_final(&name, transcript, state, model_calls, observer)
                    .await;
            }

            debug!(
                run = %name,
                turn = state.turn_count() + 1,
                cap = state.cap(),
                "Requesting model turn"
            );
            observer.on_turn_start(state.turn_count() + 1, tools.is_some());

            let turn = if execution.stream {
                self.streamed_turn(transcript.messages(), tools, observer)
                    .await?
            } else {
                self.single_turn(transcript.messages(), tools).await?
            };
            model_calls += 1;
            observer.on_response(&turn.response);
            self.log_response(&name, &turn.response);

            if !turn.text.is_empty() {
                transcript.push(Message::assistant(turn.text.clone()))?;
            }

            if turn.tool_calls.is_empty() {
                info!(
                    run = %name,
                    model_calls,
                    tool_turns = state.turn_count(),
                    "Tool loop finished"
                );
                return Ok(self.finish(&name, turn, transcript, state, model_calls, false));
            }

            transcript.push(Message::assistant_tool_calls(turn.tool_calls.clone()))?;
            for call in &turn.tool_calls {
                self.conversation_logger.log(ConversationEvent::new(
                    "tool_call",
                    serde_json::json!({
                        "run": name,
                        "id": call.id,
                        "tool": call.name,
                        "arguments": call.arguments,
                    }),
                ));
            }

            let batch = executor
                .execute(&turn.tool_calls, transcript.messages(), observer)
                .await;

            for (call, outcome) in turn.tool_calls.iter().zip(&batch.outcomes) {
                self.conversation_logger.log(ConversationEvent::new(
                    "tool_result",
                    serde_json::json!({
                        "run": name,
                        "id": call.id,
                        "tool": call.name,
                        "is_error": outcome.is_error(),
                        "content": preview(&outcome.reply_content(), 2000),
                    }),
                ));
            }

            transcript.detach_tool_calls(&batch.detached);
            transcript.extend(batch.entries)?;
            state.record_tool_turn();

            debug!(
                run = %name,
                turn = state.turn_count(),
                calls = turn.tool_calls.len(),
                errors = batch.outcomes.iter().filter(|o| o.is_error()).count(),
                "Tool turn complete"
            );
        }
    }

    async fn single_turn(
        &self,
        messages: &[Message],
        tools: Option<&[Value]>,
    ) -> Result<TurnOutput, GatewayError> {
        let response = self.gateway.chat(messages, tools).await?;
        let text = response.text_content();
        let tool_calls = response.tool_calls();
        Ok(TurnOutput {
            response,
            text,
            tool_calls,
        })
    }

    /// Drain the chunk stream completely, then assemble the turn.
    async fn streamed_turn(
        &self,
        messages: &[Message],
        tools: Option<&[Value]>,
        observer: &dyn RunObserver,
    ) -> Result<TurnOutput, GatewayError> {
        let mut handle = self.gateway.chat_stream(messages, tools).await?;
        let mut accumulator = StreamAccumulator::new();
        while let Some(chunk) = handle.recv().await {
            let chunk = chunk?;
            observer.on_chunk(&chunk);
            accumulator.push(&chunk);
        }

        let turn = accumulator.finish();
        let text = turn.content.clone();
        let tool_calls = turn.tool_calls.clone();
        Ok(TurnOutput {
            response: turn.into_response(),
            text,
            tool_calls,
        })
    }

    async fn forced_final(
        &self,
        name: &str,
        mut transcript: Transcript,
        state: LoopState,
        model_calls: usize,
        observer: &dyn RunObserver,
    ) -> Result<FinalMessage, RunToolLoopError> {
        info!(
            run = %name,
            turns = state.turn_count(),
            "Tool turn cap reached, requesting final answer without tools"
        );
        observer.on_forced_final(state.turn_count());

        let turn = self.single_turn(transcript.messages(), None).await?;
        observer.on_response(&turn.response);
        self.log_response(name, &turn.response);

        if !turn.text.is_empty() {
            transcript.push(Message::assistant(turn.text.clone()))?;
        }
        Ok(self.finish(name, turn, transcript, state, model_calls + 1, true))
    }

    fn finish(
        &self,
        name: &str,
        turn: TurnOutput,
        transcript: Transcript,
        state: LoopState,
        model_calls: usize,
        forced: bool,
    ) -> FinalMessage {
        self.conversation_logger.log(ConversationEvent::new(
            "run_complete",
            serde_json::json!({
                "run": name,
                "model_calls": model_calls,
                "tool_turns": state.turn_count(),
                "forced": forced,
                "transcript": transcript.messages(),
            }),
        ));

        FinalMessage {
            content: turn.text,
            response: turn.response,
            transcript,
            model_calls,
            tool_turns: state.turn_count(),
            forced,
        }
    }

    fn log_response(&self, name: &str, response: &LlmResponse) {
        self.conversation_logger.log(ConversationEvent::new(
            "llm_response",
            serde_json::json!({
                "run": name,
                "model": response.model,
                "stop_reason": response.stop_reason,
                "text": preview(&response.text_content(), 2000),
                "tool_calls": response.tool_calls().len(),
            }),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::observer::{ChannelObserver, RunEvent};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tooloop_domain::{ContentBlock, Role, ToolDefinition, ToolError, ToolOutcome};

    // ==================== Test Mocks ====================

    struct ScriptedGateway {
        responses: Mutex<VecDeque<LlmResponse>>,
        /// Whether tools were attached, one entry per call
        calls: Mutex<Vec<bool>>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedGateway {
        fn new(responses: Vec<LlmResponse>) -> Self {
            Self {
                responses: Mutex::new(VecDeque::from(responses)),
                calls: Mutex::new(Vec::new()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn tool_flags(&self) -> Vec<bool> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmGateway for ScriptedGateway {
        async fn chat(
            &self,
            messages: &[Message],
            tools: Option<&[Value]>,
        ) -> Result<LlmResponse, GatewayError> {
            self.calls.lock().unwrap().push(tools.is_some());
            self.seen.lock().unwrap().push(messages.to_vec());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| GatewayError::Other("No more responses".to_string()))
        }
    }

    /// Always asks for the same tool, forever.
    struct InsistentGateway {
        calls: Mutex<Vec<bool>>,
    }

    #[async_trait]
    impl LlmGateway for InsistentGateway {
        async fn chat(
            &self,
            _messages: &[Message],
            tools: Option<&[Value]>,
        ) -> Result<LlmResponse, GatewayError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(tools.is_some());
            if tools.is_some() {
                Ok(LlmResponse::new(vec![ContentBlock::tool_use(
                    format!("call-{}", calls.len()),
                    "echo",
                    "{}",
                )]))
            } else {
                Ok(LlmResponse::from_text("giving up on tools"))
            }
        }
    }

    #[derive(Default)]
    struct RecordingLogger {
        events: Mutex<Vec<ConversationEvent>>,
    }

    impl ConversationLogger for RecordingLogger {
        fn log(&self, event: ConversationEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn registry() -> Arc<CapabilityRegistry> {
        Arc::new(
            CapabilityRegistry::new()
                .register_fn(ToolDefinition::new("echo", "Echo"), |args| async move {
                    Ok(ToolOutcome::plain(&args))
                })
                .register_fn(ToolDefinition::new("fail", "Fails"), |_args| async move {
                    Err::<ToolOutcome, _>(ToolError::execution_failed("nope"))
                }),
        )
    }

    fn input(max_turns: usize) -> RunToolLoopInput {
        RunToolLoopInput::new("test", vec![Message::system("sys"), Message::user("go")])
            .with_tool_schemas(vec![serde_json::json!({"name": "echo"})])
            .with_execution(ExecutionParams::default().with_max_tool_turns(max_turns))
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn no_tool_calls_finishes_immediately() {
        let gateway = Arc::new(ScriptedGateway::new(vec![LlmResponse::from_text("done")]));
        let use_case = RunToolLoopUseCase::new(gateway.clone(), registry());

        let result = use_case.execute(input(5)).await.unwrap();
        assert_eq!(result.content, "done");
        assert_eq!(result.model_calls, 1);
        assert_eq!(result.tool_turns, 0);
        assert!(!result.forced);
        assert_eq!(result.transcript.len(), 3);
        assert_eq!(gateway.tool_flags(), vec![true]);
    }

    #[tokio::test]
    async fn empty_first_turn_is_not_an_error() {
        let gateway = Arc::new(ScriptedGateway::new(vec![LlmResponse::default()]));
        let use_case = RunToolLoopUseCase::new(gateway, registry());

        let result = use_case.execute(input(5)).await.unwrap();
        assert!(result.content.is_empty());
        assert_eq!(result.transcript.len(), 2);
    }

    #[tokio::test]
    async fn tool_results_are_sent_on_next_turn() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            LlmResponse::new(vec![
                ContentBlock::text("Checking."),
                ContentBlock::tool_use("c1", "echo", r#"{"x":1}"#),
                ContentBlock::tool_use("c2", "fail", "{}"),
            ]),
            LlmResponse::from_text("All done"),
        ]));
        let use_case = RunToolLoopUseCase::new(gateway.clone(), registry());

        let result = use_case.execute(input(5)).await.unwrap();
        assert_eq!(result.content, "All done");
        assert_eq!(result.tool_turns, 1);
        assert_eq!(result.model_calls, 2);

        let second = gateway.seen.lock().unwrap()[1].clone();
        let roles: Vec<_> = second.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::Assistant,
                Role::Tool,
                Role::Tool
            ]
        );
        assert_eq!(second[2].text(), "Checking.");
        assert_eq!(second[3].tool_calls.as_ref().unwrap().len(), 2);
        assert_eq!(second[4].text(), r#"{"x":1}"#);
        assert!(second[5].text().contains("nope"));
        assert_eq!(gateway.tool_flags(), vec![true, true]);
    }

    #[tokio::test]
    async fn cap_forces_final_call_without_tools() {
        let gateway = Arc::new(InsistentGateway {
            calls: Mutex::new(Vec::new()),
        });
        let use_case = RunToolLoopUseCase::new(gateway.clone(), registry());

        let result = use_case.execute(input(2)).await.unwrap();
        assert!(result.forced);
        assert_eq!(result.content, "giving up on tools");
        assert_eq!(result.model_calls, 3);
        assert_eq!(*gateway.calls.lock().unwrap(), vec![true, true, false]);
    }

    #[tokio::test]
    async fn zero_cap_goes_straight_to_forced_final() {
        let gateway = Arc::new(InsistentGateway {
            calls: Mutex::new(Vec::new()),
        });
        let use_case = RunToolLoopUseCase::new(gateway.clone(), registry());

        let result = use_case.execute(input(0)).await.unwrap();
        assert!(result.forced);
        assert_eq!(result.model_calls, 1);
        assert_eq!(*gateway.calls.lock().unwrap(), vec![false]);
    }

    #[tokio::test]
    async fn no_schemas_means_no_tools_attached() {
        let gateway = Arc::new(ScriptedGateway::new(vec![LlmResponse::from_text("hi")]));
        let use_case = RunToolLoopUseCase::new(gateway.clone(), registry());

        let plain = RunToolLoopInput::new("plain", vec![Message::user("hi")]);
        use_case.execute(plain).await.unwrap();
        assert_eq!(gateway.tool_flags(), vec![false]);
    }

    #[tokio::test]
    async fn streaming_turns_are_reassembled() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            LlmResponse::new(vec![ContentBlock::tool_use("c1", "echo", r#"{"a":"b"}"#)]),
            LlmResponse::from_text("streamed answer"),
        ]));
        let use_case = RunToolLoopUseCase::new(gateway.clone(), registry());
        let (observer, mut rx) = ChannelObserver::channel();

        let mut streamed = input(5);
        streamed.execution = streamed.execution.with_stream(true);
        let result = use_case
            .execute_with_observer(streamed, &observer)
            .await
            .unwrap();

        assert_eq!(result.content, "streamed answer");
        let messages = result.transcript.messages();
        assert_eq!(messages[3].text(), r#"{"a":"b"}"#);

        let mut chunks = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, RunEvent::Chunk(_)) {
                chunks += 1;
            }
        }
        assert!(chunks >= 3);
    }

    #[tokio::test]
    async fn gateway_error_is_passed_through() {
        let gateway = Arc::new(ScriptedGateway::new(vec![]));
        let use_case = RunToolLoopUseCase::new(gateway, registry());

        let err = use_case.execute(input(5)).await.unwrap_err();
        assert!(matches!(err, RunToolLoopError::Gateway(GatewayError::Other(_))));
    }

    #[tokio::test]
    async fn orphan_tool_reply_in_input_is_rejected() {
        let gateway = Arc::new(ScriptedGateway::new(vec![LlmResponse::from_text("x")]));
        let use_case = RunToolLoopUseCase::new(gateway, registry());

        let bad = RunToolLoopInput::new("bad", vec![Message::tool("ghost", "{}")]);
        let err = use_case.execute(bad).await.unwrap_err();
        assert!(matches!(
            err,
            RunToolLoopError::Transcript(DomainError::OrphanToolReply(_))
        ));
    }

    #[tokio::test]
    async fn repeated_call_id_in_one_turn_does_not_abort() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            LlmResponse::new(vec![
                ContentBlock::tool_use("dup", "echo", r#"{"a":1}"#),
                ContentBlock::tool_use("dup", "echo", r#"{"a":2}"#),
            ]),
            LlmResponse::from_text("done"),
        ]));
        let use_case = RunToolLoopUseCase::new(gateway, registry());

        let result = use_case.execute(input(5)).await.unwrap();
        assert_eq!(result.content, "done");
        assert_eq!(result.tool_turns, 1);

        let messages = result.transcript.messages();
        let replies: Vec<_> = messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .map(|m| m.text())
            .collect();
        assert_eq!(replies, vec![r#"{"a":1}"#, r#"{"a":2}"#]);
    }

    #[tokio::test]
    async fn conversation_events_are_logged() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            LlmResponse::new(vec![ContentBlock::tool_use("c1", "echo", "{}")]),
            LlmResponse::from_text("ok"),
        ]));
        let logger = Arc::new(RecordingLogger::default());
        let use_case =
            RunToolLoopUseCase::new(gateway, registry()).with_conversation_logger(logger.clone());

        use_case.execute(input(5)).await.unwrap();
        let types: Vec<_> = logger
            .events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(
            types,
            vec![
                "llm_response",
                "tool_call",
                "tool_result",
                "llm_response",
                "run_complete"
            ]
        );
    }
}

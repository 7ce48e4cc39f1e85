//! End-to-end runs of the tool loop against scripted collaborators.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tooloop_application::{
    CapabilityRegistry, ConcurrentToolExecutor, ExecutionParams, GatewayError, LlmGateway,
    NoRunObserver, RunToolLoopInput, RunToolLoopUseCase, StreamHandle,
};
use tooloop_domain::{
    ContentBlock, ContentPart, ImageRef, LlmResponse, Message, MessageContent, Role,
    StreamChunk, ToolCallChunk, ToolCallRequest, ToolDefinition, ToolError, ToolOutcome,
};

// ==================== Collaborators ====================

/// Serves queued responses; streaming splits tool arguments into small fragments.
struct ScriptedGateway {
    responses: Mutex<VecDeque<LlmResponse>>,
    requests: Mutex<Vec<(Vec<Message>, bool)>>,
}

impl ScriptedGateway {
    fn new(responses: Vec<LlmResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::from(responses)),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn next(&self, messages: &[Message], tools: Option<&[Value]>) -> Result<LlmResponse, GatewayError> {
        self.requests
            .lock()
            .unwrap()
            .push((messages.to_vec(), tools.is_some()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| GatewayError::Other("script exhausted".to_string()))
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[Value]>,
    ) -> Result<LlmResponse, GatewayError> {
        self.next(messages, tools)
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: Option<&[Value]>,
    ) -> Result<StreamHandle, GatewayError> {
        let response = self.next(messages, tools)?;
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            for chunk in fragment(response) {
                if tx.send(Ok(chunk)).await.is_err() {
                    break;
                }
                tokio::task::yield_now().await;
            }
        });
        Ok(StreamHandle::new(rx))
    }
}

/// Text in 3-byte deltas, each call as header plus 2-byte argument fragments.
fn fragment(response: LlmResponse) -> Vec<StreamChunk> {
    let mut chunks = Vec::new();
    let mut index = 0;
    for block in response.content {
        match block {
            ContentBlock::Text { text } => {
                let chars: Vec<char> = text.chars().collect();
                for piece in chars.chunks(3) {
                    chunks.push(StreamChunk::text(piece.iter().collect::<String>()));
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
                let chars: Vec<char> = arguments.chars().collect();
                for piece in chars.chunks(2) {
                    chunks.push(StreamChunk::tool_call(
                        ToolCallChunk::new(index).with_arguments(piece.iter().collect::<String>()),
                    ));
                }
                index += 1;
            }
        }
    }
    chunks.push(StreamChunk::finished());
    chunks
}

/// Deterministic pseudo-random delays.
struct Lcg(u64);

impl Lcg {
    fn next_millis(&mut self, max: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) % max
    }
}

fn weather_registry() -> Arc<CapabilityRegistry> {
    Arc::new(
        CapabilityRegistry::new()
            .register_fn(ToolDefinition::new("get_weather", "Weather by city"), |args| async move {
                let city = args
                    .get("city")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let delay = args.get("delay_ms").and_then(Value::as_u64).unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                if city == "B" {
                    return Err(ToolError::execution_failed("station B offline"));
                }
                Ok(ToolOutcome::plain(&serde_json::json!({ "city": city, "sky": "clear" })))
            })
            .register_fn(ToolDefinition::new("render_chart", "Chart image"), |_args| async move {
                Ok(ToolOutcome::multimodal(
                    "temperature chart",
                    ImageRef::data("image/png", "iVBORw0KGgo="),
                ))
            }),
    )
}

fn weather_call(id: &str, city: &str) -> ContentBlock {
    ContentBlock::tool_use(id, "get_weather", format!(r#"{{"city":"{}"}}"#, city))
}

fn input(execution: ExecutionParams) -> RunToolLoopInput {
    RunToolLoopInput::new(
        "weather",
        vec![Message::system("You report weather."), Message::user("A, B and C?")],
    )
    .with_tool_schemas(vec![serde_json::json!({"type": "function", "function": {"name": "get_weather"}})])
    .with_execution(execution)
}

// ==================== Tests ====================

#[tokio::test]
async fn entries_follow_request_order_under_random_latency() {
    let executor = ConcurrentToolExecutor::new(weather_registry());
    for seed in [1u64, 7, 42, 1337, 9001] {
        let mut rng = Lcg(seed);
        let requests: Vec<_> = (0..12)
            .map(|i| {
                ToolCallRequest::new(
                    format!("call-{}", i),
                    "get_weather",
                    format!(r#"{{"city":"C{}","delay_ms":{}}}"#, i, rng.next_millis(30)),
                )
            })
            .collect();
        let snapshot = vec![Message::assistant_tool_calls(requests.clone())];

        let output = executor.execute(&requests, &snapshot, &NoRunObserver).await;

        let ids: Vec<_> = output
            .entries
            .iter()
            .filter_map(|m| m.tool_call_id.clone())
            .collect();
        let expected: Vec<_> = requests.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, expected, "seed {}", seed);
    }
}

#[tokio::test]
async fn one_failing_call_does_not_affect_the_others() {
    let gateway = ScriptedGateway::new(vec![
        LlmResponse::new(vec![
            weather_call("a", "A"),
            weather_call("b", "B"),
            weather_call("c", "C"),
        ]),
        LlmResponse::from_text("A and C are clear; B is unavailable."),
    ]);
    let use_case = RunToolLoopUseCase::new(gateway.clone(), weather_registry());

    let result = use_case.execute(input(ExecutionParams::default())).await.unwrap();
    assert_eq!(result.content, "A and C are clear; B is unavailable.");

    let tool_replies: Vec<_> = result
        .transcript
        .messages()
        .iter()
        .filter(|m| m.role == Role::Tool)
        .collect();
    assert_eq!(tool_replies.len(), 3);
    assert_eq!(tool_replies[0].tool_call_id.as_deref(), Some("a"));
    assert_eq!(tool_replies[1].tool_call_id.as_deref(), Some("b"));
    assert_eq!(tool_replies[2].tool_call_id.as_deref(), Some("c"));

    let b: Value = serde_json::from_str(&tool_replies[1].text()).unwrap();
    assert!(b["error"].as_str().unwrap().contains("station B offline"));
    let c: Value = serde_json::from_str(&tool_replies[2].text()).unwrap();
    assert_eq!(c["sky"], "clear");

    // Second request carried all three replies, tools still attached
    let requests = gateway.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].1);
    assert_eq!(
        requests[1].0.iter().filter(|m| m.role == Role::Tool).count(),
        3
    );
}

#[tokio::test]
async fn turn_cap_of_one_makes_exactly_two_model_calls() {
    let gateway = ScriptedGateway::new(vec![
        LlmResponse::new(vec![weather_call("a", "A")]),
        // Would keep asking for tools if allowed
        LlmResponse::new(vec![
            ContentBlock::text("Final: A is clear."),
        ]),
        LlmResponse::new(vec![weather_call("never", "Z")]),
    ]);
    let use_case = RunToolLoopUseCase::new(gateway.clone(), weather_registry());

    let result = use_case
        .execute(input(ExecutionParams::default().with_max_tool_turns(1)))
        .await
        .unwrap();

    assert!(result.forced);
    assert_eq!(result.model_calls, 2);
    assert_eq!(gateway.request_count(), 2);
    let requests = gateway.requests.lock().unwrap();
    assert!(requests[0].1);
    assert!(!requests[1].1);
    assert_eq!(result.content, "Final: A is clear.");
}

#[tokio::test]
async fn streamed_calls_are_rebuilt_byte_for_byte() {
    let arguments = r#"{"city":"Zürich","note":"quotes \" and, commas"}"#;
    let gateway = ScriptedGateway::new(vec![
        LlmResponse::new(vec![
            ContentBlock::text("Looking that up."),
            ContentBlock::tool_use("z1", "get_weather", arguments),
            weather_call("z2", "C"),
        ]),
        LlmResponse::from_text("Zürich is clear."),
    ]);
    let use_case = RunToolLoopUseCase::new(gateway.clone(), weather_registry());

    let result = use_case
        .execute(input(ExecutionParams::default().with_stream(true)))
        .await
        .unwrap();
    assert_eq!(result.content, "Zürich is clear.");

    let messages = result.transcript.messages();
    assert_eq!(messages[2].text(), "Looking that up.");
    let calls = messages[3].tool_calls.as_ref().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].id, "z1");
    assert_eq!(calls[0].arguments, arguments);
    assert_eq!(calls[1].id, "z2");
}

#[tokio::test]
async fn image_result_detaches_call_and_adds_user_image() {
    let gateway = ScriptedGateway::new(vec![
        LlmResponse::new(vec![ContentBlock::tool_use("img", "render_chart", "{}")]),
        LlmResponse::from_text("The chart shows a warm week."),
    ]);
    let use_case = RunToolLoopUseCase::new(gateway.clone(), weather_registry());

    let result = use_case.execute(input(ExecutionParams::default())).await.unwrap();
    assert_eq!(result.content, "The chart shows a warm week.");

    let messages = result.transcript.messages();
    // system, user, rewritten assistant, assistant stand-in, user image, final
    assert_eq!(messages.len(), 6);
    assert_eq!(messages[2].role, Role::Assistant);
    assert!(messages[2].tool_calls.is_none());
    assert!(messages[3].text().contains("render_chart"));
    assert_eq!(
        messages[4].content,
        MessageContent::Parts(vec![
            ContentPart::text("temperature chart"),
            ContentPart::ImageData {
                mime_type: "image/png".to_string(),
                data: "iVBORw0KGgo=".to_string(),
                detail: None,
            },
        ])
    );
    assert!(messages.iter().all(|m| m.role != Role::Tool));
}

#[tokio::test]
async fn mixed_batch_puts_tool_replies_before_image() {
    let gateway = ScriptedGateway::new(vec![
        LlmResponse::new(vec![
            weather_call("w1", "A"),
            ContentBlock::tool_use("img", "render_chart", "{}"),
            weather_call("w2", "C"),
        ]),
        LlmResponse::from_text("done"),
    ]);
    let use_case = RunToolLoopUseCase::new(gateway, weather_registry());

    let result = use_case.execute(input(ExecutionParams::default())).await.unwrap();
    let messages = result.transcript.messages();

    let remaining: Vec<_> = messages[2]
        .tool_calls
        .as_ref()
        .unwrap()
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(remaining, vec!["w1", "w2"]);

    let roles: Vec<_> = messages[3..7].iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::Tool, Role::Tool, Role::Assistant, Role::User]
    );
    assert_eq!(messages[3].tool_call_id.as_deref(), Some("w1"));
    assert_eq!(messages[4].tool_call_id.as_deref(), Some("w2"));
    assert!(messages[5].text().contains("`render_chart`"));
}

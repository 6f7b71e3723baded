use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use gnosis_core::{
    ChatCompletionRequest, ChatCompletionResponse, Message, OperationKind, OperationOutcome,
    RetrievalError, RetrievedChunk, Retriever, Role, ToolSchema,
};
use gnosis_llm::{CompletionClient, LLMError, LineStream};
use gnosis_pipeline::{CompletionOrchestrator, CompletionOutcome, OrchestratorError};
use gnosis_tools::{Tool, ToolError, ToolRegistry, ToolScope};
use serde_json::{json, Value};

/// Replays scripted upstream responses and records every request it sees.
#[derive(Default)]
struct ScriptedClient {
    responses: Mutex<VecDeque<Result<ChatCompletionResponse, LLMError>>>,
    requests: Mutex<Vec<ChatCompletionRequest>>,
    stream_requests: Mutex<Vec<ChatCompletionRequest>>,
}

impl ScriptedClient {
    fn with_responses(responses: Vec<Value>) -> Arc<Self> {
        let client = Self::default();
        {
            let mut queue = client.responses.lock().unwrap();
            for response in responses {
                queue.push_back(Ok(serde_json::from_value(response).unwrap()));
            }
        }
        Arc::new(client)
    }

    fn failing(status: u16, body: &str) -> Arc<Self> {
        let client = Self::default();
        client.responses.lock().unwrap().push_back(Err(LLMError::Api {
            status,
            body: body.to_string(),
        }));
        Arc::new(client)
    }

    fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LLMError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LLMError::Stream("no scripted response left".to_string())))
    }

    async fn complete_stream(&self, request: &ChatCompletionRequest) -> Result<LineStream, LLMError> {
        self.stream_requests.lock().unwrap().push(request.clone());
        let lines = vec![
            Ok("data: {\"choices\":[]}".to_string()),
            Ok(String::new()),
            Ok("data: [DONE]".to_string()),
        ];
        Ok(Box::pin(futures::stream::iter(lines)))
    }
}

struct StaticRetriever {
    result: Result<Vec<RetrievedChunk>, String>,
    queries: Mutex<Vec<String>>,
}

impl StaticRetriever {
    fn returning(chunks: Vec<RetrievedChunk>) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(chunks),
            queries: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Err(message.to_string()),
            queries: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn search(
        &self,
        query: &str,
        _limit: usize,
        _score_threshold: f64,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.result
            .clone()
            .map_err(RetrievalError::Unavailable)
    }
}

/// Echoes its arguments after an optional delay.
struct EchoTool {
    name: &'static str,
    delay: Duration,
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "echoes its arguments"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"text": {"type": "string"}}})
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        tokio::time::sleep(self.delay).await;
        Ok(json!({"tool": self.name, "args": args}))
    }
}

struct BrokenTool;

#[async_trait]
impl Tool for BrokenTool {
    fn name(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "always fails"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        Err(ToolError::Execution("disk on fire".to_string()))
    }
}

fn registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry
        .register_tool(
            EchoTool {
                name: "slow",
                delay: Duration::from_millis(80),
            },
            ToolScope::All,
        )
        .unwrap();
    registry
        .register_tool(
            EchoTool {
                name: "fast",
                delay: Duration::ZERO,
            },
            ToolScope::Completion,
        )
        .unwrap();
    registry.register_tool(BrokenTool, ToolScope::Completion).unwrap();
    registry
        .register_tool(
            EchoTool {
                name: "voice_only",
                delay: Duration::ZERO,
            },
            ToolScope::Voice,
        )
        .unwrap();
    Arc::new(registry)
}

fn text_response(content: &str, total_tokens: u64) -> Value {
    json!({
        "id": "chatcmpl-final",
        "object": "chat.completion",
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": total_tokens}
    })
}

fn tool_call_response(calls: &[(&str, &str, &str)], total_tokens: u64) -> Value {
    let tool_calls: Vec<Value> = calls
        .iter()
        .map(|(id, name, arguments)| {
            json!({
                "id": id,
                "type": "function",
                "function": {"name": name, "arguments": arguments}
            })
        })
        .collect();
    json!({
        "id": "chatcmpl-tools",
        "object": "chat.completion",
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": null, "tool_calls": tool_calls},
            "finish_reason": "tool_calls"
        }],
        "usage": {"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": total_tokens}
    })
}

fn chunk(text: &str, score: f64) -> RetrievedChunk {
    RetrievedChunk {
        text: text.to_string(),
        filename: "models.md".to_string(),
        score,
    }
}

async fn complete(
    orchestrator: &CompletionOrchestrator,
    request: &ChatCompletionRequest,
) -> ChatCompletionResponse {
    match orchestrator.execute(request, "test").await {
        Ok(CompletionOutcome::Complete(response)) => response,
        Ok(CompletionOutcome::Stream(_)) => panic!("expected a complete response"),
        Err(e) => panic!("orchestration failed: {e}"),
    }
}

#[tokio::test]
async fn first_turn_inserts_retrieved_context_after_user_message() {
    let client = ScriptedClient::with_responses(vec![text_response("Nova-3 is a model", 12)]);
    let retriever = StaticRetriever::returning(vec![chunk("second", 0.7), chunk("first", 0.9)]);
    let orchestrator = CompletionOrchestrator::new(client.clone(), registry())
        .with_retriever(retriever.clone());

    let user = Message::user("What is Deepgram's Nova-3?");
    let request = ChatCompletionRequest::new("gpt-4o-mini", vec![user.clone()]);
    let response = complete(&orchestrator, &request).await;

    let sent = &client.requests()[0];
    assert_eq!(sent.messages.len(), 3);
    assert_eq!(sent.messages[0], user);
    assert_eq!(sent.messages[1].role, Role::System);
    assert!(sent.messages[1].text().unwrap().contains("first"));
    assert!(sent.messages[2].text().unwrap().contains("second"));
    assert_eq!(
        retriever.queries.lock().unwrap().as_slice(),
        ["What is Deepgram's Nova-3?"]
    );

    let metadata = response.gnosis_metadata.expect("metadata");
    assert_eq!(metadata.operations.len(), 1);
    assert_eq!(metadata.operations[0].kind, OperationKind::Retrieval);
    assert_eq!(metadata.operations[0].outcome, OperationOutcome::Success);
    assert_eq!(metadata.total_tokens, 12);
    assert_eq!(metadata.summary, "1 retrieval");
    assert_eq!(request.messages.len(), 1);
}

#[tokio::test]
async fn continuation_skips_retrieval() {
    let client = ScriptedClient::with_responses(vec![text_response("sure", 3)]);
    let retriever = StaticRetriever::returning(vec![chunk("unused", 0.9)]);
    let orchestrator = CompletionOrchestrator::new(client.clone(), registry())
        .with_retriever(retriever.clone());

    let request = ChatCompletionRequest::new(
        "gpt-4o-mini",
        vec![
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user("tell me more"),
        ],
    );
    let response = complete(&orchestrator, &request).await;

    assert!(retriever.queries.lock().unwrap().is_empty());
    assert_eq!(client.requests()[0].messages, request.messages);
    assert!(response.gnosis_metadata.unwrap().operations.is_empty());
}

#[tokio::test]
async fn retrieval_failure_is_recorded_and_not_fatal() {
    let client = ScriptedClient::with_responses(vec![text_response("answer", 5)]);
    let orchestrator = CompletionOrchestrator::new(client.clone(), registry())
        .with_retriever(StaticRetriever::failing("index offline"));

    let request = ChatCompletionRequest::new("gpt-4o-mini", vec![Message::user("question")]);
    let response = complete(&orchestrator, &request).await;

    assert_eq!(client.requests()[0].messages, request.messages);
    let record = &response.gnosis_metadata.unwrap().operations[0];
    assert_eq!(record.kind, OperationKind::Retrieval);
    assert_eq!(record.outcome, OperationOutcome::Error);
    assert!(record.error.as_deref().unwrap().contains("index offline"));
}

#[tokio::test]
async fn completion_tools_are_advertised_with_prefix_after_caller_tools() {
    let client = ScriptedClient::with_responses(vec![text_response("ok", 1)]);
    let orchestrator = CompletionOrchestrator::new(client.clone(), registry());

    let mut request = ChatCompletionRequest::new("gpt-4o-mini", vec![Message::user("hi")]);
    request.tools = Some(vec![ToolSchema::function(
        "get_weather",
        "caller tool",
        json!({"type": "object", "properties": {}}),
    )]);
    complete(&orchestrator, &request).await;

    let sent = &client.requests()[0];
    let names: Vec<&str> = sent.tools.as_deref().unwrap().iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["get_weather", "gnosis_slow", "gnosis_fast", "gnosis_broken"]);
    assert_eq!(sent.tool_choice, Some(json!("auto")));
    assert_eq!(request.tools.as_ref().unwrap().len(), 1);
}

#[tokio::test]
async fn owned_calls_trigger_exactly_one_follow_up() {
    let client = ScriptedClient::with_responses(vec![
        tool_call_response(
            &[
                ("call_slow", "gnosis_slow", r#"{"text":"a"}"#),
                ("call_fast", "gnosis_fast", r#"{"text":"b"}"#),
            ],
            20,
        ),
        text_response("done", 30),
    ]);
    let orchestrator = CompletionOrchestrator::new(client.clone(), registry());

    let request = ChatCompletionRequest::new("gpt-4o-mini", vec![Message::user("go")]);
    let response = complete(&orchestrator, &request).await;

    let requests = client.requests();
    assert_eq!(requests.len(), 2);

    let follow_up = &requests[1].messages;
    assert_eq!(follow_up.len(), 4);
    assert_eq!(follow_up[1].role, Role::Assistant);
    assert_eq!(follow_up[1].tool_calls.as_ref().unwrap().len(), 2);
    assert_eq!(follow_up[2].tool_call_id.as_deref(), Some("call_slow"));
    assert_eq!(follow_up[3].tool_call_id.as_deref(), Some("call_fast"));
    let slow_result: Value = serde_json::from_str(&follow_up[2].text().unwrap()).unwrap();
    assert_eq!(slow_result, json!({"tool": "slow", "args": {"text": "a"}}));

    assert!(response.tool_calls().is_empty());
    let metadata = response.gnosis_metadata.unwrap();
    assert_eq!(metadata.total_tokens, 50);
    let names: Vec<&str> = metadata.operations.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["fast", "slow"]);
    assert_eq!(metadata.summary, "2 tool calls");
}

#[tokio::test]
async fn failing_and_unknown_calls_do_not_affect_siblings() {
    let client = ScriptedClient::with_responses(vec![
        tool_call_response(
            &[
                ("call_1", "gnosis_fast", "{\"text\": \"ok\"}"),
                ("call_2", "gnosis_broken", "{}"),
                ("call_3", "gnosis_missing", "not json at all"),
            ],
            5,
        ),
        text_response("recovered", 5),
    ]);
    let orchestrator = CompletionOrchestrator::new(client.clone(), registry());

    let request = ChatCompletionRequest::new("gpt-4o-mini", vec![Message::user("go")]);
    let response = complete(&orchestrator, &request).await;

    let follow_up = &client.requests()[1].messages;
    let results: Vec<Value> = follow_up[2..]
        .iter()
        .map(|m| serde_json::from_str(&m.text().unwrap()).unwrap())
        .collect();
    assert_eq!(results[0], json!({"tool": "fast", "args": {"text": "ok"}}));
    assert_eq!(results[1], json!({"error": "Execution failed: disk on fire"}));
    assert_eq!(results[2], json!({"error": "Tool 'missing' not found"}));

    let metadata = response.gnosis_metadata.unwrap();
    assert_eq!(metadata.summary, "3 tool calls (2 failed)");
}

#[tokio::test]
async fn foreign_call_is_returned_without_follow_up() {
    let client = ScriptedClient::with_responses(vec![tool_call_response(
        &[
            ("call_owned", "gnosis_fast", "{}"),
            ("call_foreign", "get_weather", "{\"city\":\"Paris\"}"),
        ],
        9,
    )]);
    let orchestrator = CompletionOrchestrator::new(client.clone(), registry());

    let request = ChatCompletionRequest::new("gpt-4o-mini", vec![Message::user("weather?")]);
    let response = complete(&orchestrator, &request).await;

    assert_eq!(client.requests().len(), 1);
    let calls = response.tool_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "call_foreign");
    assert_eq!(calls[0].function.arguments, "{\"city\":\"Paris\"}");

    let metadata = response.gnosis_metadata.unwrap();
    assert_eq!(metadata.operations.len(), 1);
    assert_eq!(metadata.operations[0].kind, OperationKind::ToolCall);
    assert_eq!(metadata.operations[0].outcome, OperationOutcome::Success);
    assert_eq!(metadata.total_tokens, 9);
}

#[tokio::test]
async fn only_foreign_calls_pass_through_untouched() {
    let client = ScriptedClient::with_responses(vec![tool_call_response(
        &[("call_a", "get_weather", "{}"), ("call_b", "book_flight", "{}")],
        4,
    )]);
    let orchestrator = CompletionOrchestrator::new(client.clone(), registry());

    let request = ChatCompletionRequest::new("gpt-4o-mini", vec![Message::user("plan")]);
    let response = complete(&orchestrator, &request).await;

    assert_eq!(client.requests().len(), 1);
    assert_eq!(response.tool_calls().len(), 2);
    assert_eq!(
        response.gnosis_metadata.unwrap().summary,
        "no augmentation performed"
    );
}

#[tokio::test]
async fn follow_up_response_is_returned_as_is() {
    let client = ScriptedClient::with_responses(vec![
        tool_call_response(&[("call_1", "gnosis_fast", "{}")], 1),
        tool_call_response(&[("call_2", "gnosis_fast", "{}")], 1),
    ]);
    let orchestrator = CompletionOrchestrator::new(client.clone(), registry());

    let request = ChatCompletionRequest::new("gpt-4o-mini", vec![Message::user("loop")]);
    let response = complete(&orchestrator, &request).await;

    assert_eq!(client.requests().len(), 2);
    assert_eq!(response.tool_calls()[0].id, "call_2");
}

#[tokio::test]
async fn streaming_request_is_augmented_and_relayed_without_metadata() {
    let client = ScriptedClient::with_responses(vec![]);
    let orchestrator = CompletionOrchestrator::new(client.clone(), registry())
        .with_retriever(StaticRetriever::returning(vec![chunk("ctx", 0.8)]));

    let mut request = ChatCompletionRequest::new("gpt-4o-mini", vec![Message::user("stream it")]);
    request.stream = Some(true);

    let outcome = orchestrator.execute(&request, "test").await.unwrap();
    let CompletionOutcome::Stream(lines) = outcome else {
        panic!("expected a stream");
    };
    let lines: Vec<String> = lines.map(|line| line.unwrap()).collect().await;
    assert_eq!(lines.last().map(String::as_str), Some("data: [DONE]"));

    assert!(client.requests().is_empty());
    let stream_requests = client.stream_requests.lock().unwrap();
    let sent = &stream_requests[0];
    assert_eq!(sent.messages.len(), 2);
    assert_eq!(sent.tools.as_ref().unwrap().len(), 3);
}

#[tokio::test]
async fn upstream_error_is_surfaced() {
    let client = ScriptedClient::failing(503, "overloaded");
    let orchestrator = CompletionOrchestrator::new(client, registry());

    let request = ChatCompletionRequest::new("gpt-4o-mini", vec![Message::user("hi")]);
    let result = orchestrator.execute(&request, "test").await;

    assert!(matches!(
        result,
        Err(OrchestratorError::Upstream(LLMError::Api { status: 503, .. }))
    ));
}

#[tokio::test]
async fn empty_messages_are_rejected() {
    let client = ScriptedClient::with_responses(vec![]);
    let orchestrator = CompletionOrchestrator::new(client.clone(), registry());

    let request = ChatCompletionRequest::new("gpt-4o-mini", vec![]);
    let result = orchestrator.execute(&request, "test").await;

    assert!(matches!(result, Err(OrchestratorError::InvalidRequest(_))));
    assert!(client.requests().is_empty());
}

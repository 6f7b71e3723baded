use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use gnosis_core::{
    ChatCompletionRequest, ChatCompletionResponse, GnosisMetadata, Message, OperationKind,
    OperationRecord, Retriever, ToolCall,
};
use gnosis_llm::{CompletionClient, LineStream};
use gnosis_tools::{ToolRegistry, ToolScope};
use serde_json::{Map, Value};

use crate::augment::{augment_request, is_owned, strip_prefix};
use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::retrieval::RetrievalGate;

pub enum CompletionOutcome {
    /// Final JSON response with `gnosis_metadata` attached.
    Complete(ChatCompletionResponse),
    /// Upstream body lines, relayed without metadata.
    Stream(LineStream),
}

/// Drives one completion request: augmentation, dispatch, owned tool calls
/// and the follow-up dispatch. Holds no per-request state.
pub struct CompletionOrchestrator {
    client: Arc<dyn CompletionClient>,
    registry: Arc<ToolRegistry>,
    retriever: Option<Arc<dyn Retriever>>,
    config: OrchestratorConfig,
}

impl CompletionOrchestrator {
    pub fn new(client: Arc<dyn CompletionClient>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            client,
            registry,
            retriever: None,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Retrieval followed by tool augmentation. `request` is left untouched.
    pub async fn prepare(
        &self,
        request: &ChatCompletionRequest,
        request_id: &str,
        records: &mut Vec<OperationRecord>,
    ) -> ChatCompletionRequest {
        let definitions = self.registry.definitions_for(ToolScope::Completion);
        let mut outbound = augment_request(request, &definitions);

        if let Some(retriever) = &self.retriever {
            let gate = RetrievalGate::new(
                retriever.as_ref(),
                self.config.retrieval_limit,
                self.config.retrieval_score_threshold,
            );
            let (messages, record) = gate.apply(&request.messages, request_id).await;
            outbound.messages = messages;
            records.extend(record);
        }

        outbound
    }

    pub async fn execute(
        &self,
        request: &ChatCompletionRequest,
        request_id: &str,
    ) -> Result<CompletionOutcome, OrchestratorError> {
        if request.messages.is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "messages must not be empty".to_string(),
            ));
        }

        let started = Instant::now();
        let mut records = Vec::new();
        let mut outbound = self.prepare(request, request_id, &mut records).await;

        if outbound.is_stream() {
            if !records.is_empty() {
                log::debug!(
                    "[{}] Streamed response, {} operation record(s) not reported",
                    request_id,
                    records.len()
                );
            }
            let lines = self.client.complete_stream(&outbound).await?;
            return Ok(CompletionOutcome::Stream(lines));
        }

        let mut response = self.client.complete(&outbound).await?;
        let mut total_tokens = response.total_tokens();
        let mut rounds = 0usize;

        while rounds < self.config.max_tool_rounds {
            let (owned, foreign): (Vec<ToolCall>, Vec<ToolCall>) = response
                .tool_calls()
                .iter()
                .cloned()
                .partition(|call| is_owned(call.name()));

            if owned.is_empty() {
                break;
            }

            log::info!(
                "[{}] Executing {} owned tool call(s), {} foreign",
                request_id,
                owned.len(),
                foreign.len()
            );
            let results = self.execute_owned(&owned, &mut records, request_id).await;

            if !foreign.is_empty() {
                let dropped: Vec<&str> = owned.iter().map(|call| call.id.as_str()).collect();
                log::info!(
                    "[{}] Returning foreign tool calls to caller, discarding owned results {:?}",
                    request_id,
                    dropped
                );
                retain_tool_calls(&mut response, foreign);
                break;
            }

            let assistant = response
                .first_message()
                .cloned()
                .unwrap_or_else(|| Message::assistant_tool_calls(None, owned.clone()));
            outbound.messages.push(assistant);
            for (call, result) in owned.iter().zip(results) {
                outbound
                    .messages
                    .push(Message::tool_result(call.id.clone(), result.to_string()));
            }

            rounds += 1;
            log::debug!("[{}] Follow-up dispatch {}", request_id, rounds);
            response = self.client.complete(&outbound).await?;
            total_tokens += response.total_tokens();
        }

        let metadata = GnosisMetadata::new(records, total_tokens, started.elapsed());
        log::info!(
            "[{}] Completed in {}ms: {}",
            request_id,
            metadata.total_latency_ms,
            metadata.summary
        );
        response.gnosis_metadata = Some(metadata);
        Ok(CompletionOutcome::Complete(response))
    }

    /// Runs every call concurrently. Records are appended as calls finish;
    /// the returned results follow the order of `calls`.
    async fn execute_owned(
        &self,
        calls: &[ToolCall],
        records: &mut Vec<OperationRecord>,
        request_id: &str,
    ) -> Vec<Value> {
        let mut pending: FuturesUnordered<_> = calls
            .iter()
            .enumerate()
            .map(|(index, call)| async move {
                let name = strip_prefix(call.name());
                let args = parse_arguments(&call.function.arguments, request_id, name);
                let started = Instant::now();
                let output = self.registry.execute(name, args).await;
                (index, name, output, started.elapsed())
            })
            .collect();

        let mut results = vec![Value::Null; calls.len()];
        while let Some((index, name, output, elapsed)) = pending.next().await {
            let record = match output.error_message() {
                None => OperationRecord::success(OperationKind::ToolCall, name, elapsed),
                Some(error) => {
                    OperationRecord::failure(OperationKind::ToolCall, name, elapsed, error)
                }
            };
            log::debug!(
                "[{}] Tool '{}' finished in {}ms ({:?})",
                request_id,
                name,
                record.latency_ms,
                record.outcome
            );
            records.push(record);
            results[index] = output.into_value();
        }
        results
    }
}

/// Arguments of a tool call. Anything but a JSON object becomes `{}`.
fn parse_arguments(raw: &str, request_id: &str, tool_name: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) | Err(_) => {
            log::warn!(
                "[{}] Malformed arguments for tool '{}', using {{}}",
                request_id,
                tool_name
            );
            Value::Object(Map::new())
        }
    }
}

fn retain_tool_calls(response: &mut ChatCompletionResponse, calls: Vec<ToolCall>) {
    if let Some(choice) = response.choices.first_mut() {
        choice.message.tool_calls = Some(calls);
    }
}

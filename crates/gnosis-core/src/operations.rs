//! Per-request diagnostic records attached to completion responses.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Retrieval,
    ToolCall,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationOutcome {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationRecord {
    pub kind: OperationKind,
    pub name: String,
    pub latency_ms: u64,
    pub outcome: OperationOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl OperationRecord {
    pub fn success(kind: OperationKind, name: impl Into<String>, latency: Duration) -> Self {
        Self {
            kind,
            name: name.into(),
            latency_ms: latency.as_millis() as u64,
            outcome: OperationOutcome::Success,
            error: None,
            detail: None,
        }
    }

    pub fn failure(
        kind: OperationKind,
        name: impl Into<String>,
        latency: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            latency_ms: latency.as_millis() as u64,
            outcome: OperationOutcome::Error,
            error: Some(error.into()),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome == OperationOutcome::Success
    }
}

/// The `gnosis_metadata` object of a non-streamed completion response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GnosisMetadata {
    pub operations: Vec<OperationRecord>,
    pub total_tokens: u64,
    pub total_latency_ms: u64,
    pub summary: String,
}

impl GnosisMetadata {
    pub fn new(operations: Vec<OperationRecord>, total_tokens: u64, total_latency: Duration) -> Self {
        let summary = summarize(&operations);
        Self {
            operations,
            total_tokens,
            total_latency_ms: total_latency.as_millis() as u64,
            summary,
        }
    }
}

fn summarize(operations: &[OperationRecord]) -> String {
    let describe = |kind: OperationKind, singular: &str, plural: &str| -> Option<String> {
        let (total, failed) = operations
            .iter()
            .filter(|record| record.kind == kind)
            .fold((0usize, 0usize), |(total, failed), record| {
                (total + 1, failed + usize::from(!record.is_success()))
            });
        if total == 0 {
            return None;
        }
        let noun = if total == 1 { singular } else { plural };
        Some(if failed > 0 {
            format!("{} {} ({} failed)", total, noun, failed)
        } else {
            format!("{} {}", total, noun)
        })
    };

    let parts: Vec<String> = [
        describe(OperationKind::Retrieval, "retrieval", "retrievals"),
        describe(OperationKind::ToolCall, "tool call", "tool calls"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        "no augmentation performed".to_string()
    } else {
        parts.join(", ")
    }
}

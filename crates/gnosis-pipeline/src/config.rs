use serde::{Deserialize, Serialize};

/// Per-process settings of the completion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Follow-up dispatches allowed after owned tool calls. With `1`, the
    /// first follow-up response is returned as-is.
    pub max_tool_rounds: usize,
    pub retrieval_limit: usize,
    pub retrieval_score_threshold: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 1,
            retrieval_limit: 5,
            retrieval_score_threshold: 0.5,
        }
    }
}

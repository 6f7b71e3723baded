use std::sync::Arc;

use async_trait::async_trait;
use gnosis_core::Retriever;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::registry::Tool;

const DEFAULT_LIMIT: usize = 5;
const DEFAULT_SCORE_THRESHOLD: f64 = 0.5;
const MAX_LIMIT: usize = 20;

/// Lets the model query the knowledge base on its own, on top of the
/// automatic retrieval done before each completion.
pub struct SearchDocumentationTool {
    retriever: Arc<dyn Retriever>,
    limit: usize,
    score_threshold: f64,
}

impl SearchDocumentationTool {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self {
            retriever,
            limit: DEFAULT_LIMIT,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, MAX_LIMIT);
        self
    }

    pub fn with_score_threshold(mut self, score_threshold: f64) -> Self {
        self.score_threshold = score_threshold;
        self
    }
}

#[async_trait]
impl Tool for SearchDocumentationTool {
    fn name(&self) -> &str {
        "search_documentation"
    }

    fn description(&self) -> &str {
        "Search the product documentation knowledge base and return the most relevant passages"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look for in the documentation"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of passages to return",
                    "minimum": 1,
                    "maximum": MAX_LIMIT
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' parameter".to_string()))?;

        let limit = args
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|l| (l as usize).clamp(1, MAX_LIMIT))
            .unwrap_or(self.limit);

        let mut chunks = self
            .retriever
            .search(query, limit, self.score_threshold)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        chunks.sort_by(|a, b| b.score.total_cmp(&a.score));

        let count = chunks.len();
        Ok(json!({
            "results": chunks,
            "count": count,
        }))
    }
}

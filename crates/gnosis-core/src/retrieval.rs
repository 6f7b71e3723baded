//! Retrieval backend collaborator.
//!
//! The gateway never ranks documents itself. It only decides when to ask a
//! [`Retriever`] and how to splice the ranked snippets into a conversation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    pub text: String,
    #[serde(default)]
    pub filename: String,
    pub score: f64,
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Retrieval backend unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid retrieval response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Ranked snippets for `query`, best first, at most `limit` entries, none
    /// scoring below `score_threshold`.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        score_threshold: f64,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError>;
}

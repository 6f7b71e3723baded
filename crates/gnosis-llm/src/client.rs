use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use gnosis_core::{ChatCompletionRequest, ChatCompletionResponse};

use crate::error::{LLMError, Result};

/// Raw lines of a streamed upstream body, without their line terminator.
pub type LineStream = Pin<Box<dyn Stream<Item = std::result::Result<String, LLMError>> + Send>>;

/// Upstream chat-completion collaborator.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse>;

    /// Opens a streamed completion. Resolves once the upstream has accepted
    /// the request; body lines are yielded as they arrive.
    async fn complete_stream(&self, request: &ChatCompletionRequest) -> Result<LineStream>;
}

use std::time::Duration;

use async_trait::async_trait;
use gnosis_core::{ChatCompletionRequest, ChatCompletionResponse};
use reqwest::{Client, Response};

use crate::client::{CompletionClient, LineStream};
use crate::error::{LLMError, Result};
use crate::lines::lines_from_response;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send(&self, request: &ChatCompletionRequest) -> Result<Response> {
        let body = serde_json::to_vec(request)?;

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await?;
            log::warn!("Upstream completion failed with HTTP {}", status);
            return Err(LLMError::Api { status, body });
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionClient for OpenAIClient {
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let exchange = async {
            let response = self.send(request).await?;
            let text = response.text().await?;
            serde_json::from_str::<ChatCompletionResponse>(&text)
                .map_err(|e| LLMError::InvalidResponse(e.to_string()))
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| LLMError::Timeout(self.timeout))?
    }

    async fn complete_stream(&self, request: &ChatCompletionRequest) -> Result<LineStream> {
        // Only the wait for response headers is bounded; the body may run
        // for as long as the upstream keeps producing.
        let response = tokio::time::timeout(self.timeout, self.send(request))
            .await
            .map_err(|_| LLMError::Timeout(self.timeout))??;

        Ok(lines_from_response(response))
    }
}

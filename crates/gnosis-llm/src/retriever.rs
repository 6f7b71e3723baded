//! HTTP implementation of the retrieval collaborator.

use std::time::Duration;

use async_trait::async_trait;
use gnosis_core::{RetrievalError, RetrievedChunk, Retriever};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: usize,
    score_threshold: f64,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RetrievedChunk>,
}

/// Posts `{query, limit, score_threshold}` to a search endpoint and expects
/// `{"results": [{text, filename, score}]}` back.
pub struct HttpRetriever {
    client: Client,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpRetriever {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        score_threshold: f64,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let mut request = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&SearchRequest {
                query,
                limit,
                score_threshold,
            });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RetrievalError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Unavailable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::InvalidResponse(e.to_string()))?;

        log::debug!(
            "Retrieval for {:?} returned {} result(s)",
            query,
            parsed.results.len()
        );
        Ok(parsed.results)
    }
}

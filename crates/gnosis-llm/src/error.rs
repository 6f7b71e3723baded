use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Upstream answered with a non-2xx status; the body is kept verbatim.
    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Upstream did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    #[error("Stream error: {0}")]
    Stream(String),
}

impl LLMError {
    pub fn is_timeout(&self) -> bool {
        match self {
            LLMError::Timeout(_) => true,
            LLMError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LLMError>;

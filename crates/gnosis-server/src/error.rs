use actix_web::{http::header::ContentType, http::StatusCode, HttpResponse, ResponseError};
use gnosis_llm::LLMError;
use gnosis_pipeline::OrchestratorError;
use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Non-2xx upstream answer, relayed with its own status and body.
    #[error("Upstream returned HTTP {status}")]
    Upstream { status: u16, body: String },

    #[error("Upstream timed out: {0}")]
    UpstreamTimeout(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AppError {
    fn error_type(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "authentication_error",
            AppError::BadRequest(_) => "invalid_request_error",
            AppError::Upstream { .. } | AppError::UpstreamUnavailable(_) => "upstream_error",
            AppError::UpstreamTimeout(_) => "upstream_timeout",
            AppError::SerializationError(_) => "gateway_error",
        }
    }
}

impl From<LLMError> for AppError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::Api { status, body } => AppError::Upstream { status, body },
            LLMError::Json(e) => AppError::SerializationError(e),
            other if other.is_timeout() => AppError::UpstreamTimeout(other.to_string()),
            other => AppError::UpstreamUnavailable(other.to_string()),
        }
    }
}

impl From<OrchestratorError> for AppError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::InvalidRequest(message) => AppError::BadRequest(message),
            OrchestratorError::Upstream(e) => e.into(),
        }
    }
}

#[derive(Serialize)]
struct JsonError {
    message: String,
    r#type: String,
}

#[derive(Serialize)]
struct JsonErrorWrapper {
    error: JsonError,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        if let AppError::Upstream { body, .. } = self {
            let content_type = if serde_json::from_str::<serde_json::Value>(body).is_ok() {
                ContentType::json()
            } else {
                ContentType::plaintext()
            };
            return HttpResponse::build(status_code)
                .content_type(content_type)
                .body(body.clone());
        }

        let error_response = JsonErrorWrapper {
            error: JsonError {
                message: self.to_string(),
                r#type: self.error_type().to_string(),
            },
        };
        HttpResponse::build(status_code).json(error_response)
    }
}

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use gnosis_core::ChatCompletionRequest;
use gnosis_pipeline::CompletionOutcome;
use uuid::Uuid;

use crate::error::AppError;
use crate::logging::Timer;
use crate::state::AppState;
use crate::stream_relay::relay_lines;

/// OpenAI-compatible completions. Non-streamed responses carry
/// `gnosis_metadata`; streamed ones are relayed line by line without it.
pub async fn handler(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    state.auth.authorize(&req)?;

    let request: ChatCompletionRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid completion request: {}", e)))?;

    let request_id = Uuid::new_v4().to_string();
    log::info!(
        "[{}] Completion request: model={}, messages={}, stream={}",
        request_id,
        request.model,
        request.messages.len(),
        request.is_stream()
    );

    let timer = Timer::new("chat completion");
    let outcome = state.orchestrator.execute(&request, &request_id).await;
    timer.debug(&request_id);

    match outcome {
        Ok(CompletionOutcome::Complete(response)) => {
            let body = serde_json::to_vec(&response)?;
            Ok(HttpResponse::Ok()
                .content_type(header::ContentType::json())
                .body(body))
        }
        Ok(CompletionOutcome::Stream(lines)) => Ok(HttpResponse::Ok()
            .content_type("text/event-stream")
            .insert_header((header::CACHE_CONTROL, "no-cache"))
            .streaming(relay_lines(lines, request_id))),
        Err(e) => {
            log::error!("[{}] Completion failed: {}", request_id, e);
            Err(e.into())
        }
    }
}

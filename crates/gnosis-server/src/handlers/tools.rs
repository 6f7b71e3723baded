use actix_web::{web, HttpRequest, HttpResponse};
use gnosis_pipeline::INTERNAL_TOOL_PREFIX;
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

/// Registry tools as they are advertised upstream.
pub async fn handler(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    state.auth.authorize(&req)?;

    let registry = state.orchestrator.registry();
    let data: Vec<_> = registry
        .all_definitions()
        .into_iter()
        .map(|definition| {
            let scope = registry.entry(&definition.name).map(|entry| entry.scope());
            json!({
                "type": "function",
                "function": definition.to_schema(INTERNAL_TOOL_PREFIX).function,
                "scope": scope,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "object": "list",
        "data": data,
    })))
}

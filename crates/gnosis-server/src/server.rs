use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use gnosis_llm::{HttpRetriever, OpenAIClient};
use gnosis_pipeline::CompletionOrchestrator;
use gnosis_tools::{register_builtin_tools, RegistryError, SearchDocumentationTool, ToolRegistry};

use crate::auth::ApiKeyAuth;
use crate::config::{GatewayConfig, UPSTREAM_TIMEOUT};
use crate::handlers;
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
        .route("/health", web::get().to(handlers::health::handler))
        .service(
            web::scope("/v1")
                .route(
                    "/chat/completions",
                    web::post().to(handlers::completions::handler),
                )
                .route("/agent/converse", web::get().to(handlers::voice::handler))
                .route("/tools", web::get().to(handlers::tools::handler)),
        );
}

/// Builds the registry, collaborators and orchestrator. The registry is
/// frozen behind an `Arc` before any request is served.
pub fn build_state(config: &GatewayConfig) -> Result<AppState, RegistryError> {
    let client = Arc::new(
        OpenAIClient::new(config.openai_api_key.clone())
            .with_base_url(config.openai_base_url.clone())
            .with_timeout(UPSTREAM_TIMEOUT),
    );

    let retriever = config.retrieval_url.as_ref().map(|url| {
        let retriever = HttpRetriever::new(url.clone());
        let retriever = match &config.retrieval_api_key {
            Some(key) => retriever.with_api_key(key.clone()),
            None => retriever,
        };
        Arc::new(retriever)
    });

    let mut registry = ToolRegistry::new();
    let search = retriever.clone().map(|retriever| {
        SearchDocumentationTool::new(retriever)
            .with_limit(config.retrieval_limit)
            .with_score_threshold(config.retrieval_score_threshold)
    });
    register_builtin_tools(&mut registry, search)?;
    log::info!("Registered {} tool(s)", registry.len());

    let mut orchestrator = CompletionOrchestrator::new(client, Arc::new(registry))
        .with_config(config.orchestrator_config());
    if let Some(retriever) = retriever {
        orchestrator = orchestrator.with_retriever(retriever);
    }

    let auth = ApiKeyAuth::new(&config.api_keys);
    if !auth.is_enabled() {
        log::warn!("No gateway API keys configured, authentication is disabled");
    }

    Ok(AppState::new(orchestrator, auth, config.voice_backend()))
}

pub async fn run_server(host: &str, port: u16, state: AppState) -> io::Result<()> {
    let state = web::Data::new(state);

    log::info!("Listening on {}:{}", host, port);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .configure(app_config)
    })
    .bind((host, port))?
    .run()
    .await
}

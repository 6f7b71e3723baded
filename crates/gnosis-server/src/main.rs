use anyhow::Context;
use clap::Parser;

use gnosis_server::config::GatewayConfig;
use gnosis_server::logging::init_logging;
use gnosis_server::server::{build_state, run_server};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::parse();

    if config.log_level.is_some() {
        // RUST_LOG wins over --debug
        env_logger::init();
    } else {
        init_logging(config.debug);
    }

    log::info!("Starting gnosis gateway on {}:{}", config.host, config.port);
    log::info!("Upstream completions: {}", config.openai_base_url);
    match &config.retrieval_url {
        Some(url) => log::info!("Retrieval backend: {}", url),
        None => log::info!("Retrieval backend: disabled"),
    }
    log::info!("Voice backend: {}", config.voice_agent_url);

    if config.debug {
        log::debug!("Debug mode enabled");
        log::debug!("  Max tool rounds: {}", config.max_tool_rounds);
        log::debug!("  Retrieval limit: {}", config.retrieval_limit);
        log::debug!(
            "  Retrieval score threshold: {}",
            config.retrieval_score_threshold
        );
    }

    let state = build_state(&config).context("failed to initialise gateway state")?;

    run_server(&config.host, config.port, state)
        .await
        .context("server terminated with an error")
}

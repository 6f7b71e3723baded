use std::time::Duration;

use clap::Parser;
use gnosis_pipeline::OrchestratorConfig;

pub const DEFAULT_VOICE_AGENT_URL: &str = "wss://agent.deepgram.com/v1/agent/converse";
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);
pub const VOICE_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug, Clone)]
#[command(name = "gnosis-server")]
#[command(about = "AI gateway with retrieval and tool augmentation")]
#[command(version)]
pub struct GatewayConfig {
    /// Enable debug mode
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Bind address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port
    #[arg(long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Base URL of the OpenAI-compatible completion API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// API key sent to the completion API
    #[arg(long, env = "OPENAI_API_KEY", default_value = "", hide_env_values = true)]
    pub openai_api_key: String,

    /// Search endpoint of the retrieval backend; retrieval is off when unset
    #[arg(long, env = "RETRIEVAL_URL")]
    pub retrieval_url: Option<String>,

    /// Bearer key for the retrieval backend
    #[arg(long, env = "RETRIEVAL_API_KEY", hide_env_values = true)]
    pub retrieval_api_key: Option<String>,

    /// Maximum number of retrieved passages per request
    #[arg(long, env = "RETRIEVAL_LIMIT", default_value = "5")]
    pub retrieval_limit: usize,

    /// Minimum relevance score of retrieved passages
    #[arg(long, env = "RETRIEVAL_SCORE_THRESHOLD", default_value = "0.5")]
    pub retrieval_score_threshold: f64,

    /// Voice agent websocket endpoint
    #[arg(long, env = "VOICE_AGENT_URL", default_value = DEFAULT_VOICE_AGENT_URL)]
    pub voice_agent_url: String,

    /// API key for the voice agent backend
    #[arg(long, env = "DEEPGRAM_API_KEY", default_value = "", hide_env_values = true)]
    pub deepgram_api_key: String,

    /// Comma separated gateway API keys; authentication is off when empty
    #[arg(long, env = "GNOSIS_API_KEYS", value_delimiter = ',', hide_env_values = true)]
    pub api_keys: Vec<String>,

    /// Follow-up dispatches allowed after owned tool calls
    #[arg(long, env = "MAX_TOOL_ROUNDS", default_value = "1")]
    pub max_tool_rounds: usize,

    /// Log level (overrides debug flag)
    #[arg(long, env = "RUST_LOG")]
    pub log_level: Option<String>,
}

impl GatewayConfig {
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_tool_rounds: self.max_tool_rounds,
            retrieval_limit: self.retrieval_limit,
            retrieval_score_threshold: self.retrieval_score_threshold,
        }
    }

    pub fn voice_backend(&self) -> VoiceBackendConfig {
        VoiceBackendConfig {
            url: self.voice_agent_url.clone(),
            api_key: self.deepgram_api_key.clone(),
            connect_timeout: VOICE_CONNECT_TIMEOUT,
        }
    }
}

/// Where and how the voice relay reaches its backend.
#[derive(Debug, Clone)]
pub struct VoiceBackendConfig {
    pub url: String,
    pub api_key: String,
    pub connect_timeout: Duration,
}

pub mod augment;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod retrieval;

pub use augment::{augment_request, is_owned, strip_prefix, INTERNAL_TOOL_PREFIX};
pub use config::OrchestratorConfig;
pub use error::OrchestratorError;
pub use orchestrator::{CompletionOrchestrator, CompletionOutcome};
pub use retrieval::{extract_user_query, inject_context, is_continuation, RetrievalGate};

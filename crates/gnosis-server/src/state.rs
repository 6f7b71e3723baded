use std::sync::Arc;

use gnosis_pipeline::CompletionOrchestrator;

use crate::auth::ApiKeyAuth;
use crate::config::VoiceBackendConfig;

/// Shared, read-only request state. Built once before the server binds.
pub struct AppState {
    pub orchestrator: Arc<CompletionOrchestrator>,
    pub auth: ApiKeyAuth,
    pub voice: VoiceBackendConfig,
}

impl AppState {
    pub fn new(
        orchestrator: CompletionOrchestrator,
        auth: ApiKeyAuth,
        voice: VoiceBackendConfig,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            auth,
            voice,
        }
    }
}

//! Application State

use std::sync::Arc;

use agent_core::{FacadeAgent, FacadeProvider, GenerationOptions, LlmProvider, MemorySessionStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Base model chain from the LLM config list
    pub provider: Arc<dyn LlmProvider>,

    /// The agent ensemble behind `/api/chat`
    pub facade: Arc<FacadeAgent>,

    /// The same ensemble behind the provider interface (streaming, model list)
    pub facade_provider: Arc<FacadeProvider>,

    /// Conversation memory keyed by `conversation_id`
    pub sessions: Arc<MemorySessionStore>,

    /// Options for direct base-model calls
    pub options: GenerationOptions,
}

impl AppState {
    pub fn new(provider: Arc<dyn LlmProvider>, facade: FacadeAgent, options: GenerationOptions) -> Self {
        let facade = Arc::new(facade);
        Self {
            provider,
            facade_provider: Arc::new(FacadeProvider::new(facade.clone())),
            facade,
            sessions: Arc::new(MemorySessionStore::new()),
            options,
        }
    }
}

use std::sync::Arc;

use crate::config::{Config, ModelSettings};
use crate::llm_client::Completer;
use crate::otp::OtpService;
use crate::persistence::adapter::PersistenceAdapter;
use crate::persistence::KvStore;
use crate::whiteboard::pipeline::Debouncer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Completion provider. `LlmClient` in production, scripted in tests.
    pub llm: Arc<dyn Completer>,
    pub models: ModelSettings,
    /// Remote-first, local-fallback session storage.
    pub persistence: Arc<PersistenceAdapter>,
    /// Live interview rounds keyed by `interview:<sessionId>`.
    pub sessions: Arc<dyn KvStore>,
    pub otp: Arc<OtpService>,
    /// Trailing-edge debounce for chat-triggered whiteboard extraction.
    pub extraction: Debouncer,
    pub config: Config,
}

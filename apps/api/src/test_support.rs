//! Shared fixtures for unit tests: a scripted completer, a failing store, and
//! an `AppState` wired entirely in memory.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{Config, ModelSettings};
use crate::llm_client::{ChatMessage, Completer, CompletionOptions, LlmError, Provider};
use crate::otp::cache::MemoryOtpCache;
use crate::otp::sender::EchoSmsSender;
use crate::otp::OtpService;
use crate::persistence::adapter::PersistenceAdapter;
use crate::persistence::memory::MemoryStore;
use crate::persistence::{KvStore, StoreError};
use crate::state::AppState;
use crate::whiteboard::pipeline::Debouncer;

type Responder =
    dyn Fn(&[ChatMessage], &CompletionOptions) -> Result<String, LlmError> + Send + Sync;

/// Completer whose replies come from a closure.
pub struct ScriptedCompleter {
    responder: Box<Responder>,
    calls: AtomicUsize,
}

impl ScriptedCompleter {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[ChatMessage], &CompletionOptions) -> Result<String, LlmError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails; pipelines fall back to their deterministic paths.
    pub fn unavailable() -> Self {
        Self::new(|_, _| Err(LlmError::EmptyContent))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Completer for ScriptedCompleter {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.responder)(messages, options)
    }
}

/// A store whose every operation fails, standing in for an unreachable database.
pub struct FailingStore;

#[async_trait]
impl KvStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<Value>, StoreError> {
        Err(StoreError::Unavailable("remote store is down".into()))
    }

    async fn set(&self, _key: &str, _value: Value) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("remote store is down".into()))
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("remote store is down".into()))
    }
}

pub fn chat_options() -> CompletionOptions {
    CompletionOptions {
        model: "test-chat".into(),
        temperature: 0.7,
        max_tokens: 1000,
        provider: Provider::OpenAiCompatible,
    }
}

pub fn extraction_options() -> CompletionOptions {
    CompletionOptions {
        model: "test-extract".into(),
        temperature: 0.2,
        max_tokens: 1000,
        provider: Provider::OpenAiCompatible,
    }
}

pub fn test_config() -> Config {
    Config {
        port: 0,
        rust_log: "debug".into(),
        llm_api_key: None,
        llm_provider: Provider::OpenAiCompatible,
        llm_base_url: None,
        chat_model: "test-chat".into(),
        extract_model: "test-extract".into(),
        llm_timeout: Duration::from_secs(30),
        extraction_debounce: Duration::from_millis(1000),
        database_url: None,
        local_store_dir: "./target/test-local-store".into(),
        redis_url: None,
        sms: None,
    }
}

/// In-memory `AppState` with a remote store that works.
pub fn test_state(completer: Arc<dyn Completer>) -> AppState {
    let remote: Arc<dyn KvStore> = Arc::new(MemoryStore::default());
    test_state_with_remote(completer, Some(remote))
}

pub fn test_state_with_remote(
    completer: Arc<dyn Completer>,
    remote: Option<Arc<dyn KvStore>>,
) -> AppState {
    let config = test_config();
    AppState {
        llm: completer,
        models: ModelSettings {
            chat: chat_options(),
            extraction: extraction_options(),
        },
        persistence: Arc::new(PersistenceAdapter::new(
            remote,
            Arc::new(MemoryStore::default()),
        )),
        sessions: Arc::new(MemoryStore::default()),
        otp: Arc::new(OtpService::new(
            Arc::new(MemoryOtpCache::default()),
            Arc::new(EchoSmsSender),
        )),
        extraction: Debouncer::new(config.extraction_debounce),
        config,
    }
}

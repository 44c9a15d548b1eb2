mod config;
mod conversation;
mod db;
mod documents;
mod errors;
mod interview;
mod llm_client;
mod otp;
mod persistence;
mod routes;
mod stages;
mod state;
mod whiteboard;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, ModelSettings};
use crate::db::create_pool;
use crate::llm_client::{Completer, LlmClient};
use crate::otp::cache::{MemoryOtpCache, OtpCache, RedisOtpCache};
use crate::otp::sender::{EchoSmsSender, HttpSmsSender, SmsSender};
use crate::otp::OtpService;
use crate::persistence::adapter::PersistenceAdapter;
use crate::persistence::file::FileStore;
use crate::persistence::memory::MemoryStore;
use crate::persistence::postgres::PgStore;
use crate::persistence::KvStore;
use crate::routes::build_router;
use crate::state::AppState;
use crate::whiteboard::pipeline::Debouncer;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting coach API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(
        config.llm_api_key.clone(),
        config.llm_base_url.clone(),
        config.llm_timeout,
    )?;
    if config.llm_api_key.is_none() {
        warn!("LLM_API_KEY is not set; chat replies will report the missing credential");
    }
    let models = ModelSettings::from_config(&config);
    info!(
        "LLM client initialized (provider: {:?}, chat: {}, extraction: {})",
        config.llm_provider, models.chat.model, models.extraction.model
    );

    // Remote store is optional: without it, or when it is unreachable, sessions live locally.
    let remote = match &config.database_url {
        Some(url) => connect_remote(url).await,
        None => {
            info!("DATABASE_URL not set; using local storage only");
            None
        }
    };
    let local: Arc<dyn KvStore> = Arc::new(FileStore::open(&config.local_store_dir).await?);
    info!("Local store at {}", config.local_store_dir.display());
    let persistence = Arc::new(PersistenceAdapter::new(remote, local));

    // OTP cache and SMS sender
    let otp_cache: Arc<dyn OtpCache> = match &config.redis_url {
        Some(url) => {
            info!("Redis OTP cache initialized");
            Arc::new(RedisOtpCache::new(redis::Client::open(url.as_str())?))
        }
        None => Arc::new(MemoryOtpCache::default()),
    };
    let sms_sender: Arc<dyn SmsSender> = match config.sms.clone() {
        Some(sms) => Arc::new(HttpSmsSender::new(sms)),
        None => {
            warn!("SMS gateway not configured; verification codes are echoed in responses");
            Arc::new(EchoSmsSender)
        }
    };

    let extraction = Debouncer::new(config.extraction_debounce);

    // Build app state
    let state = AppState {
        llm: Arc::new(llm) as Arc<dyn Completer>,
        models,
        persistence,
        sessions: Arc::new(MemoryStore::default()),
        otp: Arc::new(OtpService::new(otp_cache, sms_sender)),
        extraction: extraction.clone(),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(extraction))
        .await?;

    Ok(())
}

async fn connect_remote(url: &str) -> Option<Arc<dyn KvStore>> {
    let pool = match create_pool(url).await {
        Ok(pool) => pool,
        Err(e) => {
            warn!("Remote store unavailable, using local storage: {e}");
            return None;
        }
    };
    let store = PgStore::new(pool);
    if let Err(e) = store.ensure_schema().await {
        warn!("Remote store schema setup failed, using local storage: {e}");
        return None;
    }
    Some(Arc::new(store))
}

/// Waits for Ctrl-C, then drops pending extraction timers.
async fn shutdown_signal(extraction: Debouncer) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        return;
    }
    info!("Shutting down; {} pending extraction(s) dropped", extraction.pending());
    extraction.cancel_all();
}

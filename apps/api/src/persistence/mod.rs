//! Key-value persistence behind a single async trait.
//!
//! `PgStore` is the remote store, `FileStore` the local fallback, and
//! `MemoryStore` backs interview sessions and tests. `PersistenceAdapter`
//! layers the remote-first / local-fallback policy on top.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod adapter;
pub mod file;
pub mod handlers;
pub mod keys;
pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::persistence::StoreError;

/// Short-lived storage for issued codes, keyed by phone number.
#[async_trait]
pub trait OtpCache: Send + Sync {
    async fn put(&self, phone: &str, code: &str, ttl: Duration) -> Result<(), StoreError>;
    /// The live code for `phone`, if one was issued and has not expired.
    async fn get(&self, phone: &str) -> Result<Option<String>, StoreError>;
    async fn remove(&self, phone: &str) -> Result<(), StoreError>;
}

/// In-process cache. Expired entries are dropped lazily on access.
#[derive(Default)]
pub struct MemoryOtpCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

#[async_trait]
impl OtpCache for MemoryOtpCache {
    async fn put(&self, phone: &str, code: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, (_, expires)| *expires > Instant::now());
        entries.insert(phone.to_string(), (code.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, phone: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().await;
        match entries.get(phone) {
            Some((code, expires)) if *expires > Instant::now() => Ok(Some(code.clone())),
            Some(_) => {
                entries.remove(phone);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, phone: &str) -> Result<(), StoreError> {
        self.entries.lock().await.remove(phone);
        Ok(())
    }
}

/// Redis-backed cache; expiry is delegated to `SET EX`.
pub struct RedisOtpCache {
    client: redis::Client,
}

impl RedisOtpCache {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    fn key(phone: &str) -> String {
        format!("otp:{phone}")
    }
}

#[async_trait]
impl OtpCache for RedisOtpCache {
    async fn put(&self, phone: &str, code: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(Self::key(phone), code, ttl.as_secs())
            .await?;
        Ok(())
    }

    async fn get(&self, phone: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let code: Option<String> = conn.get(Self::key(phone)).await?;
        Ok(code)
    }

    async fn remove(&self, phone: &str) -> Result<(), StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(Self::key(phone)).await?;
        Ok(())
    }
}

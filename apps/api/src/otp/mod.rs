//! Phone-number one-time codes for login.
//!
//! Codes are six digits, live for five minutes, and are consumed by the first
//! successful verification.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use rand::Rng;
use regex::Regex;
use thiserror::Error;
use tracing::info;

use crate::persistence::StoreError;

pub mod cache;
pub mod handlers;
pub mod sender;

use cache::OtpCache;
use sender::SmsSender;

pub const CODE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    #[error("Code cache error: {0}")]
    Cache(#[from] StoreError),

    #[error("SMS delivery failed: {0}")]
    Delivery(String),
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^1[3-9]\d{9}$").expect("phone regex is valid"))
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone_regex().is_match(phone)
}

fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

pub struct OtpService {
    cache: Arc<dyn OtpCache>,
    sender: Arc<dyn SmsSender>,
}

impl OtpService {
    pub fn new(cache: Arc<dyn OtpCache>, sender: Arc<dyn SmsSender>) -> Self {
        Self { cache, sender }
    }

    /// Issues and delivers a fresh code, replacing any earlier one. Returns the
    /// code only when the sender is the development echo sender.
    pub async fn send(&self, phone: &str) -> Result<Option<String>, OtpError> {
        let phone = phone.trim();
        if !is_valid_phone(phone) {
            return Err(OtpError::InvalidPhone(phone.to_string()));
        }
        let code = generate_code();
        self.cache.put(phone, &code, CODE_TTL).await?;
        if let Err(e) = self.sender.send(phone, &code).await {
            // An undelivered code must not stay valid.
            self.cache.remove(phone).await?;
            return Err(e);
        }
        Ok(self.sender.exposes_code().then_some(code))
    }

    /// Checks a code. A match consumes it.
    pub async fn verify(&self, phone: &str, code: &str) -> Result<bool, OtpError> {
        let phone = phone.trim();
        if !is_valid_phone(phone) {
            return Err(OtpError::InvalidPhone(phone.to_string()));
        }
        match self.cache.get(phone).await? {
            Some(expected) if expected == code.trim() => {
                self.cache.remove(phone).await?;
                info!("Phone {phone} verified");
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::llm_client::{CompletionOptions, Provider, DEFAULT_TIMEOUT};

const DEFAULT_CHAT_MODEL: &str = "deepseek-chat";
const CHAT_TEMPERATURE: f32 = 0.7;
const CHAT_MAX_TOKENS: u32 = 2000;
/// Extraction runs colder than conversation to keep the JSON well-formed.
const EXTRACTION_TEMPERATURE: f32 = 0.2;
const EXTRACTION_MAX_TOKENS: u32 = 2000;

/// Credentials for the SMS gateway. Absent = development sender that echoes codes.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub template_code: String,
    pub sign_name: String,
    pub gateway_url: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Missing keys surface per request as a credential error, not at startup.
    pub llm_api_key: Option<String>,
    pub llm_provider: Provider,
    pub llm_base_url: Option<String>,
    pub chat_model: String,
    pub extract_model: String,
    pub llm_timeout: Duration,
    pub extraction_debounce: Duration,
    /// Remote store. `None` = local store only.
    pub database_url: Option<String>,
    pub local_store_dir: PathBuf,
    /// OTP cache. `None` = in-process cache.
    pub redis_url: Option<String>,
    pub sms: Option<SmsConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let llm_provider = match optional_env("LLM_PROVIDER") {
            Some(p) => p.parse::<Provider>().map_err(|e| anyhow!(e))?,
            None => Provider::default(),
        };
        let chat_model =
            optional_env("LLM_CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string());

        Ok(Config {
            port: optional_env("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            llm_api_key: optional_env("LLM_API_KEY"),
            llm_provider,
            llm_base_url: optional_env("LLM_BASE_URL"),
            extract_model: optional_env("LLM_EXTRACT_MODEL").unwrap_or_else(|| chat_model.clone()),
            chat_model,
            llm_timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", DEFAULT_TIMEOUT.as_secs())?),
            extraction_debounce: Duration::from_millis(parse_env("EXTRACTION_DEBOUNCE_MS", 1000)?),
            database_url: optional_env("DATABASE_URL"),
            local_store_dir: optional_env("LOCAL_STORE_DIR")
                .unwrap_or_else(|| "./data/local-store".to_string())
                .into(),
            redis_url: optional_env("REDIS_URL"),
            sms: sms_from_env(),
        })
    }
}

fn sms_from_env() -> Option<SmsConfig> {
    Some(SmsConfig {
        access_key_id: optional_env("SMS_ACCESS_KEY_ID")?,
        access_key_secret: optional_env("SMS_ACCESS_KEY_SECRET")?,
        template_code: optional_env("SMS_TEMPLATE_CODE")?,
        sign_name: optional_env("SMS_SIGN_NAME").unwrap_or_default(),
        gateway_url: optional_env("SMS_GATEWAY_URL")?,
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env(key: &str, default: u64) -> Result<u64> {
    match optional_env(key) {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("{key} must be a non-negative integer")),
        None => Ok(default),
    }
}

/// Completion options for the two model roles.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub chat: CompletionOptions,
    pub extraction: CompletionOptions,
}

impl ModelSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chat: CompletionOptions {
                model: config.chat_model.clone(),
                temperature: CHAT_TEMPERATURE,
                max_tokens: CHAT_MAX_TOKENS,
                provider: config.llm_provider,
            },
            extraction: CompletionOptions {
                model: config.extract_model.clone(),
                temperature: EXTRACTION_TEMPERATURE,
                max_tokens: EXTRACTION_MAX_TOKENS,
                provider: config.llm_provider,
            },
        }
    }
}

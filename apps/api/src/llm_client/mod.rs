//! LLM Client: the single point of entry for all completion calls in the coach service.
//!
//! ARCHITECTURAL RULE: No other module may call a model provider directly.
//! Handlers and pipelines depend on the `Completer` trait; `LlmClient` is the
//! production implementation carried in `AppState` as `Arc<dyn Completer>`.
//!
//! No retries: a failed call is surfaced once and the caller turns it into a
//! user-facing message.

use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;

const OPENAI_COMPATIBLE_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default request timeout. Callers never retry past it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API key is not configured")]
    MissingApiKey,

    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Coarse classification used to pick a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    Credential,
    Quota,
    Timeout,
    Generic,
}

impl LlmError {
    pub fn kind(&self) -> LlmErrorKind {
        match self {
            LlmError::MissingApiKey => LlmErrorKind::Credential,
            LlmError::QuotaExhausted(_) => LlmErrorKind::Quota,
            LlmError::Timeout(_) => LlmErrorKind::Timeout,
            LlmError::Http(e) if e.is_timeout() => LlmErrorKind::Timeout,
            LlmError::Api { status, message } => match status {
                401 | 403 => LlmErrorKind::Credential,
                402 | 429 => LlmErrorKind::Quota,
                _ => classify_message(message),
            },
            other => classify_message(&other.to_string()),
        }
    }
}

fn classify_message(message: &str) -> LlmErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("api key") || lower.contains("api_key") || lower.contains("unauthorized") {
        LlmErrorKind::Credential
    } else if lower.contains("quota")
        || lower.contains("balance")
        || lower.contains("insufficient")
        || lower.contains("rate limit")
    {
        LlmErrorKind::Quota
    } else if lower.contains("timeout") || lower.contains("timed out") {
        LlmErrorKind::Timeout
    } else {
        LlmErrorKind::Generic
    }
}

/// Wire format spoken to the completion endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    OpenAiCompatible,
    Anthropic,
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "openai_compatible" | "deepseek" => Ok(Provider::OpenAiCompatible),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            other => Err(format!("unknown LLM provider '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub provider: Provider,
}

/// The completion seam. Implement this to swap providers (or script replies in tests)
/// without touching handlers or pipelines.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicResponse {
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// LlmClient
// ────────────────────────────────────────────────────────────────────────────

/// reqwest-backed completion client for OpenAI-compatible and Anthropic endpoints.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url,
            timeout,
        })
    }

    fn endpoint(&self, provider: Provider) -> &str {
        match (&self.base_url, provider) {
            (Some(url), _) => url.as_str(),
            (None, Provider::OpenAiCompatible) => OPENAI_COMPATIBLE_API_URL,
            (None, Provider::Anthropic) => ANTHROPIC_API_URL,
        }
    }

    async fn send(
        &self,
        api_key: &str,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let url = self.endpoint(options.provider);
        let request = match options.provider {
            Provider::OpenAiCompatible => self
                .client
                .post(url)
                .bearer_auth(api_key)
                .json(&OpenAiRequest {
                    model: &options.model,
                    temperature: options.temperature,
                    max_tokens: options.max_tokens,
                    messages,
                }),
            Provider::Anthropic => {
                let system = messages
                    .iter()
                    .filter(|m| m.role == ChatRole::System)
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                let turns = messages
                    .iter()
                    .filter(|m| m.role != ChatRole::System)
                    .map(|m| AnthropicMessage {
                        role: m.role.as_str(),
                        content: &m.content,
                    })
                    .collect();
                self.client
                    .post(url)
                    .header("x-api-key", api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&AnthropicRequest {
                        model: &options.model,
                        max_tokens: options.max_tokens,
                        temperature: options.temperature,
                        system: (!system.is_empty()).then_some(system),
                        messages: turns,
                    })
            }
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.timeout)
            } else {
                LlmError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ProviderError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(match status.as_u16() {
                402 | 429 => LlmError::QuotaExhausted(message),
                code => LlmError::Api {
                    status: code,
                    message,
                },
            });
        }

        let body = response.text().await?;
        let text = match options.provider {
            Provider::OpenAiCompatible => {
                let parsed: OpenAiResponse = serde_json::from_str(&body)?;
                if let Some(usage) = &parsed.usage {
                    debug!(
                        "Completion succeeded: model={}, prompt_tokens={}, completion_tokens={}",
                        options.model, usage.prompt_tokens, usage.completion_tokens
                    );
                }
                parsed
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
            }
            Provider::Anthropic => {
                let parsed: AnthropicResponse = serde_json::from_str(&body)?;
                if let Some(usage) = &parsed.usage {
                    debug!(
                        "Completion succeeded: model={}, input_tokens={}, output_tokens={}",
                        options.model, usage.input_tokens, usage.output_tokens
                    );
                }
                parsed.text().map(str::to_string)
            }
        };

        match text {
            Some(t) if !t.trim().is_empty() => Ok(t),
            _ => Err(LlmError::EmptyContent),
        }
    }
}

#[async_trait]
impl Completer for LlmClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        // reqwest's timeout covers the request; this also bounds body decoding.
        with_timeout(self.timeout, self.send(api_key, messages, options)).await
    }
}

/// Bounds a completion call; an elapsed deadline becomes `LlmError::Timeout`.
async fn with_timeout<F>(limit: Duration, call: F) -> Result<String, LlmError>
where
    F: std::future::Future<Output = Result<String, LlmError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| LlmError::Timeout(limit))?
}

// ────────────────────────────────────────────────────────────────────────────
// JSON helpers for model output
// ────────────────────────────────────────────────────────────────────────────

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

fn object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Greedy: first '{' through last '}'.
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex"))
}

/// Best-effort recovery of a JSON object from free-form model output.
///
/// Strips code fences, takes the greedy `{...}` span, and parses it. Returns
/// `None` when no object can be recovered; never errors.
pub fn parse_json_object(text: &str) -> Option<serde_json::Value> {
    let unfenced = strip_json_fences(text);
    let candidate = object_pattern().find(unfenced)?.as_str();
    match serde_json::from_str::<serde_json::Value>(candidate) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

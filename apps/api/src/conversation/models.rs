use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::llm_client::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    /// Stage-boundary markers in the all-history view only.
    System,
}

/// Canonical chat message. Created on every send/receive and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        match self.role {
            MessageRole::User => ChatMessage::user(&self.content),
            MessageRole::Assistant => ChatMessage::assistant(&self.content),
            MessageRole::System => ChatMessage::system(&self.content),
        }
    }
}

/// A message as clients send it: either `role` or the legacy `isUser` flag,
/// with `content` or `text`, and a timestamp as epoch-ms or an RFC 3339 string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_user: Option<bool>,
    #[serde(default, alias = "text")]
    pub content: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Value>,
}

impl RawMessage {
    /// Normalizes one boundary message. Returns `None` for messages with no
    /// recognizable role or no content.
    pub fn normalize(self) -> Option<Message> {
        let role = match (self.role.as_deref().map(str::to_lowercase), self.is_user) {
            (Some(r), _) if r == "user" || r == "human" => MessageRole::User,
            (Some(r), _) if r == "assistant" || r == "ai" || r == "bot" => MessageRole::Assistant,
            (Some(r), _) if r == "system" => MessageRole::System,
            (None, Some(true)) => MessageRole::User,
            (None, Some(false)) => MessageRole::Assistant,
            _ => return None,
        };
        let content = self.content.filter(|c| !c.trim().is_empty())?;
        Some(Message {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            role,
            content,
            timestamp: parse_timestamp(self.timestamp.as_ref()),
        })
    }
}

fn parse_timestamp(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_else(|| Utc::now().timestamp_millis()),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp_millis())
            .or_else(|_| s.parse::<i64>())
            .unwrap_or_else(|_| Utc::now().timestamp_millis()),
        _ => Utc::now().timestamp_millis(),
    }
}

/// Single normalization point for client-supplied message lists.
pub fn normalize_messages(raw: Vec<RawMessage>) -> Vec<Message> {
    raw.into_iter().filter_map(RawMessage::normalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: serde_json::Value) -> RawMessage {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_role_shape() {
        let msg = raw(serde_json::json!({"role": "assistant", "content": "你好", "timestamp": 1700000000000i64}))
            .normalize()
            .unwrap();
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn test_legacy_is_user_shape() {
        let msg = raw(serde_json::json!({"isUser": true, "text": "我想找工作"}))
            .normalize()
            .unwrap();
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.content, "我想找工作");
        assert!(!msg.id.is_empty());
    }

    #[test]
    fn test_rfc3339_timestamp() {
        let msg = raw(serde_json::json!({
            "role": "user",
            "content": "hi",
            "timestamp": "2024-01-01T00:00:00Z"
        }))
        .normalize()
        .unwrap();
        assert_eq!(msg.timestamp, 1_704_067_200_000);
    }

    #[test]
    fn test_unrecognizable_messages_are_dropped() {
        let messages = normalize_messages(vec![
            raw(serde_json::json!({"content": "no role"})),
            raw(serde_json::json!({"role": "user", "content": "   "})),
            raw(serde_json::json!({"role": "tool", "content": "x"})),
            raw(serde_json::json!({"role": "user", "content": "kept"})),
        ]);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "kept");
    }
}

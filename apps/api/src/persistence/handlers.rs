//! Axum route handlers for session load and save.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::conversation::models::{normalize_messages, RawMessage};
use crate::errors::AppError;
use crate::persistence::adapter::{SaveKind, SessionHint, SessionSnapshot};
use crate::stages::Stage;
use crate::state::AppState;
use crate::whiteboard::models::Whiteboard;

/// POST /api/load-session
///
/// Never fails on storage problems: an unreachable store yields the
/// local-storage default snapshot.
pub async fn handle_load_session(
    State(state): State<AppState>,
    Json(hint): Json<SessionHint>,
) -> Json<SessionSnapshot> {
    Json(state.persistence.load(&hint).await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub session_id: String,
    #[serde(default)]
    pub whiteboard: Option<Whiteboard>,
    #[serde(default)]
    pub current_stage: Option<String>,
    /// Stage the `messages` belong to. Defaults to `currentStage`.
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<RawMessage>>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub success: bool,
    pub use_local_storage: bool,
}

/// POST /api/save-whiteboard
///
/// Writes whichever parts are present. Write failures fall back to the local
/// store and are logged; the response reports where the session now lives.
pub async fn handle_save(
    State(state): State<AppState>,
    Json(request): Json<SaveRequest>,
) -> Result<Json<SaveResponse>, AppError> {
    let session_id = request.session_id.trim().to_string();
    if session_id.is_empty() {
        return Err(AppError::Validation("sessionId cannot be empty".to_string()));
    }

    let current_stage = match request.current_stage.as_deref() {
        Some(raw) => Some(
            raw.parse::<Stage>()
                .map_err(|_| AppError::Validation(format!("Unknown stage: {raw}")))?,
        ),
        None => None,
    };

    let mut saves = Vec::new();
    if let Some(whiteboard) = request.whiteboard {
        saves.push(SaveKind::Whiteboard(whiteboard));
    }
    if let Some(stage) = current_stage {
        saves.push(SaveKind::Stage(stage));
    }
    if let Some(messages) = request.messages {
        let stage = request
            .stage
            .as_deref()
            .and_then(|s| s.parse::<Stage>().ok())
            .or(current_stage)
            .unwrap_or(Stage::FIRST);
        saves.push(SaveKind::Messages {
            stage,
            messages: normalize_messages(messages),
        });
    }
    if let Some(user_id) = request.user_id.filter(|u| !u.trim().is_empty()) {
        saves.push(SaveKind::UserId(user_id));
    }

    let mut success = true;
    for kind in saves {
        if let Err(e) = state.persistence.save_now(&session_id, kind).await {
            warn!("Save for session {session_id} failed: {e}");
            success = false;
        }
    }

    Ok(Json(SaveResponse {
        success,
        use_local_storage: state.persistence.is_local_only(&session_id),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::persistence::KvStore;
    use crate::test_support::{test_state, test_state_with_remote, FailingStore, ScriptedCompleter};

    #[tokio::test]
    async fn test_load_with_failing_remote_returns_default() {
        let remote: Arc<dyn KvStore> = Arc::new(FailingStore);
        let state = test_state_with_remote(Arc::new(ScriptedCompleter::unavailable()), Some(remote));
        let hint: SessionHint = serde_json::from_value(json!({"sessionId": "abc"})).unwrap();

        let Json(snapshot) = handle_load_session(State(state), Json(hint)).await;
        assert_eq!(snapshot, SessionSnapshot::local_default());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let state = test_state(Arc::new(ScriptedCompleter::unavailable()));
        let Json(created) = handle_load_session(State(state.clone()), Json(SessionHint::default())).await;
        let sid = created.session_id.unwrap();

        let request: SaveRequest = serde_json::from_value(json!({
            "sessionId": sid,
            "currentStage": "interview",
            "whiteboard": {"intentRole": "产品经理"},
            "messages": [{"isUser": true, "text": "你好"}],
        }))
        .unwrap();
        let Json(saved) = handle_save(State(state.clone()), Json(request)).await.unwrap();
        assert!(saved.success);
        assert!(!saved.use_local_storage);

        let hint: SessionHint = serde_json::from_value(json!({"sessionId": sid})).unwrap();
        let Json(loaded) = handle_load_session(State(state), Json(hint)).await;
        assert_eq!(loaded.current_stage, Stage::Interview);
        assert_eq!(loaded.whiteboard.intent_role.as_deref(), Some("产品经理"));
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.messages[0].content, "你好");
    }

    #[tokio::test]
    async fn test_save_falls_back_to_local() {
        let remote: Arc<dyn KvStore> = Arc::new(FailingStore);
        let state = test_state_with_remote(Arc::new(ScriptedCompleter::unavailable()), Some(remote));
        let request: SaveRequest = serde_json::from_value(json!({
            "sessionId": "s-local",
            "whiteboard": {"keySkills": ["SQL"]},
        }))
        .unwrap();
        let Json(saved) = handle_save(State(state), Json(request)).await.unwrap();
        assert!(saved.success);
        assert!(saved.use_local_storage);
    }

    #[tokio::test]
    async fn test_unknown_stage_is_rejected() {
        let state = test_state(Arc::new(ScriptedCompleter::unavailable()));
        let request: SaveRequest =
            serde_json::from_value(json!({"sessionId": "s", "currentStage": "lunch"})).unwrap();
        let result = handle_save(State(state), Json(request)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}

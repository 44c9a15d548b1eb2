//! Axum route handlers for whiteboard extraction and record deletion.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::conversation::models::{normalize_messages, RawMessage};
use crate::errors::AppError;
use crate::stages::Stage;
use crate::state::AppState;
use crate::whiteboard::extractor::extract_whiteboard;
use crate::whiteboard::merge::remove_record;
use crate::whiteboard::models::{Whiteboard, WhiteboardField, WhiteboardPatch};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub messages: Vec<RawMessage>,
    #[serde(default)]
    pub user_stage: Option<String>,
}

/// POST /api/analyze
///
/// Runs the extraction pipeline over a transcript and returns the partial
/// whiteboard. Unparseable model output yields `{}`.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<WhiteboardPatch>, AppError> {
    let stage = Stage::parse_or_first(request.user_stage.as_deref());
    let transcript = normalize_messages(request.messages);
    let patch = extract_whiteboard(
        state.llm.as_ref(),
        &state.models.extraction,
        stage,
        &transcript,
    )
    .await;
    Ok(Json(patch))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRecordRequest {
    pub session_id: String,
    pub field: WhiteboardField,
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRecordResponse {
    pub success: bool,
    pub removed: bool,
    pub whiteboard: Whiteboard,
}

/// POST /api/whiteboard/delete-record
pub async fn handle_delete_record(
    State(state): State<AppState>,
    Json(request): Json<DeleteRecordRequest>,
) -> Result<Json<DeleteRecordResponse>, AppError> {
    if request.session_id.trim().is_empty() {
        return Err(AppError::Validation("sessionId cannot be empty".to_string()));
    }
    let mut removed = false;
    let whiteboard = state
        .persistence
        .update_whiteboard(&request.session_id, |wb| {
            let (next, did_remove) = remove_record(wb, request.field, &request.id);
            removed = did_remove;
            next
        })
        .await;
    Ok(Json(DeleteRecordResponse {
        success: true,
        removed,
        whiteboard,
    }))
}

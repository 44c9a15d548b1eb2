use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::conversation::hints::StructuredHints;
use crate::conversation::models::{normalize_messages, Message, MessageRole, RawMessage};
use crate::conversation::orchestrator::{run_stage_turn, user_facing_error_reply};
use crate::errors::AppError;
use crate::persistence::adapter::SaveKind;
use crate::stages::advance::user_requested_advance;
use crate::stages::Stage;
use crate::state::AppState;
use crate::whiteboard::pipeline::run_extraction_pass;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user_stage: Option<String>,
    #[serde(default)]
    pub all_history: Option<Vec<RawMessage>>,
    #[serde(default)]
    pub history: Option<Vec<RawMessage>>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StageEvaluation {
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub reply: String,
    pub structured: StructuredHints,
    pub should_advance: bool,
    pub next_stage: Option<Stage>,
    pub stage_evaluation: StageEvaluation,
}

/// POST /api/chat
///
/// Model failures come back as a readable `reply` with status 200. With a
/// `sessionId`, the turn is appended to that session's stage transcript and a
/// debounced extraction pass is scheduled.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let text = request.message.trim().to_string();
    if text.is_empty() {
        return Err(AppError::Validation("message cannot be empty".to_string()));
    }
    if let Some(raw) = request.user_stage.as_deref().filter(|s| !Stage::is_valid(s)) {
        warn!("Unknown userStage '{raw}', using {}", Stage::FIRST);
    }
    let stage = Stage::parse_or_first(request.user_stage.as_deref());

    let raw_history = request.all_history.or(request.history).unwrap_or_default();
    let mut transcript = normalize_messages(raw_history);
    let user_message = Message::user(&text);
    let already_sent = transcript
        .last()
        .is_some_and(|m| m.role == MessageRole::User && m.content.trim() == text);
    if !already_sent {
        transcript.push(user_message.clone());
    }

    let turn = run_stage_turn(state.llm.as_ref(), &state.models.chat, stage, &transcript).await;
    let (reply, structured, answered) = match turn {
        Ok(turn) => (turn.reply, turn.structured, true),
        Err(e) => {
            warn!("Chat completion failed in stage {stage}: {e}");
            (user_facing_error_reply(&e), StructuredHints::default(), false)
        }
    };

    let should_advance = user_requested_advance(&text);
    let next_stage = if should_advance { stage.next() } else { None };
    let reason = match (should_advance, next_stage) {
        (true, Some(next)) => format!("用户表示当前阶段已完成，建议进入「{}」", next.display_name()),
        (true, None) => "已经是最后一个阶段".to_string(),
        (false, _) => "继续当前阶段的对话".to_string(),
    };

    if let Some(session_id) = request.session_id.filter(|s| !s.trim().is_empty()) {
        if answered {
            let assistant_message = Message::assistant(&reply);
            transcript.push(assistant_message.clone());
            record_turn(
                &state,
                &session_id,
                request.user_id,
                stage,
                vec![user_message, assistant_message],
            );
            schedule_extraction(&state, session_id, stage, transcript);
        }
    }

    Ok(Json(ChatResponse {
        reply,
        structured,
        should_advance,
        next_stage,
        stage_evaluation: StageEvaluation { reason },
    }))
}

/// Fire-and-forget writes of the turn, the stage marker, and the user id.
fn record_turn(
    state: &AppState,
    session_id: &str,
    user_id: Option<String>,
    stage: Stage,
    messages: Vec<Message>,
) {
    let persistence = Arc::clone(&state.persistence);
    persistence.save(session_id, SaveKind::Stage(stage));
    if let Some(user_id) = user_id.filter(|u| !u.trim().is_empty()) {
        persistence.save(session_id, SaveKind::UserId(user_id));
    }
    let session_id = session_id.to_string();
    tokio::spawn(async move {
        persistence
            .append_messages(&session_id, stage, &messages)
            .await;
    });
}

fn schedule_extraction(state: &AppState, session_id: String, stage: Stage, transcript: Vec<Message>) {
    let job = run_extraction_pass(
        Arc::clone(&state.llm),
        state.models.extraction.clone(),
        Arc::clone(&state.persistence),
        session_id.clone(),
        stage,
        transcript,
    );
    state.extraction.schedule(session_id, async move {
        job.await;
    });
}

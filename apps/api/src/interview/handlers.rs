//! Axum route handlers for interview practice.
//!
//! `/api/interview` is one endpoint multiplexed by `action`; every outcome,
//! including failures the user can act on, is a tagged `{type, payload}` body.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::interview::evaluation::evaluate_answer;
use crate::interview::models::{Evaluation, InterviewRound, Question, QuestionStatus, RoundType};
use crate::interview::questions::{generate_questions, resolve_count};
use crate::interview::round::RoundError;
use crate::interview::scoring::heuristic_evaluation;
use crate::persistence::keys::interview_key;
use crate::state::AppState;
use crate::whiteboard::merge::merge_whiteboard;
use crate::whiteboard::models::{InterviewReport, WhiteboardPatch};

#[derive(Debug, Deserialize)]
#[serde(
    tag = "action",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum InterviewRequest {
    StartRound {
        session_id: String,
        round_type: RoundType,
        /// Manual count (1–10). Absent, or `aiRecommend: true`, lets the server choose.
        #[serde(default)]
        question_count: Option<u32>,
        #[serde(default)]
        ai_recommend: bool,
        /// Free-text background (target role etc.) passed to question generation.
        #[serde(default)]
        context: Option<String>,
    },
    Answer {
        session_id: String,
        answer: String,
    },
    NextQuestion {
        session_id: String,
    },
    FinishRound {
        session_id: String,
    },
}

impl InterviewRequest {
    fn session_id(&self) -> &str {
        match self {
            InterviewRequest::StartRound { session_id, .. }
            | InterviewRequest::Answer { session_id, .. }
            | InterviewRequest::NextQuestion { session_id }
            | InterviewRequest::FinishRound { session_id } => session_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPayload {
    pub question: Question,
    pub question_index: u32,
    pub total_questions: u32,
    pub round_type: RoundType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationPayload {
    pub question_id: String,
    pub evaluation: Evaluation,
    pub current_question_index: u32,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundCompletePayload {
    pub round_completed: bool,
    pub report: InterviewReport,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum InterviewResponse {
    NextQuestion(QuestionPayload),
    Evaluation(EvaluationPayload),
    RoundComplete(RoundCompletePayload),
    Error(ErrorPayload),
}

impl InterviewResponse {
    fn error(message: impl Into<String>) -> Self {
        InterviewResponse::Error(ErrorPayload {
            message: message.into(),
        })
    }

    fn question(round: &InterviewRound) -> Self {
        match round.current_question() {
            Some(question) => InterviewResponse::NextQuestion(QuestionPayload {
                question: question.clone(),
                question_index: round.current_question_index,
                total_questions: round.total_questions,
                round_type: round.round_type,
            }),
            None => InterviewResponse::error(RoundError::NoQuestions.to_string()),
        }
    }
}

impl From<RoundError> for InterviewResponse {
    fn from(e: RoundError) -> Self {
        InterviewResponse::error(e.to_string())
    }
}

/// POST /api/interview
pub async fn handle_interview(
    State(state): State<AppState>,
    Json(request): Json<InterviewRequest>,
) -> Result<Json<InterviewResponse>, AppError> {
    let session_id = request.session_id().trim().to_string();
    if session_id.is_empty() {
        return Err(AppError::Validation("sessionId cannot be empty".to_string()));
    }

    let response = match request {
        InterviewRequest::StartRound {
            round_type,
            question_count,
            ai_recommend,
            context,
            ..
        } => {
            let requested = if ai_recommend { None } else { question_count };
            start_round(&state, &session_id, round_type, requested, context.as_deref()).await?
        }
        InterviewRequest::Answer { answer, .. } => answer_question(&state, &session_id, &answer).await?,
        InterviewRequest::NextQuestion { .. } => next_question(&state, &session_id).await?,
        InterviewRequest::FinishRound { .. } => finish_round(&state, &session_id).await?,
    };
    Ok(Json(response))
}

async fn start_round(
    state: &AppState,
    session_id: &str,
    round_type: RoundType,
    requested: Option<u32>,
    context: Option<&str>,
) -> Result<InterviewResponse, AppError> {
    let count = resolve_count(round_type, requested);
    let questions = generate_questions(
        state.llm.as_ref(),
        &state.models.chat,
        round_type,
        count,
        context,
    )
    .await;
    let round = match InterviewRound::start(round_type, questions) {
        Ok(round) => round,
        Err(e) => return Ok(e.into()),
    };
    save_round(state, session_id, &round).await?;
    info!(
        "Started {} round with {count} questions for session {session_id}",
        round_type.label()
    );
    Ok(InterviewResponse::question(&round))
}

async fn answer_question(
    state: &AppState,
    session_id: &str,
    answer: &str,
) -> Result<InterviewResponse, AppError> {
    let Some(mut round) = load_round(state, session_id).await? else {
        return Ok(no_active_round());
    };
    let question = match round.submit_answer(answer) {
        Ok(question) => question.clone(),
        Err(e) => return Ok(e.into()),
    };
    let evaluation = evaluate_answer(
        state.llm.as_ref(),
        &state.models.extraction,
        round.round_type,
        &question,
        answer.trim(),
    )
    .await;
    if let Err(e) = round.record_evaluation(evaluation.clone()) {
        return Ok(e.into());
    }
    save_round(state, session_id, &round).await?;

    Ok(InterviewResponse::Evaluation(EvaluationPayload {
        question_id: question.id,
        evaluation,
        current_question_index: round.current_question_index,
        has_more: round.has_more(),
    }))
}

/// Advances, or finalizes when the evaluated question was the last one.
async fn next_question(state: &AppState, session_id: &str) -> Result<InterviewResponse, AppError> {
    let Some(mut round) = load_round(state, session_id).await? else {
        return Ok(no_active_round());
    };
    if !round.has_more() {
        // The last question must be evaluated before "next" can close the round.
        if round.current_question().map(|q| q.status) != Some(QuestionStatus::Evaluated) {
            return Ok(RoundError::NotEvaluated.into());
        }
        return complete_round(state, session_id, round).await;
    }
    if let Err(e) = round.advance() {
        return Ok(e.into());
    }
    save_round(state, session_id, &round).await?;
    Ok(InterviewResponse::question(&round))
}

async fn finish_round(state: &AppState, session_id: &str) -> Result<InterviewResponse, AppError> {
    let Some(round) = load_round(state, session_id).await? else {
        return Ok(no_active_round());
    };
    complete_round(state, session_id, round).await
}

/// Finalizes the round, merges the report into the whiteboard, and drops the
/// round so the client returns to setup.
async fn complete_round(
    state: &AppState,
    session_id: &str,
    mut round: InterviewRound,
) -> Result<InterviewResponse, AppError> {
    let now = Utc::now();
    let report = match round.finalize(now.timestamp_millis(), &now.to_rfc3339()) {
        Ok(report) => report,
        Err(e) => return Ok(e.into()),
    };

    let patch = WhiteboardPatch {
        interview_reports: Some(vec![report.clone()]),
        ..Default::default()
    };
    state
        .persistence
        .update_whiteboard(session_id, |wb| merge_whiteboard(wb, &patch))
        .await;
    state
        .sessions
        .delete(&interview_key(session_id))
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;
    info!(
        "Completed {} round for session {session_id} with score {}",
        report.round, report.overall_score
    );

    Ok(InterviewResponse::RoundComplete(RoundCompletePayload {
        round_completed: true,
        report,
    }))
}

fn no_active_round() -> InterviewResponse {
    InterviewResponse::error("没有进行中的面试轮次，请先开始一轮面试")
}

async fn load_round(state: &AppState, session_id: &str) -> Result<Option<InterviewRound>, AppError> {
    let value = state
        .sessions
        .get(&interview_key(session_id))
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;
    Ok(value.and_then(|v| match serde_json::from_value(v) {
        Ok(round) => Some(round),
        Err(e) => {
            warn!("Stored interview round for {session_id} is unreadable: {e}");
            None
        }
    }))
}

async fn save_round(state: &AppState, session_id: &str, round: &InterviewRound) -> Result<(), AppError> {
    let value = serde_json::to_value(round).map_err(|e| AppError::Internal(e.into()))?;
    state
        .sessions
        .set(&interview_key(session_id), value)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct AssessRequest {
    #[serde(default)]
    pub round: Option<RoundType>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<RoundType>,
    #[serde(flatten)]
    pub evaluation: Evaluation,
}

/// POST /api/interview/assess
///
/// Stateless heuristic scoring, independent of any round.
pub async fn handle_assess(Json(request): Json<AssessRequest>) -> Json<AssessResponse> {
    Json(AssessResponse {
        round: request.round,
        evaluation: heuristic_evaluation(&request.question, &request.answer),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::{json, Value};

    use crate::test_support::{test_state, ScriptedCompleter};

    async fn call(state: &AppState, body: Value) -> Value {
        let request: InterviewRequest = serde_json::from_value(body).unwrap();
        let Json(response) = handle_interview(State(state.clone()), Json(request))
            .await
            .unwrap();
        serde_json::to_value(response).unwrap()
    }

    #[tokio::test]
    async fn test_two_question_technical_round() {
        let state = test_state(Arc::new(ScriptedCompleter::unavailable()));
        let sid = "interview-s1";

        let started = call(
            &state,
            json!({"action": "start_round", "sessionId": sid, "roundType": "技术面", "questionCount": 2}),
        )
        .await;
        assert_eq!(started["type"], "next-question");
        assert_eq!(started["payload"]["questionIndex"], 0);
        assert_eq!(started["payload"]["totalQuestions"], 2);
        assert_eq!(started["payload"]["roundType"], "技术面");

        let evaluated = call(
            &state,
            json!({"action": "answer", "sessionId": sid, "answer": "首先我做了技术选型"}),
        )
        .await;
        assert_eq!(evaluated["type"], "evaluation");
        assert_eq!(evaluated["payload"]["hasMore"], true);
        assert_eq!(evaluated["payload"]["evaluation"]["source"], "heuristic");

        let second = call(&state, json!({"action": "next_question", "sessionId": sid})).await;
        assert_eq!(second["type"], "next-question");
        assert_eq!(second["payload"]["questionIndex"], 1);

        let evaluated = call(
            &state,
            json!({"action": "answer", "sessionId": sid, "answer": "我会先定位问题再修复"}),
        )
        .await;
        assert_eq!(evaluated["payload"]["hasMore"], false);

        let done = call(&state, json!({"action": "next_question", "sessionId": sid})).await;
        assert_eq!(done["type"], "round-complete");
        assert_eq!(done["payload"]["roundCompleted"], true);
        assert_eq!(done["payload"]["report"]["questions"].as_array().unwrap().len(), 2);
        assert_eq!(done["payload"]["report"]["round"], "技术面");

        let whiteboard = state.persistence.load_whiteboard(sid).await;
        assert_eq!(whiteboard.interview_reports.len(), 1);

        // The round is gone; the client is back in setup.
        let after = call(&state, json!({"action": "next_question", "sessionId": sid})).await;
        assert_eq!(after["type"], "error");
    }

    #[tokio::test]
    async fn test_ai_recommended_count() {
        let state = test_state(Arc::new(ScriptedCompleter::unavailable()));
        let started = call(
            &state,
            json!({"action": "start_round", "sessionId": "s", "roundType": "HR面", "questionCount": 8, "aiRecommend": true}),
        )
        .await;
        assert_eq!(started["payload"]["totalQuestions"], 3);
    }

    #[tokio::test]
    async fn test_answer_without_round_is_tagged_error() {
        let state = test_state(Arc::new(ScriptedCompleter::unavailable()));
        let response = call(
            &state,
            json!({"action": "answer", "sessionId": "nobody", "answer": "hi"}),
        )
        .await;
        assert_eq!(response["type"], "error");
        assert!(response["payload"]["message"].is_string());
    }

    #[tokio::test]
    async fn test_next_before_evaluation_is_tagged_error() {
        let state = test_state(Arc::new(ScriptedCompleter::unavailable()));
        call(
            &state,
            json!({"action": "start_round", "sessionId": "s2", "roundType": "行为面", "questionCount": 2}),
        )
        .await;
        let response = call(&state, json!({"action": "next_question", "sessionId": "s2"})).await;
        assert_eq!(response["type"], "error");
    }

    #[tokio::test]
    async fn test_next_on_unanswered_last_question_keeps_round_open() {
        let state = test_state(Arc::new(ScriptedCompleter::unavailable()));
        let sid = "s-last";
        call(
            &state,
            json!({"action": "start_round", "sessionId": sid, "roundType": "技术面", "questionCount": 2}),
        )
        .await;
        call(
            &state,
            json!({"action": "answer", "sessionId": sid, "answer": "首先我做了技术选型"}),
        )
        .await;
        let second = call(&state, json!({"action": "next_question", "sessionId": sid})).await;
        assert_eq!(second["payload"]["questionIndex"], 1);

        let premature = call(&state, json!({"action": "next_question", "sessionId": sid})).await;
        assert_eq!(premature["type"], "error");
        assert!(state.persistence.load_whiteboard(sid).await.interview_reports.is_empty());

        call(
            &state,
            json!({"action": "answer", "sessionId": sid, "answer": "我会先定位问题再修复"}),
        )
        .await;
        let done = call(&state, json!({"action": "next_question", "sessionId": sid})).await;
        assert_eq!(done["type"], "round-complete");
        assert_eq!(done["payload"]["report"]["questionCount"], 2);
    }

    #[tokio::test]
    async fn test_finish_round_early() {
        let state = test_state(Arc::new(ScriptedCompleter::unavailable()));
        call(
            &state,
            json!({"action": "start_round", "sessionId": "s3", "roundType": "终面"}),
        )
        .await;
        call(
            &state,
            json!({"action": "answer", "sessionId": "s3", "answer": "前三个月先熟悉业务"}),
        )
        .await;
        let done = call(&state, json!({"action": "finish_round", "sessionId": "s3"})).await;
        assert_eq!(done["type"], "round-complete");
        assert_eq!(done["payload"]["report"]["questionCount"], 1);
    }

    #[tokio::test]
    async fn test_assess_is_heuristic() {
        let Json(response) = handle_assess(Json(AssessRequest {
            round: Some(RoundType::Business),
            question: "介绍一个你负责的项目".into(),
            answer: String::new(),
        }))
        .await;
        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["round"], "业务面");
        assert_eq!(json["score"], 61);
        assert_eq!(json["accuracy"], 60);
    }
}

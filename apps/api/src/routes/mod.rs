pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::conversation::handlers as conversation;
use crate::documents::{handlers as documents, MAX_UPLOAD_BYTES};
use crate::errors::AppError;
use crate::interview::handlers as interview;
use crate::otp::handlers as otp;
use crate::persistence::handlers as persistence;
use crate::state::AppState;
use crate::whiteboard::handlers as whiteboard;

async fn not_found() -> AppError {
    AppError::NotFound("No such endpoint".to_string())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/stages", get(health::stages_handler))
        // Conversation and whiteboard
        .route("/api/chat", post(conversation::handle_chat))
        .route("/api/analyze", post(whiteboard::handle_analyze))
        .route(
            "/api/whiteboard/delete-record",
            post(whiteboard::handle_delete_record),
        )
        // Interview practice
        .route("/api/interview", post(interview::handle_interview))
        .route("/api/interview/assess", post(interview::handle_assess))
        // Session persistence
        .route("/api/save-whiteboard", post(persistence::handle_save))
        .route("/api/load-session", post(persistence::handle_load_session))
        // Login codes
        .route("/api/sms", post(otp::handle_send_code))
        .route("/api/verify", post(otp::handle_verify_code))
        // Uploads
        .route(
            "/api/parse-resume",
            post(documents::handle_parse_resume).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/parse-files",
            post(documents::handle_parse_files).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .fallback(not_found)
        .with_state(state)
}

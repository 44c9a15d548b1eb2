use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::stages::{catalogue, StageInfo};
use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and which
/// collaborators are configured.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "coach-api",
        "llmConfigured": state.config.llm_api_key.is_some(),
        "remoteStore": state.config.database_url.is_some(),
    }))
}

/// GET /api/stages
pub async fn stages_handler() -> Json<Vec<StageInfo>> {
    Json(catalogue())
}

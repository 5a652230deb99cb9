use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::Intent;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ProcessTextRequest {
    pub text: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Serialize)]
pub struct ProcessTextResponse {
    session_id: String,
    user_text: String,
    response_text: String,
    intent: Intent,
    goal_achieved: bool,
}

// POST /api/process-text
pub async fn process_text(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProcessTextRequest>,
) -> Result<Json<ProcessTextResponse>, AppError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("text must not be empty".to_string()));
    }

    let session_id = req
        .session_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::info!(session = %session_id, chars = text.len(), "process-text request");
    let outcome = state.orchestrator.process_detailed(text, &session_id).await;

    Ok(Json(ProcessTextResponse {
        session_id,
        user_text: text.to_string(),
        response_text: outcome.response,
        intent: outcome.intent,
        goal_achieved: outcome.goal_achieved,
    }))
}

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::models::Turn;
use crate::state::AppState;

#[derive(Serialize)]
pub struct SessionResponse {
    session_id: String,
    /// Completed exchanges, each one user and one assistant turn.
    turns: usize,
    history: Vec<Turn>,
}

#[derive(Serialize)]
pub struct ClearResponse {
    session_id: String,
    cleared: bool,
}

// GET /api/session/:id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<SessionResponse> {
    let history = state.orchestrator.history(&session_id).await;
    Json(SessionResponse {
        session_id,
        turns: history.len() / 2,
        history,
    })
}

// DELETE /api/session/:id
pub async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<ClearResponse> {
    let cleared = state.orchestrator.clear(&session_id).await;
    tracing::info!(session = %session_id, cleared, "session cleared");
    Json(ClearResponse {
        session_id,
        cleared,
    })
}

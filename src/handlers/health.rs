use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    env: String,
    calendar_backend: &'static str,
    llm_provider: String,
    version: &'static str,
}

// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        env: state.config.app_env.clone(),
        calendar_backend: state.engine.backend_name(),
        llm_provider: state.orchestrator.provider_name().to_string(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

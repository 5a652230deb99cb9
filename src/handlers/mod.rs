pub mod appointments;
pub mod health;
pub mod patients;
pub mod process;
pub mod session;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/process-text", post(process::process_text))
        .route(
            "/api/session/:id",
            get(session::get_session).delete(session::clear_session),
        )
        .route("/api/appointments", get(appointments::list_appointments))
        .route("/api/appointments/:id", get(appointments::get_appointment))
        .route(
            "/api/patients",
            get(patients::search_patients).post(patients::register_patient),
        )
        .route("/api/patients/:id", get(patients::get_patient))
        .with_state(state)
}

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::Appointment;
use crate::services::scheduling::{resolve_window, ListFilter};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AppointmentsQuery {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub patient_name: Option<String>,
    pub provider: Option<String>,
}

#[derive(Serialize)]
pub struct AppointmentsResponse {
    count: usize,
    appointments: Vec<Appointment>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// GET /api/appointments
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AppointmentsQuery>,
) -> Result<Json<AppointmentsResponse>, AppError> {
    let date_from = present(params.date_from);
    let date_to = present(params.date_to);
    let today = chrono::Local::now().date_naive();
    let (from, to) = resolve_window(date_from.as_deref(), date_to.as_deref(), today)?;

    let filter = ListFilter {
        patient_name: present(params.patient_name),
        provider: present(params.provider),
    };
    let appointments = state.engine.list_appointments(from, to, &filter).await?;

    Ok(Json(AppointmentsResponse {
        count: appointments.len(),
        appointments,
    }))
}

// GET /api/appointments/:id
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(state.engine.get_appointment(&id).await?))
}

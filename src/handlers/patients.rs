use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::Patient;
use crate::services::directory::{NewPatient, PatientDirectory};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PatientSearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub struct PatientsResponse {
    count: usize,
    patients: Vec<Patient>,
}

// GET /api/patients?q=
pub async fn search_patients(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PatientSearchQuery>,
) -> Result<Json<PatientsResponse>, AppError> {
    let patients = state
        .directory
        .search(params.q.trim())
        .map_err(|e| AppError::Directory(format!("{e:#}")))?;

    Ok(Json(PatientsResponse {
        count: patients.len(),
        patients,
    }))
}

// GET /api/patients/:id
pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<String>,
) -> Result<Json<Patient>, AppError> {
    state
        .directory
        .get(&patient_id)
        .map_err(|e| AppError::Directory(format!("{e:#}")))?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("patient {patient_id}")))
}

// POST /api/patients
pub async fn register_patient(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewPatient>,
) -> Result<(StatusCode, Json<Patient>), AppError> {
    if new.first_name.trim().is_empty() || new.last_name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "first_name and last_name are required".to_string(),
        ));
    }

    let patient = state
        .directory
        .register(new)
        .map_err(|e| AppError::Directory(format!("{e:#}")))?;
    Ok((StatusCode::CREATED, Json(patient)))
}

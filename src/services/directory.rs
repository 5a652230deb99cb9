use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::Deserialize;

use crate::db::queries;
use crate::models::Patient;

pub const MAX_MATCHES: i64 = 5;

/// Read access to patient identity records.
pub trait PatientDirectory: Send + Sync {
    /// Up to five matches, in directory order.
    fn search(&self, query: &str) -> anyhow::Result<Vec<Patient>>;

    fn get(&self, patient_id: &str) -> anyhow::Result<Option<Patient>>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub dob: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub insurance: String,
    #[serde(default)]
    pub provider: String,
}

pub struct SqlitePatientDirectory {
    db: Arc<Mutex<Connection>>,
}

impl SqlitePatientDirectory {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    pub fn register(&self, new: NewPatient) -> anyhow::Result<Patient> {
        let patient = Patient {
            patient_id: generate_patient_id(),
            first_name: new.first_name.trim().to_string(),
            last_name: new.last_name.trim().to_string(),
            dob: new.dob,
            phone: new.phone,
            email: new.email,
            insurance: new.insurance,
            provider: new.provider,
        };
        anyhow::ensure!(
            !patient.first_name.is_empty() && !patient.last_name.is_empty(),
            "first_name and last_name are required"
        );

        {
            let db = self.lock()?;
            queries::insert_patient(&db, &patient)?;
        }

        tracing::info!(
            patient_id = %patient.patient_id,
            name = %patient.full_name(),
            "registered new patient"
        );
        Ok(patient)
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| anyhow::anyhow!("patient directory lock poisoned"))
    }
}

impl PatientDirectory for SqlitePatientDirectory {
    fn search(&self, query: &str) -> anyhow::Result<Vec<Patient>> {
        let results = {
            let db = self.lock()?;
            queries::search_patients(&db, query, MAX_MATCHES)?
        };
        tracing::info!(query, matches = results.len(), "patient search");
        Ok(results)
    }

    fn get(&self, patient_id: &str) -> anyhow::Result<Option<Patient>> {
        let db = self.lock()?;
        queries::get_patient_by_id(&db, patient_id)
    }
}

fn generate_patient_id() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    format!("P{}", raw[..6].to_uppercase())
}

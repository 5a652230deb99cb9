use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tokio::sync::RwLock;

use super::{normalize_id, AppointmentChange, AppointmentQuery, AppointmentStore};
use crate::errors::SchedulingError;
use crate::models::{Appointment, AppointmentStatus};

/// Process-lifetime appointment map. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    appointments: RwLock<HashMap<String, Appointment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Demo store with three appointments over the two days after `today`.
    pub fn seeded(today: NaiveDate) -> Self {
        let at = |days: i64, h: u32, m: u32| {
            NaiveDateTime::new(
                today + Duration::days(days),
                NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN),
            )
        };
        let samples = [
            ("APT001", "P1A2B3", "Alice Johnson", "Dr. Smith", at(1, 10, 0), 30, "Annual checkup"),
            ("APT002", "P4C5D6", "Bob Williams", "Dr. Patel", at(1, 14, 0), 45, "Follow-up consultation"),
            ("APT003", "P7E8F9", "Carol Davis", "Dr. Smith", at(2, 9, 30), 30, "Blood pressure review"),
        ];

        let map = samples
            .into_iter()
            .map(|(id, patient_id, patient_name, provider, start, duration, reason)| {
                let appt = Appointment {
                    id: id.to_string(),
                    patient_id: patient_id.to_string(),
                    patient_name: patient_name.to_string(),
                    provider: provider.to_string(),
                    start,
                    duration_minutes: duration,
                    reason: reason.to_string(),
                    status: AppointmentStatus::Scheduled,
                };
                (normalize_id(id), appt)
            })
            .collect();

        Self {
            appointments: RwLock::new(map),
        }
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "in-memory"
    }

    async fn create(&self, appt: Appointment) -> Result<Appointment, SchedulingError> {
        let key = normalize_id(&appt.id);
        let mut map = self.appointments.write().await;
        if map.contains_key(&key) {
            return Err(SchedulingError::DuplicateId(appt.id));
        }
        map.insert(key, appt.clone());
        Ok(appt)
    }

    async fn get(&self, id: &str) -> Result<Appointment, SchedulingError> {
        self.appointments
            .read()
            .await
            .get(&normalize_id(id))
            .cloned()
            .ok_or_else(|| SchedulingError::NotFound(id.to_string()))
    }

    async fn list(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>, SchedulingError> {
        Ok(self
            .appointments
            .read()
            .await
            .values()
            .filter(|a| query.matches(a))
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        id: &str,
        change: AppointmentChange,
    ) -> Result<Appointment, SchedulingError> {
        let mut map = self.appointments.write().await;
        let appt = map
            .get_mut(&normalize_id(id))
            .ok_or_else(|| SchedulingError::NotFound(id.to_string()))?;
        change.apply(appt);
        Ok(appt.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
    }

    #[tokio::test]
    async fn test_seeded_lookup_is_case_insensitive() {
        let store = MemoryStore::seeded(today());
        let appt = store.get("apt002").await.unwrap();
        assert_eq!(appt.patient_name, "Bob Williams");
        assert_eq!(appt.duration_minutes, 45);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() {
        let store = MemoryStore::seeded(today());
        let mut appt = store.get("APT001").await.unwrap();
        appt.id = "apt001".to_string();
        let err = store.create(appt).await.unwrap_err();
        assert!(matches!(err, SchedulingError::DuplicateId(_)));
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let store = MemoryStore::seeded(today());
        let err = store
            .update("APT999", AppointmentChange::Cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound(_)));
        assert_eq!(store.list(&AppointmentQuery::default()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_list_filters_by_provider_and_window() {
        let store = MemoryStore::seeded(today());
        let day = today() + Duration::days(1);
        let query = AppointmentQuery {
            provider: Some("smith".to_string()),
            window: Some((
                day.and_hms_opt(0, 0, 0).unwrap(),
                day.and_hms_opt(23, 59, 0).unwrap(),
            )),
        };
        let results = store.list(&query).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "APT001");
    }
}

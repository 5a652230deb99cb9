pub mod google_calendar;
pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::errors::SchedulingError;
use crate::models::Appointment;

pub use google_calendar::GoogleCalendarStore;
pub use memory::MemoryStore;

/// Narrowing applied by the backend. Status and name filtering are left to the
/// scheduling engine.
#[derive(Debug, Clone, Default)]
pub struct AppointmentQuery {
    pub provider: Option<String>,
    /// Inclusive on both ends.
    pub window: Option<(NaiveDateTime, NaiveDateTime)>,
}

impl AppointmentQuery {
    pub fn matches(&self, appt: &Appointment) -> bool {
        if let Some((from, to)) = self.window {
            if appt.start < from || appt.start > to {
                return false;
            }
        }
        match &self.provider {
            Some(p) => contains_ignore_case(&appt.provider, p),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppointmentChange {
    Cancel,
    Reschedule(NaiveDateTime),
}

impl AppointmentChange {
    pub fn apply(self, appt: &mut Appointment) {
        match self {
            AppointmentChange::Cancel => appt.status = crate::models::AppointmentStatus::Cancelled,
            AppointmentChange::Reschedule(start) => appt.start = start,
        }
    }
}

/// The appointment ledger. Ids are compared case-insensitively.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Fails with `DuplicateId` if the id is already taken.
    async fn create(&self, appt: Appointment) -> Result<Appointment, SchedulingError>;

    async fn get(&self, id: &str) -> Result<Appointment, SchedulingError>;

    async fn list(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>, SchedulingError>;

    /// Applies the change atomically and returns the updated record.
    async fn update(
        &self,
        id: &str,
        change: AppointmentChange,
    ) -> Result<Appointment, SchedulingError>;
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub fn normalize_id(id: &str) -> String {
    id.trim().to_uppercase()
}

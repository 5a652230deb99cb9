use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::errors::SchedulingError;
use crate::models::{parse_date, parse_datetime, Appointment, AppointmentStatus, Slot};
use crate::store::{
    contains_ignore_case, AppointmentChange, AppointmentQuery, AppointmentStore,
};

pub const DEFAULT_DURATION_MINUTES: u32 = 30;
pub const SLOT_STRIDE_MINUTES: i64 = 30;
const WORKDAY_START_HOUR: u32 = 8;
const WORKDAY_END_HOUR: u32 = 17;
const ID_ATTEMPTS: usize = 8;
const DEFAULT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub patient_id: String,
    pub patient_name: String,
    pub provider: String,
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub patient_name: Option<String>,
    pub provider: Option<String>,
}

/// Domain operations over an appointment store. All mutation goes through the
/// store; conflict checking is advisory (`check_availability`) and never
/// enforced at booking time.
#[derive(Clone)]
pub struct SchedulingEngine {
    store: Arc<dyn AppointmentStore>,
}

impl SchedulingEngine {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Active appointments starting within `[from, to]`, oldest first.
    pub async fn list_appointments(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
        filter: &ListFilter,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let query = AppointmentQuery {
            provider: filter.provider.clone(),
            window: Some((from, to)),
        };

        let mut results: Vec<Appointment> = self
            .store
            .list(&query)
            .await?
            .into_iter()
            .filter(|a| a.is_active() && query.matches(a))
            .filter(|a| match &filter.patient_name {
                Some(name) => contains_ignore_case(&a.patient_name, name),
                None => true,
            })
            .collect();

        results.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        tracing::info!(%from, %to, count = results.len(), "list_appointments");
        Ok(results)
    }

    /// Open start times for `provider` on `date` between 08:00 and 17:00.
    ///
    /// Candidates are spaced 30 minutes apart and must finish by 17:00. A
    /// candidate is rejected when it starts less than `duration_minutes` away
    /// from any booked start, regardless of that booking's own length.
    pub async fn check_availability(
        &self,
        date: NaiveDate,
        provider: &str,
        duration_minutes: u32,
    ) -> Result<Vec<Slot>, SchedulingError> {
        let day_start = date.and_time(NaiveTime::MIN);
        let day_end = day_start + Duration::minutes(23 * 60 + 59);
        let booked: Vec<NaiveDateTime> = self
            .list_appointments(
                day_start,
                day_end,
                &ListFilter {
                    patient_name: None,
                    provider: Some(provider.to_string()),
                },
            )
            .await?
            .into_iter()
            .map(|a| a.start)
            .collect();

        let slots = open_slots(date, duration_minutes, &booked);
        tracing::info!(%date, provider, count = slots.len(), "check_availability");
        Ok(slots)
    }

    pub async fn book_appointment(&self, new: NewAppointment) -> Result<Appointment, SchedulingError> {
        let mut last_err = None;
        for _ in 0..ID_ATTEMPTS {
            let appt = Appointment {
                id: generate_appointment_id(),
                patient_id: new.patient_id.clone(),
                patient_name: new.patient_name.clone(),
                provider: new.provider.clone(),
                start: new.start,
                duration_minutes: new.duration_minutes,
                reason: new.reason.clone(),
                status: AppointmentStatus::Scheduled,
            };

            match self.store.create(appt).await {
                Ok(created) => {
                    tracing::info!(
                        appointment_id = %created.id,
                        patient = %created.patient_name,
                        provider = %created.provider,
                        start = %created.start,
                        "appointment booked"
                    );
                    return Ok(created);
                }
                Err(SchedulingError::DuplicateId(id)) => {
                    tracing::warn!(appointment_id = %id, "generated appointment id collided, retrying");
                    last_err = Some(SchedulingError::DuplicateId(id));
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| SchedulingError::Backend("could not allocate appointment id".to_string())))
    }

    pub async fn cancel_appointment(&self, id: &str) -> Result<Appointment, SchedulingError> {
        let appt = self.store.update(id, AppointmentChange::Cancel).await?;
        tracing::info!(appointment_id = %appt.id, "appointment cancelled");
        Ok(appt)
    }

    pub async fn reschedule_appointment(
        &self,
        id: &str,
        new_start: NaiveDateTime,
    ) -> Result<Appointment, SchedulingError> {
        let appt = self
            .store
            .update(id, AppointmentChange::Reschedule(new_start))
            .await?;
        tracing::info!(appointment_id = %appt.id, start = %appt.start, "appointment rescheduled");
        Ok(appt)
    }

    pub async fn get_appointment(&self, id: &str) -> Result<Appointment, SchedulingError> {
        self.store.get(id).await
    }
}

/// Resolves a listing window from optional user-supplied bounds. `from`
/// defaults to the start of `today` and `to` to seven days after `from`. A bare
/// date is read as 00:00 for `from` and 23:59 for `to`.
pub fn resolve_window(
    date_from: Option<&str>,
    date_to: Option<&str>,
    today: NaiveDate,
) -> Result<(NaiveDateTime, NaiveDateTime), SchedulingError> {
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN);
    let from = match date_from {
        Some(raw) => datetime_or_date("date_from", raw, NaiveTime::MIN)?,
        None => today.and_time(NaiveTime::MIN),
    };
    let to = match date_to {
        Some(raw) => datetime_or_date("date_to", raw, end_of_day)?,
        None => from + Duration::days(DEFAULT_WINDOW_DAYS),
    };
    Ok((from, to))
}

fn datetime_or_date(field: &str, raw: &str, fallback_time: NaiveTime) -> Result<NaiveDateTime, SchedulingError> {
    parse_datetime(raw)
        .or_else(|| parse_date(raw).map(|d| d.and_time(fallback_time)))
        .ok_or_else(|| {
            SchedulingError::InvalidInput(format!(
                "{field} must be YYYY-MM-DD or YYYY-MM-DDTHH:MM, got '{raw}'"
            ))
        })
}

fn open_slots(date: NaiveDate, duration_minutes: u32, booked: &[NaiveDateTime]) -> Vec<Slot> {
    let window_start = date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(WORKDAY_START_HOUR));
    let window_end = date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(WORKDAY_END_HOUR));
    let duration = Duration::minutes(i64::from(duration_minutes));
    let radius = duration.num_seconds();

    let mut slots = vec![];
    let mut current = window_start;
    while current + duration <= window_end {
        let conflict = booked
            .iter()
            .any(|b| (current - *b).num_seconds().abs() < radius);
        if !conflict {
            slots.push(Slot(current));
        }
        current += Duration::minutes(SLOT_STRIDE_MINUTES);
    }
    slots
}

fn generate_appointment_id() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    format!("APT{}", raw[..6].to_uppercase())
}

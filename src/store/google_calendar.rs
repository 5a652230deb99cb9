use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime};
use serde_json::{json, Value};

use super::{normalize_id, AppointmentChange, AppointmentQuery, AppointmentStore};
use crate::errors::SchedulingError;
use crate::models::{parse_datetime, Appointment, AppointmentStatus};

const API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const PAGE_SIZE: &str = "2500";

/// Appointments stored as Google Calendar events. The appointment fields ride
/// in the event's private extended properties.
pub struct GoogleCalendarStore {
    api_base: String,
    calendar_id: String,
    access_token: String,
    time_zone: String,
    client: reqwest::Client,
}

impl GoogleCalendarStore {
    pub fn new(calendar_id: String, access_token: String, time_zone: String) -> Self {
        Self {
            api_base: API_BASE.to_string(),
            calendar_id,
            access_token,
            time_zone,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.api_base, self.calendar_id)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, SchedulingError> {
        let resp = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| SchedulingError::Backend(format!("failed to call Google Calendar: {e}")))?;

        let status = resp.status();
        let data: Value = resp
            .json()
            .await
            .map_err(|e| SchedulingError::Backend(format!("failed to parse Google Calendar response: {e}")))?;

        if !status.is_success() {
            return Err(SchedulingError::Backend(format!(
                "Google Calendar API error ({status}): {data}"
            )));
        }
        Ok(data)
    }

    async fn find_event(&self, id: &str) -> Result<Value, SchedulingError> {
        let filter = format!("appointment_id={}", normalize_id(id));
        let data = self
            .send(self.client.get(self.events_url()).query(&[
                ("privateExtendedProperty", filter.as_str()),
                ("showDeleted", "true"),
                ("timeZone", self.time_zone.as_str()),
            ]))
            .await?;

        data["items"]
            .as_array()
            .and_then(|items| items.first())
            .cloned()
            .ok_or_else(|| SchedulingError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl AppointmentStore for GoogleCalendarStore {
    fn backend_name(&self) -> &'static str {
        "google-calendar"
    }

    async fn create(&self, appt: Appointment) -> Result<Appointment, SchedulingError> {
        match self.find_event(&appt.id).await {
            Ok(_) => return Err(SchedulingError::DuplicateId(appt.id)),
            Err(SchedulingError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let body = appointment_to_event(&appt, &self.time_zone);
        let event = self
            .send(self.client.post(self.events_url()).json(&body))
            .await?;
        tracing::debug!(event_id = %event["id"], appointment_id = %appt.id, "created calendar event");
        Ok(appt)
    }

    async fn get(&self, id: &str) -> Result<Appointment, SchedulingError> {
        let event = self.find_event(id).await?;
        event_to_appointment(&event)
    }

    async fn list(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>, SchedulingError> {
        let mut params: Vec<(&str, String)> = vec![
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
            ("maxResults", PAGE_SIZE.to_string()),
            ("timeZone", self.time_zone.clone()),
        ];
        // Google reads the bounds as instants and timeMax is exclusive. Pad a
        // day on each side; `query.matches` makes the inclusive cut in local time.
        if let Some((from, to)) = query.window {
            params.push(("timeMin", utc_bound(from - Duration::days(1))));
            params.push(("timeMax", utc_bound(to + Duration::days(1))));
        }

        let mut appointments = vec![];
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.client.get(self.events_url()).query(&params);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let data = self.send(request).await?;

            for event in data["items"].as_array().into_iter().flatten() {
                if event["extendedProperties"]["private"]["appointment_id"].is_null() {
                    continue;
                }
                let appt = event_to_appointment(event)?;
                if query.matches(&appt) {
                    appointments.push(appt);
                }
            }

            match data["nextPageToken"].as_str() {
                Some(token) => page_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(appointments)
    }

    async fn update(
        &self,
        id: &str,
        change: AppointmentChange,
    ) -> Result<Appointment, SchedulingError> {
        let event = self.find_event(id).await?;
        let event_id = event["id"]
            .as_str()
            .ok_or_else(|| SchedulingError::Backend("calendar event without id".to_string()))?
            .to_string();

        let mut appt = event_to_appointment(&event)?;
        change.apply(&mut appt);

        let patch = match change {
            AppointmentChange::Cancel => json!({
                "status": "cancelled",
                "extendedProperties": { "private": { "status": appt.status.as_str() } },
            }),
            AppointmentChange::Reschedule(_) => {
                let (start, end) = event_times(&appt, &self.time_zone);
                json!({ "start": start, "end": end })
            }
        };

        let url = format!("{}/{event_id}", self.events_url());
        let updated = self.send(self.client.patch(url).json(&patch)).await?;
        tracing::debug!(event_id = %event_id, appointment_id = %appt.id, "patched calendar event");

        let mut result = event_to_appointment(&updated)?;
        // Google reports cancelled events without their private properties on some calendars.
        result.status = appt.status;
        Ok(result)
    }
}

fn utc_bound(t: NaiveDateTime) -> String {
    format!("{}Z", t.format("%Y-%m-%dT%H:%M:%S"))
}

fn event_times(appt: &Appointment, time_zone: &str) -> (Value, Value) {
    let end = appt.start + Duration::minutes(i64::from(appt.duration_minutes));
    (
        json!({ "dateTime": appt.start.format("%Y-%m-%dT%H:%M:%S").to_string(), "timeZone": time_zone }),
        json!({ "dateTime": end.format("%Y-%m-%dT%H:%M:%S").to_string(), "timeZone": time_zone }),
    )
}

pub(crate) fn appointment_to_event(appt: &Appointment, time_zone: &str) -> Value {
    let (start, end) = event_times(appt, time_zone);
    json!({
        "summary": format!("{} - {}", appt.patient_name, appt.reason),
        "description": format!(
            "Patient ID: {}\nProvider: {}\nReason: {}",
            appt.patient_id, appt.provider, appt.reason
        ),
        "start": start,
        "end": end,
        "extendedProperties": {
            "private": {
                "appointment_id": appt.id,
                "patient_id": appt.patient_id,
                "patient_name": appt.patient_name,
                "provider": appt.provider,
                "reason": appt.reason,
                "status": appt.status.as_str(),
            }
        },
    })
}

pub(crate) fn event_to_appointment(event: &Value) -> Result<Appointment, SchedulingError> {
    let props = &event["extendedProperties"]["private"];
    let prop = |key: &str| props[key].as_str().map(str::to_string);

    let start = parse_event_time(&event["start"]).ok_or_else(|| {
        SchedulingError::Backend(format!("calendar event {} has no usable start", event["id"]))
    })?;
    let end = parse_event_time(&event["end"]).unwrap_or(start + Duration::minutes(30));
    let duration_minutes = u32::try_from((end - start).num_minutes()).unwrap_or(30);

    let status = if event["status"].as_str() == Some("cancelled") {
        AppointmentStatus::Cancelled
    } else {
        prop("status")
            .map(|s| AppointmentStatus::parse(&s))
            .unwrap_or(AppointmentStatus::Scheduled)
    };

    Ok(Appointment {
        id: prop("appointment_id")
            .or_else(|| event["id"].as_str().map(str::to_string))
            .unwrap_or_default(),
        patient_id: prop("patient_id").unwrap_or_default(),
        patient_name: prop("patient_name")
            .or_else(|| event["summary"].as_str().map(str::to_string))
            .unwrap_or_default(),
        provider: prop("provider").unwrap_or_default(),
        start,
        duration_minutes,
        reason: prop("reason")
            .or_else(|| event["description"].as_str().map(str::to_string))
            .unwrap_or_default(),
        status,
    })
}

/// Reads ask for `timeZone`, so the offset is the calendar zone's; keep the wall-clock part.
fn parse_event_time(value: &Value) -> Option<NaiveDateTime> {
    let raw = value["dateTime"].as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| parse_datetime(raw.trim_end_matches('Z')))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::routing::{get, patch};
    use axum::{Json, Router};

    use super::*;

    fn sample() -> Appointment {
        Appointment {
            id: "APT1B2C3D".to_string(),
            patient_id: "P1A2B3".to_string(),
            patient_name: "Alice Johnson".to_string(),
            provider: "Dr. Smith".to_string(),
            start: parse_datetime("2025-06-16T14:00").unwrap(),
            duration_minutes: 45,
            reason: "Checkup".to_string(),
            status: AppointmentStatus::Scheduled,
        }
    }

    #[test]
    fn test_event_mapping_round_trip() {
        let appt = sample();
        let mut event = appointment_to_event(&appt, "UTC");
        assert_eq!(event["end"]["dateTime"], "2025-06-16T14:45:00");
        assert_eq!(event["extendedProperties"]["private"]["appointment_id"], "APT1B2C3D");

        // Google echoes times back with an offset
        event["start"]["dateTime"] = json!("2025-06-16T14:00:00Z");
        event["end"]["dateTime"] = json!("2025-06-16T14:45:00Z");
        event["id"] = json!("evt123");

        assert_eq!(event_to_appointment(&event).unwrap(), appt);
    }

    #[test]
    fn test_cancelled_event_status() {
        let mut event = appointment_to_event(&sample(), "UTC");
        event["status"] = json!("cancelled");
        let appt = event_to_appointment(&event).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Cancelled);
    }

    #[test]
    fn test_event_without_private_props_falls_back() {
        let event = json!({
            "id": "evt9",
            "summary": "Walk-in",
            "start": { "dateTime": "2025-06-16T09:00:00-04:00" },
            "end": { "dateTime": "2025-06-16T09:30:00-04:00" },
        });
        let appt = event_to_appointment(&event).unwrap();
        assert_eq!(appt.id, "evt9");
        assert_eq!(appt.patient_name, "Walk-in");
        assert_eq!(appt.duration_minutes, 30);
        assert_eq!(appt.start, parse_datetime("2025-06-16T09:00").unwrap());
    }

    // Minimal stand-in for the events endpoints, paging two events at a time.
    #[derive(Default)]
    struct FakeCalendar {
        events: Mutex<Vec<Value>>,
        requests: Mutex<Vec<String>>,
        list_queries: Mutex<Vec<HashMap<String, String>>>,
    }

    type Shared = Arc<FakeCalendar>;

    const FAKE_PAGE: usize = 2;

    fn merge(target: &mut Value, patch: &Value) {
        match (target, patch) {
            (Value::Object(target), Value::Object(patch)) => {
                for (key, value) in patch {
                    merge(target.entry(key.clone()).or_insert(Value::Null), value);
                }
            }
            (target, patch) => *target = patch.clone(),
        }
    }

    async fn list_events(
        State(cal): State<Shared>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        cal.requests.lock().unwrap().push("GET".to_string());
        cal.list_queries.lock().unwrap().push(params.clone());

        let events = cal.events.lock().unwrap().clone();
        let matching: Vec<Value> = match params
            .get("privateExtendedProperty")
            .and_then(|f| f.strip_prefix("appointment_id="))
        {
            Some(id) => events
                .into_iter()
                .filter(|e| e["extendedProperties"]["private"]["appointment_id"] == id)
                .collect(),
            None => events,
        };

        let offset: usize = params
            .get("pageToken")
            .and_then(|t| t.parse().ok())
            .unwrap_or(0);
        let page: Vec<Value> = matching.iter().skip(offset).take(FAKE_PAGE).cloned().collect();
        let mut body = json!({ "items": page });
        if offset + FAKE_PAGE < matching.len() {
            body["nextPageToken"] = json!((offset + FAKE_PAGE).to_string());
        }
        Json(body)
    }

    async fn insert_event(State(cal): State<Shared>, Json(mut event): Json<Value>) -> Json<Value> {
        cal.requests.lock().unwrap().push("POST".to_string());
        let mut events = cal.events.lock().unwrap();
        event["id"] = json!(format!("evt{}", events.len() + 1));
        events.push(event.clone());
        Json(event)
    }

    async fn patch_event(
        State(cal): State<Shared>,
        Path((_calendar, event_id)): Path<(String, String)>,
        Json(patch): Json<Value>,
    ) -> Result<Json<Value>, StatusCode> {
        cal.requests.lock().unwrap().push(format!("PATCH {event_id}"));
        let mut events = cal.events.lock().unwrap();
        let event = events
            .iter_mut()
            .find(|e| e["id"] == event_id.as_str())
            .ok_or(StatusCode::NOT_FOUND)?;
        merge(event, &patch);
        Ok(Json(event.clone()))
    }

    async fn delete_event(
        State(cal): State<Shared>,
        Path((_calendar, event_id)): Path<(String, String)>,
    ) -> StatusCode {
        cal.requests.lock().unwrap().push(format!("DELETE {event_id}"));
        StatusCode::NO_CONTENT
    }

    async fn fake_store() -> (GoogleCalendarStore, Shared) {
        let cal = Shared::default();
        let app = Router::new()
            .route("/calendars/:calendar/events", get(list_events).post(insert_event))
            .route(
                "/calendars/:calendar/events/:event_id",
                patch(patch_event).delete(delete_event),
            )
            .with_state(cal.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let store = GoogleCalendarStore::new(
            "primary".to_string(),
            "test-token".to_string(),
            "America/New_York".to_string(),
        )
        .with_base_url(format!("http://{addr}"));
        (store, cal)
    }

    fn booked(id: &str, provider: &str, start: &str) -> Appointment {
        Appointment {
            id: id.to_string(),
            provider: provider.to_string(),
            start: parse_datetime(start).unwrap(),
            ..sample()
        }
    }

    fn requests(cal: &Shared) -> Vec<String> {
        cal.requests.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() {
        let (store, cal) = fake_store().await;
        store.create(sample()).await.unwrap();

        let err = store.create(sample()).await.unwrap_err();
        assert!(matches!(err, SchedulingError::DuplicateId(ref id) if id == "APT1B2C3D"));
        assert_eq!(requests(&cal).iter().filter(|r| *r == "POST").count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_patches_status_instead_of_deleting() {
        let (store, cal) = fake_store().await;
        store.create(sample()).await.unwrap();

        let cancelled = store.update("apt1b2c3d", AppointmentChange::Cancel).await.unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

        let log = requests(&cal);
        assert!(log.contains(&"PATCH evt1".to_string()));
        assert!(!log.iter().any(|r| r.starts_with("DELETE")));

        let stored = cal.events.lock().unwrap()[0].clone();
        assert_eq!(stored["status"], "cancelled");
        assert_eq!(store.get("APT1B2C3D").await.unwrap().status, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_reschedule_keeps_duration() {
        let (store, cal) = fake_store().await;
        store.create(sample()).await.unwrap();

        let new_start = parse_datetime("2025-06-20T10:00").unwrap();
        let moved = store
            .update("APT1B2C3D", AppointmentChange::Reschedule(new_start))
            .await
            .unwrap();
        assert_eq!(moved.start, new_start);
        assert_eq!(moved.duration_minutes, 45);
        assert_eq!(moved.status, AppointmentStatus::Scheduled);

        let stored = cal.events.lock().unwrap()[0].clone();
        assert_eq!(stored["end"]["dateTime"], "2025-06-20T10:45:00");
        assert_eq!(stored["end"]["timeZone"], "America/New_York");
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let (store, cal) = fake_store().await;
        store.create(sample()).await.unwrap();

        assert!(matches!(store.get("APT404").await, Err(SchedulingError::NotFound(_))));
        assert!(matches!(
            store.update("APT404", AppointmentChange::Cancel).await,
            Err(SchedulingError::NotFound(_))
        ));
        assert!(!requests(&cal).iter().any(|r| r.starts_with("PATCH")));
    }

    #[tokio::test]
    async fn test_list_window_is_inclusive_in_calendar_zone() {
        let (store, cal) = fake_store().await;
        for appt in [
            booked("APT000001", "Dr. Smith", "2025-06-16T08:00"),
            booked("APT000002", "Dr. Smith", "2025-06-16T23:59"),
            booked("APT000003", "Dr. Smith", "2025-06-17T00:30"),
            booked("APT000004", "Dr. Lee", "2025-06-16T10:00"),
        ] {
            store.create(appt).await.unwrap();
        }

        let query = AppointmentQuery {
            provider: Some("smith".to_string()),
            window: Some((
                parse_datetime("2025-06-16T00:00").unwrap(),
                parse_datetime("2025-06-16T23:59").unwrap(),
            )),
        };
        let mut ids: Vec<String> = store
            .list(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["APT000001", "APT000002"]);

        let queries = cal.list_queries.lock().unwrap().clone();
        let listing = queries.last().unwrap();
        assert_eq!(listing["timeZone"], "America/New_York");
        assert_eq!(listing["timeMin"], "2025-06-15T00:00:00Z");
        assert_eq!(listing["timeMax"], "2025-06-17T23:59:00Z");
        assert!(queries.iter().all(|q| q.get("timeZone").is_some()));
    }

    #[tokio::test]
    async fn test_list_follows_page_tokens() {
        let (store, cal) = fake_store().await;
        for n in 1..=5 {
            let start = format!("2025-06-16T{:02}:00", 8 + n);
            store
                .create(booked(&format!("APT00000{n}"), "Dr. Smith", &start))
                .await
                .unwrap();
        }

        let all = store.list(&AppointmentQuery::default()).await.unwrap();
        assert_eq!(all.len(), 5);

        let paged = cal
            .list_queries
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.contains_key("pageToken"))
            .count();
        assert_eq!(paged, 2);
    }
}

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{non_empty, parse_args, Tool};
use crate::errors::ToolError;
use crate::models::{parse_date, parse_datetime};
use crate::services::scheduling::{
    resolve_window, ListFilter, NewAppointment, SchedulingEngine, DEFAULT_DURATION_MINUTES,
};

const MAX_DURATION_MINUTES: u32 = 9 * 60;

fn default_duration() -> u32 {
    DEFAULT_DURATION_MINUTES
}

fn check_duration(minutes: u32) -> Result<u32, ToolError> {
    if minutes == 0 || minutes > MAX_DURATION_MINUTES {
        return Err(ToolError::InvalidArguments(format!(
            "duration_minutes must be between 1 and {MAX_DURATION_MINUTES}"
        )));
    }
    Ok(minutes)
}

fn require_datetime(field: &str, raw: &str) -> Result<NaiveDateTime, ToolError> {
    parse_datetime(raw).ok_or_else(|| {
        ToolError::InvalidArguments(format!("{field} must be YYYY-MM-DDTHH:MM, got '{raw}'"))
    })
}

fn require_text(field: &str, raw: String) -> Result<String, ToolError> {
    non_empty(Some(raw)).ok_or_else(|| ToolError::InvalidArguments(format!("{field} must not be empty")))
}

#[derive(Debug, Deserialize)]
struct ListArgs {
    #[serde(default)]
    date_from: Option<String>,
    #[serde(default)]
    date_to: Option<String>,
    #[serde(default)]
    patient_name: Option<String>,
    #[serde(default)]
    provider: Option<String>,
}

pub struct ListAppointmentsTool {
    engine: SchedulingEngine,
}

impl ListAppointmentsTool {
    pub fn new(engine: SchedulingEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for ListAppointmentsTool {
    fn name(&self) -> &'static str {
        "list_appointments"
    }

    fn description(&self) -> &'static str {
        "List upcoming appointments. Filter by date range, patient name, or provider. \
         Defaults to the next 7 days starting today."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "date_from": { "type": "string", "description": "Start date/time (YYYY-MM-DD or YYYY-MM-DDTHH:MM). Default: today" },
                "date_to": { "type": "string", "description": "End date/time. Default: 7 days after date_from" },
                "patient_name": { "type": "string", "description": "Partial patient name to filter by" },
                "provider": { "type": "string", "description": "Provider name to filter by" }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: ListArgs = parse_args(args)?;
        let date_from = non_empty(args.date_from);
        let date_to = non_empty(args.date_to);
        let today = chrono::Local::now().date_naive();
        let (from, to) = resolve_window(date_from.as_deref(), date_to.as_deref(), today)?;

        let filter = ListFilter {
            patient_name: non_empty(args.patient_name),
            provider: non_empty(args.provider),
        };
        let appointments = self.engine.list_appointments(from, to, &filter).await?;

        if appointments.is_empty() {
            return Ok(json!({
                "found": false,
                "message": "No appointments found for the given criteria",
            }));
        }
        Ok(json!({
            "found": true,
            "count": appointments.len(),
            "appointments": appointments,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct AvailabilityArgs {
    date: String,
    provider: String,
    #[serde(default = "default_duration")]
    duration_minutes: u32,
}

pub struct CheckAvailabilityTool {
    engine: SchedulingEngine,
}

impl CheckAvailabilityTool {
    pub fn new(engine: SchedulingEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for CheckAvailabilityTool {
    fn name(&self) -> &'static str {
        "check_availability"
    }

    fn description(&self) -> &'static str {
        "Check available appointment slots for a provider on a specific date. \
         Returns open start times between 08:00 and 17:00 in YYYY-MM-DDTHH:MM format."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "date": { "type": "string", "description": "Date in YYYY-MM-DD format" },
                "provider": { "type": "string", "description": "Provider name, e.g. \"Dr. Smith\"" },
                "duration_minutes": { "type": "integer", "description": "Length of the appointment", "default": DEFAULT_DURATION_MINUTES }
            },
            "required": ["date", "provider"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: AvailabilityArgs = parse_args(args)?;
        let date = parse_date(&args.date).ok_or_else(|| {
            ToolError::InvalidArguments(format!("date must be YYYY-MM-DD, got '{}'", args.date))
        })?;
        let provider = require_text("provider", args.provider)?;
        let duration = check_duration(args.duration_minutes)?;

        let slots = self.engine.check_availability(date, &provider, duration).await?;
        if slots.is_empty() {
            return Ok(json!({
                "available": false,
                "message": format!("No availability for {provider} on {date}"),
            }));
        }
        Ok(json!({
            "available": true,
            "slots": slots,
            "count": slots.len(),
        }))
    }
}

#[derive(Debug, Deserialize)]
struct BookArgs {
    patient_id: String,
    patient_name: String,
    provider: String,
    appointment_datetime: String,
    #[serde(default)]
    reason: String,
    #[serde(default = "default_duration")]
    duration_minutes: u32,
}

pub struct BookAppointmentTool {
    engine: SchedulingEngine,
}

impl BookAppointmentTool {
    pub fn new(engine: SchedulingEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for BookAppointmentTool {
    fn name(&self) -> &'static str {
        "book_appointment"
    }

    fn description(&self) -> &'static str {
        "Book a new appointment for a patient. Use the patient_id from search_patient. \
         Returns the created appointment including its appointment_id."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "patient_id": { "type": "string", "description": "Patient ID from search_patient results" },
                "patient_name": { "type": "string", "description": "Full patient name" },
                "provider": { "type": "string", "description": "Provider name, e.g. \"Dr. Smith\"" },
                "appointment_datetime": { "type": "string", "description": "Date and time in YYYY-MM-DDTHH:MM format" },
                "reason": { "type": "string", "description": "Reason for the visit" },
                "duration_minutes": { "type": "integer", "description": "Duration of the appointment", "default": DEFAULT_DURATION_MINUTES }
            },
            "required": ["patient_id", "patient_name", "provider", "appointment_datetime", "reason"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: BookArgs = parse_args(args)?;
        let new = NewAppointment {
            patient_id: require_text("patient_id", args.patient_id)?,
            patient_name: require_text("patient_name", args.patient_name)?,
            provider: require_text("provider", args.provider)?,
            start: require_datetime("appointment_datetime", &args.appointment_datetime)?,
            duration_minutes: check_duration(args.duration_minutes)?,
            reason: args.reason.trim().to_string(),
        };

        let appointment = self.engine.book_appointment(new).await?;
        Ok(json!({ "success": true, "appointment": appointment }))
    }
}

#[derive(Debug, Deserialize)]
struct CancelArgs {
    appointment_id: String,
}

pub struct CancelAppointmentTool {
    engine: SchedulingEngine,
}

impl CancelAppointmentTool {
    pub fn new(engine: SchedulingEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for CancelAppointmentTool {
    fn name(&self) -> &'static str {
        "cancel_appointment"
    }

    fn description(&self) -> &'static str {
        "Cancel an existing appointment by its ID."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "appointment_id": { "type": "string", "description": "The appointment ID, e.g. APT001" }
            },
            "required": ["appointment_id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: CancelArgs = parse_args(args)?;
        let id = require_text("appointment_id", args.appointment_id)?;
        let appointment = self.engine.cancel_appointment(&id).await?;
        Ok(json!({ "success": true, "appointment": appointment }))
    }
}

#[derive(Debug, Deserialize)]
struct RescheduleArgs {
    appointment_id: String,
    new_datetime: String,
}

pub struct RescheduleAppointmentTool {
    engine: SchedulingEngine,
}

impl RescheduleAppointmentTool {
    pub fn new(engine: SchedulingEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for RescheduleAppointmentTool {
    fn name(&self) -> &'static str {
        "reschedule_appointment"
    }

    fn description(&self) -> &'static str {
        "Reschedule an existing appointment to a new date and time."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "appointment_id": { "type": "string", "description": "The appointment ID, e.g. APT001" },
                "new_datetime": { "type": "string", "description": "New date and time in YYYY-MM-DDTHH:MM format" }
            },
            "required": ["appointment_id", "new_datetime"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: RescheduleArgs = parse_args(args)?;
        let id = require_text("appointment_id", args.appointment_id)?;
        let new_start = require_datetime("new_datetime", &args.new_datetime)?;
        let appointment = self.engine.reschedule_appointment(&id, new_start).await?;
        Ok(json!({ "success": true, "appointment": appointment }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::MemoryStore;

    fn engine() -> SchedulingEngine {
        let today = chrono::Local::now().date_naive();
        SchedulingEngine::new(Arc::new(MemoryStore::seeded(today)))
    }

    #[tokio::test]
    async fn test_list_defaults_to_upcoming_week() {
        let tool = ListAppointmentsTool::new(engine());
        let result = tool.execute(json!({})).await.unwrap();
        assert_eq!(result["found"], true);
        assert_eq!(result["count"], 3);
        assert_eq!(result["appointments"][0]["appointment_id"], "APT001");
    }

    #[tokio::test]
    async fn test_list_treats_empty_strings_as_omitted() {
        let tool = ListAppointmentsTool::new(engine());
        let result = tool
            .execute(json!({"date_from": "", "provider": "patel", "patient_name": ""}))
            .await
            .unwrap();
        assert_eq!(result["count"], 1);
        assert_eq!(result["appointments"][0]["patient_name"], "Bob Williams");
    }

    #[tokio::test]
    async fn test_list_rejects_unparseable_dates() {
        let tool = ListAppointmentsTool::new(engine());
        let err = tool.execute(json!({"date_from": "next tuesday"})).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[tokio::test]
    async fn test_check_availability_payload() {
        let tool = CheckAvailabilityTool::new(engine());
        let result = tool
            .execute(json!({"date": "2030-01-07", "provider": "Dr. Smith"}))
            .await
            .unwrap();
        assert_eq!(result["available"], true);
        assert_eq!(result["count"], 18);
        assert_eq!(result["slots"][0], "2030-01-07T08:00");
    }

    #[tokio::test]
    async fn test_check_availability_rejects_zero_duration() {
        let tool = CheckAvailabilityTool::new(engine());
        let err = tool
            .execute(json!({"date": "2030-01-07", "provider": "Dr. Smith", "duration_minutes": 0}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_book_returns_new_appointment() {
        let tool = BookAppointmentTool::new(engine());
        let result = tool
            .execute(json!({
                "patient_id": "P1A2B3",
                "patient_name": "Alice Johnson",
                "provider": "Dr. Smith",
                "appointment_datetime": "2030-01-07T14:00",
                "reason": "checkup"
            }))
            .await
            .unwrap();
        assert_eq!(result["success"], true);
        let appt = &result["appointment"];
        assert!(appt["appointment_id"].as_str().unwrap().starts_with("APT"));
        assert_eq!(appt["datetime"], "2030-01-07T14:00");
        assert_eq!(appt["duration_minutes"], 30);
        assert_eq!(appt["status"], "scheduled");
    }

    #[tokio::test]
    async fn test_book_rejects_bad_datetime() {
        let tool = BookAppointmentTool::new(engine());
        let err = tool
            .execute(json!({
                "patient_id": "P1A2B3",
                "patient_name": "Alice Johnson",
                "provider": "Dr. Smith",
                "appointment_datetime": "tomorrow at 2",
                "reason": "checkup"
            }))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_arguments");
    }

    #[tokio::test]
    async fn test_cancel_unknown_id_is_not_found() {
        let tool = CancelAppointmentTool::new(engine());
        let err = tool
            .execute(json!({"appointment_id": "APT999"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_reschedule_moves_appointment() {
        let tool = RescheduleAppointmentTool::new(engine());
        let result = tool
            .execute(json!({"appointment_id": "apt003", "new_datetime": "2030-01-08T11:30"}))
            .await
            .unwrap();
        assert_eq!(result["appointment"]["appointment_id"], "APT003");
        assert_eq!(result["appointment"]["datetime"], "2030-01-08T11:30");
    }
}

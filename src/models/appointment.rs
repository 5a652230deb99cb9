use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    #[serde(rename = "appointment_id")]
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub provider: String,
    #[serde(rename = "datetime", with = "minute_format")]
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
    pub reason: String,
    pub status: AppointmentStatus,
}

impl Appointment {
    pub fn is_active(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "cancelled" => AppointmentStatus::Cancelled,
            "completed" => AppointmentStatus::Completed,
            _ => AppointmentStatus::Scheduled,
        }
    }
}

/// A bookable start time. Never stored; computed per availability query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Slot(pub NaiveDateTime);

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(MINUTE_FORMAT))
    }
}

impl Serialize for Slot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Accepts `YYYY-MM-DDTHH:MM`, `YYYY-MM-DD HH:MM` and the same with seconds.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

mod minute_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&dt.format(super::MINUTE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_datetime(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appointment_serializes_wire_names() {
        let appt = Appointment {
            id: "APT001".to_string(),
            patient_id: "P1A2B3".to_string(),
            patient_name: "Alice Johnson".to_string(),
            provider: "Dr. Smith".to_string(),
            start: parse_datetime("2025-06-16T14:00").unwrap(),
            duration_minutes: 30,
            reason: "Annual checkup".to_string(),
            status: AppointmentStatus::Scheduled,
        };
        let json = serde_json::to_value(&appt).unwrap();
        assert_eq!(json["appointment_id"], "APT001");
        assert_eq!(json["datetime"], "2025-06-16T14:00");
        assert_eq!(json["status"], "scheduled");

        let back: Appointment = serde_json::from_value(json).unwrap();
        assert_eq!(back, appt);
    }

    #[test]
    fn test_parse_datetime_formats() {
        let expected = parse_datetime("2025-06-16T09:30").unwrap();
        assert_eq!(parse_datetime("2025-06-16 09:30"), Some(expected));
        assert_eq!(parse_datetime("2025-06-16T09:30:00"), Some(expected));
        assert_eq!(parse_datetime(" 2025-06-16 09:30:00 "), Some(expected));
        assert_eq!(parse_datetime("2025-06-16"), None);
        assert_eq!(parse_datetime("tomorrow at 2"), None);
    }

    #[test]
    fn test_slot_display() {
        let slot = Slot(parse_datetime("2025-06-16 08:00").unwrap());
        assert_eq!(slot.to_string(), "2025-06-16T08:00");
        assert_eq!(serde_json::to_value(slot).unwrap(), "2025-06-16T08:00");
    }
}

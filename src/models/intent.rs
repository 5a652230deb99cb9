use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    #[serde(alias = "schedule")]
    ScheduleAppointment,
    #[serde(alias = "cancel")]
    CancelAppointment,
    #[serde(alias = "reschedule")]
    RescheduleAppointment,
    #[serde(alias = "check")]
    CheckAppointments,
    #[serde(alias = "lookup")]
    PatientLookup,
    #[serde(alias = "general")]
    GeneralQuery,
    #[serde(other)]
    Unknown,
}

impl IntentType {
    pub const ALL: [IntentType; 7] = [
        IntentType::ScheduleAppointment,
        IntentType::CancelAppointment,
        IntentType::RescheduleAppointment,
        IntentType::CheckAppointments,
        IntentType::PatientLookup,
        IntentType::GeneralQuery,
        IntentType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentType::ScheduleAppointment => "schedule_appointment",
            IntentType::CancelAppointment => "cancel_appointment",
            IntentType::RescheduleAppointment => "reschedule_appointment",
            IntentType::CheckAppointments => "check_appointments",
            IntentType::PatientLookup => "patient_lookup",
            IntentType::GeneralQuery => "general_query",
            IntentType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Entities {
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub appointment_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Intent {
    #[serde(rename = "type")]
    pub kind: IntentType,
    pub confidence: f64,
    #[serde(default)]
    pub entities: Entities,
    #[serde(default)]
    pub summary: String,
}

impl Intent {
    pub const FALLBACK_CONFIDENCE: f64 = 0.3;

    /// Low-confidence general query used whenever classification fails.
    pub fn fallback(text: &str) -> Self {
        Self {
            kind: IntentType::GeneralQuery,
            confidence: Self::FALLBACK_CONFIDENCE,
            entities: Entities::default(),
            summary: text.to_string(),
        }
    }
}

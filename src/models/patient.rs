use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub patient_id: String,
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
    pub phone: String,
    pub email: String,
    pub insurance: String,
    pub provider: String,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

pub mod appointment;
pub mod conversation;
pub mod intent;
pub mod patient;

pub use appointment::{parse_date, parse_datetime, Appointment, AppointmentStatus, Slot};
pub use conversation::{Role, Turn};
pub use intent::{Entities, Intent, IntentType};
pub use patient::Patient;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::directory::SqlitePatientDirectory;
use crate::services::pipeline::Orchestrator;
use crate::services::scheduling::SchedulingEngine;

pub struct AppState {
    pub config: AppConfig,
    pub orchestrator: Orchestrator,
    pub engine: SchedulingEngine,
    pub directory: Arc<SqlitePatientDirectory>,
}

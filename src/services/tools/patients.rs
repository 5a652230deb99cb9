use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_args, Tool};
use crate::errors::{SchedulingError, ToolError};
use crate::services::directory::PatientDirectory;

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

pub struct SearchPatientTool {
    directory: Arc<dyn PatientDirectory>,
}

impl SearchPatientTool {
    pub fn new(directory: Arc<dyn PatientDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for SearchPatientTool {
    fn name(&self) -> &'static str {
        "search_patient"
    }

    fn description(&self) -> &'static str {
        "Search for patients by name, patient ID, phone number, or email. \
         Use this to find the patient and their patient_id before booking or looking up appointments."
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["lookup_patient"]
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Name, ID, phone, or email to search for" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: SearchArgs = parse_args(args)?;
        let query = args.query.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArguments("query must not be empty".to_string()));
        }

        let patients = self
            .directory
            .search(query)
            .map_err(|e| ToolError::Failed(SchedulingError::Backend(format!("patient directory: {e:#}"))))?;

        if patients.is_empty() {
            return Ok(json!({
                "found": false,
                "message": format!("No patient found matching '{query}'"),
            }));
        }
        Ok(json!({
            "found": true,
            "count": patients.len(),
            "patients": patients,
        }))
    }
}

//! Tools the reasoning loop may call.
//!
//! Every tool declares a JSON schema for its arguments and returns a JSON
//! payload. The registry owns the call boundary: lookup, per-call timeout,
//! the audit log line, and turning any `ToolError` into a failure payload.

pub mod appointments;
pub mod patients;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::errors::ToolError;
use crate::services::ai::{ToolCall, ToolSpec};
use crate::services::directory::PatientDirectory;
use crate::services::scheduling::SchedulingEngine;

const ARGS_PREVIEW_CHARS: usize = 200;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Extra names the oracle may use for this tool.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    fn parameters_schema(&self) -> Value;

    async fn execute(&self, args: Value) -> Result<Value, ToolError>;
}

/// Result text handed back to the oracle for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<&'static str, usize>,
    timeout: Duration,
}

impl ToolRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            tools: vec![],
            by_name: HashMap::new(),
            timeout,
        }
    }

    /// The six front-desk tools over the given engine and directory.
    pub fn front_desk(
        engine: SchedulingEngine,
        directory: Arc<dyn PatientDirectory>,
        timeout: Duration,
    ) -> Self {
        let mut registry = Self::new(timeout);
        registry.register(patients::SearchPatientTool::new(directory));
        registry.register(appointments::ListAppointmentsTool::new(engine.clone()));
        registry.register(appointments::CheckAvailabilityTool::new(engine.clone()));
        registry.register(appointments::BookAppointmentTool::new(engine.clone()));
        registry.register(appointments::CancelAppointmentTool::new(engine.clone()));
        registry.register(appointments::RescheduleAppointmentTool::new(engine));
        registry
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let index = self.tools.len();
        self.by_name.insert(tool.name(), index);
        for alias in tool.aliases() {
            self.by_name.insert(alias, index);
        }
        self.tools.push(Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.by_name.get(name).map(|&i| self.tools[i].clone())
    }

    /// Declared tools in registration order, aliases excluded.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|tool| ToolSpec {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    /// Runs one call. Never fails: errors come back as `{success: false, ...}`.
    pub async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let start = Instant::now();
        let preview = args_preview(&call.arguments);

        let result = match self.get(&call.name) {
            Some(tool) => {
                match tokio::time::timeout(self.timeout, tool.execute(call.arguments.clone())).await {
                    Ok(result) => result,
                    Err(_) => Err(ToolError::Timeout(call.name.clone())),
                }
            }
            None => Err(ToolError::UnknownTool(call.name.clone())),
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        tracing::info!(
            tool = %call.name,
            call_id = %call.id,
            outcome,
            duration_ms = start.elapsed().as_millis() as u64,
            args = %preview,
            "tool call"
        );

        match result {
            Ok(payload) => ToolOutput {
                content: payload.to_string(),
                is_error: false,
            },
            Err(e) => ToolOutput {
                content: failure_payload(&e).to_string(),
                is_error: true,
            },
        }
    }
}

pub fn failure_payload(err: &ToolError) -> Value {
    json!({
        "success": false,
        "error": err.to_string(),
        "kind": err.kind(),
    })
}

/// Deserializes tool arguments into their typed form.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    // Some oracles send `null` instead of `{}` for argument-less calls
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Oracles often send "" for an omitted optional argument.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.chars().count() > ARGS_PREVIEW_CHARS {
        format!("{}...", s.chars().take(ARGS_PREVIEW_CHARS).collect::<String>())
    } else {
        s
    }
}

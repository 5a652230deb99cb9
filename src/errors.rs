use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("appointment {0} not found")]
    NotFound(String),

    #[error("appointment id {0} already exists")]
    DuplicateId(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("calendar backend error: {0}")]
    Backend(String),
}

impl SchedulingError {
    pub fn kind(&self) -> &'static str {
        match self {
            SchedulingError::NotFound(_) => "not_found",
            SchedulingError::DuplicateId(_) => "duplicate_id",
            SchedulingError::InvalidInput(_) => "invalid_input",
            SchedulingError::Backend(_) => "backend",
        }
    }
}

/// Raised while running a tool on behalf of the reasoning loop. Never leaves
/// the registry: it is turned into a failure payload for the oracle.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool {0} timed out")]
    Timeout(String),

    #[error(transparent)]
    Failed(#[from] SchedulingError),
}

impl ToolError {
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::InvalidArguments(_) => "invalid_arguments",
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::Timeout(_) => "timeout",
            ToolError::Failed(e) => e.kind(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("directory error: {0}")]
    Directory(String),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Scheduling(SchedulingError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Scheduling(SchedulingError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            AppError::Scheduling(SchedulingError::DuplicateId(_)) => StatusCode::CONFLICT,
            AppError::Scheduling(SchedulingError::Backend(_)) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

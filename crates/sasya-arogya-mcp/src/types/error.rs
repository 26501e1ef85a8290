//! Error taxonomy for the tool server and its wire mapping.

use serde::{Deserialize, Serialize};

use sasya_arogya::InsuranceError;

/// Stable wire kinds for a failed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownTool,
    InvalidArguments,
    NotFound,
    RenderError,
    DecodeError,
    Timeout,
    InternalError,
}

impl ErrorKind {
    /// HTTP status used by the HTTP transport.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::UnknownTool | ErrorKind::NotFound => 404,
            ErrorKind::InvalidArguments | ErrorKind::DecodeError => 400,
            ErrorKind::Timeout => 504,
            ErrorKind::RenderError | ErrorKind::InternalError => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnknownTool => "unknown_tool",
            ErrorKind::InvalidArguments => "invalid_arguments",
            ErrorKind::NotFound => "not_found",
            ErrorKind::RenderError => "render_error",
            ErrorKind::DecodeError => "decode_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors a tool handler may return.
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Render error: {0}")]
    Render(String),

    /// The stream consumer went away; the handler should stop.
    #[error("Invocation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::InvalidArguments(_) => ErrorKind::InvalidArguments,
            ToolError::NotFound(_) => ErrorKind::NotFound,
            ToolError::Render(_) => ErrorKind::RenderError,
            ToolError::Cancelled | ToolError::Internal(_) => ErrorKind::InternalError,
        }
    }
}

impl From<InsuranceError> for ToolError {
    fn from(e: InsuranceError) -> Self {
        match e {
            InsuranceError::NotFound(msg) => ToolError::NotFound(msg),
            InsuranceError::InvalidInput(msg) => ToolError::InvalidArguments(msg),
            InsuranceError::Render(msg) => ToolError::Render(msg),
            other => ToolError::Internal(other.to_string()),
        }
    }
}

/// Argument validation failures, reported as `InvalidArguments`.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Field '{field}' expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Registry construction failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),
}

/// Process and transport level errors.
#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Insurance(#[from] InsuranceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;

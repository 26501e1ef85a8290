//! Outcome types: what an invocation produces, and tool listings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ErrorKind;

/// A failed invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// One increment of a streamed invocation.
///
/// The last event of a stream has `done = true` and carries either the final
/// payload in `partial` or a `failure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub sequence: u64,
    #[serde(default)]
    pub partial: Value,
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

impl StreamEvent {
    pub fn progress(sequence: u64, partial: Value) -> Self {
        Self {
            sequence,
            partial,
            done: false,
            failure: None,
        }
    }

    pub fn finished(sequence: u64, result: Result<Value, Failure>) -> Self {
        match result {
            Ok(payload) => Self {
                sequence,
                partial: payload,
                done: true,
                failure: None,
            },
            Err(failure) => Self {
                sequence,
                partial: Value::Null,
                done: true,
                failure: Some(failure),
            },
        }
    }
}

/// Terminal or incremental result of an invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { payload: Value },
    Failure(Failure),
    Event(StreamEvent),
}

impl ToolOutcome {
    pub fn success(payload: Value) -> Self {
        ToolOutcome::Success { payload }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        ToolOutcome::Failure(Failure::new(kind, message))
    }

    /// Whether this outcome ends the invocation.
    pub fn is_terminal(&self) -> bool {
        match self {
            ToolOutcome::Success { .. } | ToolOutcome::Failure(_) => true,
            ToolOutcome::Event(event) => event.done,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ToolOutcome::Success { .. } => None,
            ToolOutcome::Failure(f) => Some(f.kind),
            ToolOutcome::Event(event) => event.failure.as_ref().map(|f| f.kind),
        }
    }

    pub fn http_status(&self) -> u16 {
        self.error_kind().map(ErrorKind::http_status).unwrap_or(200)
    }
}

impl From<Result<Value, Failure>> for ToolOutcome {
    fn from(result: Result<Value, Failure>) -> Self {
        match result {
            Ok(payload) => ToolOutcome::Success { payload },
            Err(failure) => ToolOutcome::Failure(failure),
        }
    }
}

/// Wire form of a registered tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub summary: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolListResult {
    pub tools: Vec<ToolDefinition>,
}

//! Line framing for the local channel: one JSON object per line.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{ServerError, ServerResult, ToolOutcome};

/// A decoded request line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LineRequest {
    Invoke {
        #[serde(default)]
        id: Option<Value>,
        name: String,
        #[serde(default)]
        arguments: Map<String, Value>,
    },
    List {
        #[serde(default)]
        id: Option<Value>,
    },
    Ping {
        #[serde(default)]
        id: Option<Value>,
    },
}

impl LineRequest {
    pub fn id(&self) -> Option<&Value> {
        match self {
            LineRequest::Invoke { id, .. } | LineRequest::List { id } | LineRequest::Ping { id } => {
                id.as_ref()
            }
        }
    }
}

/// A response line: the encoded outcome plus the echoed request id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub outcome: ToolOutcome,
}

impl LineResponse {
    pub fn new(id: Option<Value>, outcome: ToolOutcome) -> Self {
        Self { id, outcome }
    }
}

/// A frame that could not be decoded, with whatever id could be salvaged.
#[derive(Debug)]
pub struct DecodeFailure {
    pub id: Option<Value>,
    pub error: ServerError,
}

/// Decode one line. When the JSON is well formed but not a valid request,
/// the `id` field is still recovered so the error can be correlated.
pub fn parse_request(line: &str) -> Result<LineRequest, DecodeFailure> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(DecodeFailure {
            id: None,
            error: ServerError::Decode("Empty message".to_string()),
        });
    }

    let value: Value = serde_json::from_str(trimmed).map_err(|e| DecodeFailure {
        id: None,
        error: ServerError::Decode(e.to_string()),
    })?;
    let id = value.get("id").cloned().filter(|v| !v.is_null());

    serde_json::from_value(value).map_err(|e| DecodeFailure {
        id,
        error: ServerError::Decode(e.to_string()),
    })
}

/// Serialize a response to a JSON line (with trailing newline).
pub fn frame_response(response: &LineResponse) -> ServerResult<String> {
    let mut json = serde_json::to_string(response)?;
    json.push('\n');
    Ok(json)
}

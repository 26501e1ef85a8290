//! The seam between the dispatch core and tool implementations.

use async_trait::async_trait;
use serde_json::Value;

use crate::protocol::{Progress, ValidatedArguments};
use crate::types::ToolError;

/// Business logic behind one tool.
///
/// Handlers receive arguments that already passed schema validation. In
/// stream mode `progress` forwards intermediate values to the caller; in sync
/// mode it discards them.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: ValidatedArguments, progress: Progress) -> Result<Value, ToolError>;
}

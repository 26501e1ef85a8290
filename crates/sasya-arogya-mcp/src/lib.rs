//! Sasya Arogya tool server: a transport-agnostic tool registry and dispatch
//! core, served over a stdio line channel and HTTP with SSE streaming.

pub mod config;
pub mod protocol;
pub mod repl;
pub mod tools;
pub mod transport;
pub mod types;

/// Name reported by `info` and `GET /`.
pub const SERVER_NAME: &str = "sasya-arogya-mcp";

pub use config::{build_dispatcher, dispatcher_from, resolve_data_source, DataSource};
pub use protocol::Dispatcher;
pub use tools::{ToolContext, ToolRegistry};
pub use transport::StdioTransport;

//! Configuration loading and resolution: CLI flag > environment > default.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sasya_arogya::ReferenceTables;

use crate::protocol::Dispatcher;
use crate::tools::{ToolContext, ToolRegistry};
use crate::types::{ServerError, ServerResult};

pub const DATA_DIR_ENV: &str = "SASYA_DATA_DIR";
pub const HTTP_ADDR_ENV: &str = "SASYA_HTTP_ADDR";
pub const TIMEOUT_ENV: &str = "SASYA_TIMEOUT_SECS";

pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8000";

/// Directory checked for reference tables when nothing is configured.
const LOCAL_DATA_DIR: &str = "resources";

/// Where the reference tables come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Dir(PathBuf),
    Builtin,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Dir(dir) => write!(f, "{}", dir.display()),
            DataSource::Builtin => write!(f, "<builtin>"),
        }
    }
}

/// Resolve the reference data location.
pub fn resolve_data_source(explicit: Option<&Path>) -> DataSource {
    if let Some(dir) = explicit {
        return DataSource::Dir(dir.to_path_buf());
    }

    if let Ok(env_dir) = std::env::var(DATA_DIR_ENV) {
        if !env_dir.trim().is_empty() {
            return DataSource::Dir(PathBuf::from(env_dir));
        }
    }

    let local = PathBuf::from(LOCAL_DATA_DIR);
    if ReferenceTables::dir_has_tables(&local) {
        return DataSource::Dir(local);
    }

    DataSource::Builtin
}

pub fn load_reference(source: &DataSource) -> ServerResult<ReferenceTables> {
    let tables = match source {
        DataSource::Dir(dir) => ReferenceTables::load_dir(dir)?,
        DataSource::Builtin => ReferenceTables::builtin()?,
    };
    Ok(tables)
}

pub fn resolve_http_addr(explicit: Option<&str>) -> String {
    if let Some(addr) = explicit {
        return addr.to_string();
    }

    std::env::var(HTTP_ADDR_ENV)
        .ok()
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string())
}

/// Parse a timeout in whole seconds. Zero disables the deadline.
pub fn parse_timeout(raw: &str) -> ServerResult<Option<Duration>> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| ServerError::Config(format!("Invalid timeout '{raw}': expected seconds")))?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}

pub fn resolve_timeout(explicit: Option<u64>) -> ServerResult<Option<Duration>> {
    if let Some(secs) = explicit {
        return Ok((secs > 0).then(|| Duration::from_secs(secs)));
    }

    match std::env::var(TIMEOUT_ENV) {
        Ok(raw) if !raw.trim().is_empty() => parse_timeout(&raw),
        _ => Ok(None),
    }
}

/// Registry with the builtin tools over `tables`, wrapped in a dispatcher.
pub fn build_dispatcher(tables: ReferenceTables) -> ServerResult<Dispatcher> {
    let ctx = ToolContext::with_tables(tables);
    let registry = ToolRegistry::with_builtin_tools(&ctx)?;
    Ok(Dispatcher::new(Arc::new(registry)))
}

/// Resolve, load and build in one step.
pub fn dispatcher_from(explicit_data_dir: Option<&Path>) -> ServerResult<Dispatcher> {
    let source = resolve_data_source(explicit_data_dir);
    tracing::info!("Reference data: {source}");
    build_dispatcher(load_reference(&source)?)
}

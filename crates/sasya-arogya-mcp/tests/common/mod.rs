//! Shared fixtures and test collaborators for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use sasya_arogya::{CompanyRecord, CropPremiumRow, ReferenceTables};
use sasya_arogya_mcp::protocol::{Dispatcher, FieldType, Progress, Schema, ValidatedArguments};
use sasya_arogya_mcp::tools::{ToolContext, ToolDescriptor, ToolHandler, ToolRegistry};
use sasya_arogya_mcp::types::ToolError;

// ─────────────────────── fixtures ───────────────────────

pub fn fixture_crops() -> Vec<CropPremiumRow> {
    serde_json::from_value(json!([
        { "crop": "Wheat", "state": "Karnataka", "season": "Rabi",
          "scale_of_finance": 50000.0, "actuarial_rate_percent": 4.5 },
        { "crop": "Wheat", "season": "Rabi",
          "scale_of_finance": 40000.0, "actuarial_rate_percent": 3.0 },
        { "crop": "Tomato", "season": "Horticulture",
          "scale_of_finance": 120000.0, "actuarial_rate_percent": 8.0 }
    ]))
    .unwrap()
}

pub fn fixture_companies() -> Vec<CompanyRecord> {
    serde_json::from_value(json!([
        { "name": "Agriculture Insurance Company", "address": "New Delhi",
          "state": "Karnataka", "rate_multiplier": 1.0 },
        { "name": "Universal Sompo", "address": "Navi Mumbai",
          "state": "Karnataka", "rate_multiplier": 0.95 },
        { "name": "HDFC ERGO", "address": "Mumbai",
          "state": "Maharashtra", "rate_multiplier": 1.05 }
    ]))
    .unwrap()
}

pub fn fixture_tables() -> ReferenceTables {
    ReferenceTables::new(fixture_crops(), fixture_companies())
}

/// Builtin tools over the fixture tables.
pub fn fixture_dispatcher() -> Dispatcher {
    let ctx = ToolContext::with_tables(fixture_tables());
    Dispatcher::new(Arc::new(ToolRegistry::with_builtin_tools(&ctx).unwrap()))
}

/// Builtin tools plus the test tools below, all reporting into `probe`.
pub fn test_dispatcher(probe: &Probe) -> Dispatcher {
    let ctx = ToolContext::with_tables(fixture_tables());
    let mut registry = ToolRegistry::with_builtin_tools(&ctx).unwrap();
    for descriptor in test_tools(probe) {
        registry.register(descriptor).unwrap();
    }
    Dispatcher::new(Arc::new(registry))
}

pub fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

/// Poll `check` until it holds or `limit` elapses.
pub async fn wait_until(limit: Duration, check: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

// ─────────────────────── test collaborators ───────────────────────

/// Observes what the test handlers did.
#[derive(Clone, Default)]
pub struct Probe {
    /// Progress values successfully emitted.
    pub emitted: Arc<AtomicUsize>,
    /// Set when a handler future is dropped, whether finished or aborted.
    pub dropped: Arc<AtomicBool>,
}

impl Probe {
    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Emits a value every 10ms until cancelled.
struct Chatty(Probe);

#[async_trait]
impl ToolHandler for Chatty {
    async fn call(&self, _args: ValidatedArguments, progress: Progress) -> Result<Value, ToolError> {
        let _flag = DropFlag(Arc::clone(&self.0.dropped));
        let mut n = 0u64;
        loop {
            progress.emit(json!({ "tick": n })).await?;
            self.0.emitted.fetch_add(1, Ordering::SeqCst);
            n += 1;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[derive(Deserialize)]
struct CountdownParams {
    count: u64,
}

/// Emits `count` values, then returns how many it emitted.
struct Countdown(Probe);

#[async_trait]
impl ToolHandler for Countdown {
    async fn call(&self, args: ValidatedArguments, progress: Progress) -> Result<Value, ToolError> {
        let params: CountdownParams = args.into_params()?;
        for i in 0..params.count {
            progress.emit(json!({ "remaining": params.count - i })).await?;
            self.0.emitted.fetch_add(1, Ordering::SeqCst);
        }
        Ok(json!({ "emitted": params.count }))
    }
}

#[derive(Deserialize)]
struct SlowParams {
    millis: u64,
}

struct Slow(Probe);

#[async_trait]
impl ToolHandler for Slow {
    async fn call(&self, args: ValidatedArguments, _progress: Progress) -> Result<Value, ToolError> {
        let _flag = DropFlag(Arc::clone(&self.0.dropped));
        let params: SlowParams = args.into_params()?;
        tokio::time::sleep(Duration::from_millis(params.millis)).await;
        Ok(json!({ "slept_ms": params.millis }))
    }
}

struct Panicky;

#[async_trait]
impl ToolHandler for Panicky {
    async fn call(&self, _args: ValidatedArguments, _progress: Progress) -> Result<Value, ToolError> {
        panic!("secret detail that must not leak");
    }
}

fn test_tools(probe: &Probe) -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new("chatty", "Emits until cancelled", Schema::new(), Chatty(probe.clone())),
        ToolDescriptor::new(
            "countdown",
            "Emits a fixed number of values",
            Schema::new().required("count", FieldType::Number, "Values to emit"),
            Countdown(probe.clone()),
        ),
        ToolDescriptor::new(
            "slow",
            "Sleeps, then answers",
            Schema::new().required("millis", FieldType::Number, "Sleep duration"),
            Slow(probe.clone()),
        ),
        ToolDescriptor::new("panicky", "Always panics", Schema::new(), Panicky),
    ]
}

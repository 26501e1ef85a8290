//! Dispatch core: resolves, validates and executes tool invocations.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinError};
use tracing::Instrument;

use crate::tools::{ToolHandler, ToolRegistry};
use crate::types::{
    ErrorKind, Failure, InvocationMode, StreamEvent, ToolError, ToolInvocation, ToolOutcome,
};

use super::progress::Progress;
use super::validator::{validate, ValidatedArguments};

/// Default capacity of a stream channel.
pub const DEFAULT_STREAM_BUFFER: usize = 32;

/// Shared, stateless entry point for every transport.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    stream_buffer: usize,
}

/// Aborts the handler task if the awaiting future is dropped first.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }

    pub fn with_stream_buffer(mut self, capacity: usize) -> Self {
        self.stream_buffer = capacity.max(1);
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    fn prepare(
        &self,
        invocation: &ToolInvocation,
    ) -> Result<(Arc<dyn ToolHandler>, ValidatedArguments), Failure> {
        let descriptor = self.registry.resolve(&invocation.name).ok_or_else(|| {
            Failure::new(
                ErrorKind::UnknownTool,
                format!("Unknown tool: {}", invocation.name),
            )
        })?;
        let args = validate(descriptor.schema(), &invocation.arguments).map_err(|e| {
            tracing::warn!(error = %e, "argument validation failed");
            Failure::new(ErrorKind::InvalidArguments, e.to_string())
        })?;
        Ok((descriptor.handler(), args))
    }

    /// Run an invocation to completion, discarding progress.
    pub async fn call(&self, invocation: ToolInvocation) -> ToolOutcome {
        let span = tracing::info_span!("invoke", tool = %invocation.name, mode = "sync");
        async move {
            let (handler, args) = match self.prepare(&invocation) {
                Ok(prepared) => prepared,
                Err(failure) => return ToolOutcome::Failure(failure),
            };

            let task = tokio::spawn(
                async move { handler.call(args, Progress::discard()).await }.in_current_span(),
            );
            let _guard = AbortOnDrop(task.abort_handle());
            let outcome = ToolOutcome::from(settle(task.await));
            tracing::debug!(status = outcome.http_status(), "invocation finished");
            outcome
        }
        .instrument(span)
        .await
    }

    /// Run an invocation as an ordered stream of events ending in `done`.
    ///
    /// Dropping the receiver aborts the handler.
    pub fn stream(&self, invocation: ToolInvocation) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(self.stream_buffer);
        let span = tracing::info_span!("invoke", tool = %invocation.name, mode = "stream");

        let (handler, args) = match span.in_scope(|| self.prepare(&invocation)) {
            Ok(prepared) => prepared,
            Err(failure) => {
                // Fresh channel with capacity >= 1, so this cannot be full.
                let _ = tx.try_send(StreamEvent::finished(0, Err(failure)));
                return rx;
            }
        };

        let progress = Progress::channel(tx.clone());
        tokio::spawn(
            async move {
                let handler_progress = progress.clone();
                let task = tokio::spawn(
                    async move { handler.call(args, handler_progress).await }.in_current_span(),
                );
                let abort = task.abort_handle();

                let joined = tokio::select! {
                    biased;
                    joined = task => joined,
                    _ = tx.closed() => {
                        abort.abort();
                        tracing::debug!("stream consumer gone, handler aborted");
                        return;
                    }
                };

                if !progress.finish(settle(joined)).await {
                    tracing::debug!("stream consumer gone before the final event");
                } else {
                    tracing::debug!("stream finished");
                }
            }
            .instrument(span),
        );
        rx
    }

    /// Mode-generic entry point. Sync mode yields exactly one outcome; stream
    /// mode yields `Event` outcomes, the last with `done = true`.
    pub fn invoke(
        &self,
        invocation: ToolInvocation,
        mode: InvocationMode,
    ) -> mpsc::Receiver<ToolOutcome> {
        match mode {
            InvocationMode::Sync => {
                let (tx, rx) = mpsc::channel(1);
                let dispatcher = self.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        outcome = dispatcher.call(invocation) => {
                            let _ = tx.send(outcome).await;
                        }
                        _ = tx.closed() => {}
                    }
                });
                rx
            }
            InvocationMode::Stream => {
                let (tx, rx) = mpsc::channel(self.stream_buffer);
                let mut events = self.stream(invocation);
                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            event = events.recv() => match event {
                                Some(event) => {
                                    if tx.send(ToolOutcome::Event(event)).await.is_err() {
                                        break;
                                    }
                                }
                                None => break,
                            },
                            _ = tx.closed() => break,
                        }
                    }
                });
                rx
            }
        }
    }
}

/// Map a joined handler task onto the terminal result.
fn settle(joined: Result<Result<Value, ToolError>, JoinError>) -> Result<Value, Failure> {
    match joined {
        Ok(Ok(payload)) => Ok(payload),
        Ok(Err(err)) => Err(handler_failure(err)),
        Err(join_err) if join_err.is_panic() => {
            let detail = panic_message(join_err.into_panic());
            Err(internal_failure(&format!("handler panicked: {detail}")))
        }
        Err(join_err) => Err(internal_failure(&join_err.to_string())),
    }
}

fn handler_failure(err: ToolError) -> Failure {
    match err {
        ToolError::InvalidArguments(msg) => {
            tracing::warn!(kind = "invalid_arguments", %msg, "tool failed");
            Failure::new(ErrorKind::InvalidArguments, msg)
        }
        ToolError::NotFound(msg) => {
            tracing::warn!(kind = "not_found", %msg, "tool failed");
            Failure::new(ErrorKind::NotFound, msg)
        }
        ToolError::Render(msg) => {
            tracing::warn!(kind = "render_error", %msg, "tool failed");
            Failure::new(ErrorKind::RenderError, msg)
        }
        ToolError::Cancelled => {
            tracing::debug!("handler stopped after its consumer went away");
            Failure::new(ErrorKind::InternalError, "invocation cancelled")
        }
        ToolError::Internal(detail) => internal_failure(&detail),
    }
}

/// Hide the detail from the client behind a reference that is logged with it.
fn internal_failure(detail: &str) -> Failure {
    let reference = uuid::Uuid::new_v4();
    tracing::error!(%reference, detail, "internal tool fault");
    Failure::new(
        ErrorKind::InternalError,
        format!("internal error (ref {reference})"),
    )
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

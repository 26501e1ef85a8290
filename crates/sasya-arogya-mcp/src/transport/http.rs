//! HTTP transport: tool listing, sync calls, SSE streaming and /health.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use serde_json::{json, Value};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tower_http::cors::CorsLayer;

use crate::protocol::{Dispatcher, DEFAULT_STREAM_BUFFER};
use crate::types::{
    ErrorKind, Failure, ServerError, ServerResult, StreamEvent, ToolInvocation, ToolListResult,
    ToolOutcome,
};
use crate::SERVER_NAME;

/// Default cap on concurrently executing tool invocations.
pub const DEFAULT_MAX_CONCURRENT: usize = 64;

#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Deadline for a whole invocation; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Invocations allowed to execute at once, sync and streamed combined.
    pub max_concurrent: usize,
    pub stream_buffer: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }
}

struct AppState {
    dispatcher: Dispatcher,
    timeout: Option<Duration>,
    /// One permit per executing invocation. A streamed invocation keeps its
    /// permit until the final event is written or the client goes away.
    permits: Arc<Semaphore>,
    started_at: Instant,
}

impl AppState {
    async fn admit(&self) -> Result<OwnedSemaphorePermit, Failure> {
        Arc::clone(&self.permits).acquire_owned().await.map_err(|_| {
            Failure::new(ErrorKind::InternalError, "invocation limit closed")
        })
    }
}

/// HTTP transport for remote clients.
pub struct HttpTransport {
    dispatcher: Dispatcher,
    config: HttpConfig,
}

impl HttpTransport {
    pub fn new(dispatcher: Dispatcher, config: HttpConfig) -> Self {
        let dispatcher = dispatcher.with_stream_buffer(config.stream_buffer);
        Self { dispatcher, config }
    }

    pub fn router(&self) -> Router {
        router(self.dispatcher.clone(), &self.config)
    }

    /// Serve until ctrl-c.
    pub async fn run(&self, addr: &str) -> ServerResult<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP transport listening on http://{addr}");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Transport(e.to_string()))?;

        tracing::info!("HTTP transport stopped");
        Ok(())
    }
}

/// Build the router. Both invocation routes draw from one pool of
/// `max_concurrent` permits; listing, `/health` and `/` never wait on it.
pub fn router(dispatcher: Dispatcher, config: &HttpConfig) -> Router {
    let state = Arc::new(AppState {
        dispatcher,
        timeout: config.timeout,
        permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        started_at: Instant::now(),
    });

    Router::new()
        .route("/tools", get(list_tools))
        .route("/tools/call", post(call_tool))
        .route("/tools/call/stream", post(call_tool_stream))
        .route("/health", get(health))
        .route("/", get(root))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn decode_invocation(body: &[u8]) -> Result<ToolInvocation, String> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!("Decode error: {e}");
        e.to_string()
    })
}

fn timeout_failure(limit: Duration) -> Failure {
    Failure::new(
        ErrorKind::Timeout,
        format!("Invocation exceeded {:.1}s", limit.as_secs_f64()),
    )
}

fn outcome_response(outcome: ToolOutcome) -> Response {
    let status =
        StatusCode::from_u16(outcome.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(outcome)).into_response()
}

fn sse_event(event: &StreamEvent) -> Event {
    Event::default()
        .event("outcome")
        .json_data(event)
        .unwrap_or_else(|e| {
            tracing::error!("Failed to encode stream event: {e}");
            Event::default().event("outcome").data("{}")
        })
}

async fn list_tools(State(state): State<Arc<AppState>>) -> Json<ToolListResult> {
    Json(ToolListResult {
        tools: state.dispatcher.registry().definitions(),
    })
}

async fn call_tool(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let invocation = match decode_invocation(&body) {
        Ok(invocation) => invocation,
        Err(message) => {
            return outcome_response(ToolOutcome::failure(ErrorKind::DecodeError, message))
        }
    };

    let _permit = match state.admit().await {
        Ok(permit) => permit,
        Err(failure) => return outcome_response(ToolOutcome::Failure(failure)),
    };

    let outcome = match state.timeout {
        Some(limit) => tokio::time::timeout(limit, state.dispatcher.call(invocation))
            .await
            .unwrap_or_else(|_| {
                tracing::warn!("Invocation timed out after {limit:?}");
                ToolOutcome::Failure(timeout_failure(limit))
            }),
        None => state.dispatcher.call(invocation).await,
    };
    outcome_response(outcome)
}

async fn call_tool_stream(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let decoded = decode_invocation(&body);
    let limit = state.timeout;

    // Dropping this stream (client gone, deadline hit) drops the receiver,
    // which aborts the handler and returns the permit.
    let stream = async_stream::stream! {
        let admitted = match decoded {
            Err(message) => Err(Failure::new(ErrorKind::DecodeError, message)),
            Ok(invocation) => state.admit().await.map(|permit| (invocation, permit)),
        };

        match admitted {
            Err(failure) => {
                yield Ok(sse_event(&StreamEvent::finished(0, Err(failure))));
            }
            Ok((invocation, _permit)) => {
                let deadline = limit.map(|t| tokio::time::Instant::now() + t);
                let mut events = state.dispatcher.stream(invocation);
                let mut next_sequence = 0;
                loop {
                    let received = match (deadline, limit) {
                        (Some(deadline), Some(limit)) => {
                            match tokio::time::timeout_at(deadline, events.recv()).await {
                                Ok(received) => received,
                                Err(_) => {
                                    tracing::warn!("Stream timed out after {limit:?}");
                                    let failure = timeout_failure(limit);
                                    yield Ok(sse_event(&StreamEvent::finished(next_sequence, Err(failure))));
                                    break;
                                }
                            }
                        }
                        _ => events.recv().await,
                    };

                    match received {
                        Some(event) => {
                            next_sequence = event.sequence + 1;
                            let done = event.done;
                            yield Ok(sse_event(&event));
                            if done {
                                break;
                            }
                        }
                        None => {
                            let failure = Failure::new(
                                ErrorKind::InternalError,
                                "stream ended without a final event",
                            );
                            yield Ok(sse_event(&StreamEvent::finished(next_sequence, Err(failure))));
                            break;
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn root(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "name": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "tools": state.dispatcher.registry().len(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}

//! Stdio transport: one JSON request per line on stdin, one JSON response
//! per line on stdout.

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::protocol::Dispatcher;
use crate::types::{
    ErrorKind, ServerError, ServerResult, ToolInvocation, ToolListResult, ToolOutcome,
};

use super::framing::{self, LineRequest, LineResponse};

/// Responses waiting to be written, in request order.
const MAX_IN_FLIGHT: usize = 64;

/// Longest accepted request line, newline excluded.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

enum Pending {
    Ready(LineResponse),
    Running(Option<Value>, JoinHandle<ToolOutcome>),
}

impl Pending {
    /// Stop the invocation behind a response nobody will read.
    fn abort(self) {
        if let Pending::Running(_, handle) = self {
            handle.abort();
        }
    }
}

enum Frame {
    Line,
    Oversized,
    Eof,
}

/// Local channel transport. Invocations run concurrently; responses are
/// written in the order their requests arrived.
pub struct StdioTransport {
    dispatcher: Dispatcher,
    max_frame_bytes: usize,
}

impl StdioTransport {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    pub fn with_max_frame_bytes(mut self, max: usize) -> Self {
        self.max_frame_bytes = max.max(1);
        self
    }

    /// Run over the process's stdin and stdout until EOF.
    pub async fn run(&self) -> ServerResult<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();

        tracing::info!("Stdio transport started");
        self.serve(stdin, stdout).await?;
        tracing::info!("EOF on stdin, shutting down");
        Ok(())
    }

    /// Serve an arbitrary line stream. Returns the writer once every
    /// pending response has been written.
    pub async fn serve<R, W>(&self, mut reader: R, writer: W) -> ServerResult<W>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(MAX_IN_FLIGHT);
        let writer_task = tokio::spawn(write_responses(rx, writer));

        let mut buf = Vec::new();
        loop {
            let pending = match read_frame(&mut reader, &mut buf, self.max_frame_bytes).await? {
                Frame::Eof => break,
                Frame::Oversized => {
                    let message = format!("frame exceeds {} bytes", self.max_frame_bytes);
                    tracing::warn!("Decode error: {message}");
                    decode_failure(None, &ServerError::Decode(message))
                }
                Frame::Line => match std::str::from_utf8(&buf) {
                    Ok(line) if line.trim().is_empty() => continue,
                    Ok(line) => self.handle_line(line),
                    Err(e) => {
                        tracing::warn!("Decode error: {e}");
                        decode_failure(None, &ServerError::Decode(e.to_string()))
                    }
                },
            };

            if let Err(mpsc::error::SendError(rejected)) = tx.send(pending).await {
                // Writer stopped early; its error surfaces below.
                rejected.abort();
                break;
            }
        }

        drop(tx);
        writer_task
            .await
            .map_err(|e| ServerError::Transport(format!("writer task failed: {e}")))?
    }

    fn handle_line(&self, line: &str) -> Pending {
        match framing::parse_request(line) {
            Ok(LineRequest::Invoke {
                id,
                name,
                arguments,
            }) => {
                let dispatcher = self.dispatcher.clone();
                let invocation = ToolInvocation::new(name, arguments);
                Pending::Running(
                    id,
                    tokio::spawn(async move { dispatcher.call(invocation).await }),
                )
            }
            Ok(LineRequest::List { id }) => {
                let tools = ToolListResult {
                    tools: self.dispatcher.registry().definitions(),
                };
                Pending::Ready(LineResponse::new(id, ToolOutcome::success(json!(tools))))
            }
            Ok(LineRequest::Ping { id }) => {
                Pending::Ready(LineResponse::new(id, ToolOutcome::success(json!({}))))
            }
            Err(failure) => {
                tracing::warn!("Decode error: {}", failure.error);
                decode_failure(failure.id, &failure.error)
            }
        }
    }
}

fn decode_failure(id: Option<Value>, error: &ServerError) -> Pending {
    let message = match error {
        ServerError::Decode(msg) => msg.clone(),
        other => other.to_string(),
    };
    Pending::Ready(LineResponse::new(
        id,
        ToolOutcome::failure(ErrorKind::DecodeError, message),
    ))
}

/// Read one newline-terminated frame into `buf`, newline excluded. A frame
/// longer than `max` is consumed to its end but not kept.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>, max: usize) -> std::io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let mut started = false;
    let mut oversized = false;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(match (started, oversized) {
                (false, _) => Frame::Eof,
                (true, true) => Frame::Oversized,
                (true, false) => Frame::Line,
            });
        }
        started = true;

        let (chunk, used, complete) = match available.iter().position(|b| *b == b'\n') {
            Some(end) => (&available[..end], end + 1, true),
            None => (available, available.len(), false),
        };
        if !oversized {
            if buf.len() + chunk.len() > max {
                oversized = true;
                buf.clear();
            } else {
                buf.extend_from_slice(chunk);
            }
        }
        reader.consume(used);

        if complete {
            return Ok(if oversized { Frame::Oversized } else { Frame::Line });
        }
    }
}

async fn write_responses<W>(mut rx: mpsc::Receiver<Pending>, mut writer: W) -> ServerResult<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(pending) = rx.recv().await {
        let response = match pending {
            Pending::Ready(response) => response,
            Pending::Running(id, handle) => {
                let outcome = handle.await.unwrap_or_else(|e| {
                    tracing::error!("invocation task failed: {e}");
                    ToolOutcome::failure(ErrorKind::InternalError, "invocation task failed")
                });
                LineResponse::new(id, outcome)
            }
        };

        if let Err(e) = write_response(&mut writer, &response).await {
            tracing::error!("Failed to write response: {e}");
            abort_queued(&mut rx);
            return Err(e);
        }
    }
    Ok(writer)
}

async fn write_response<W>(writer: &mut W, response: &LineResponse) -> ServerResult<()>
where
    W: AsyncWrite + Unpin,
{
    let framed = framing::frame_response(response)?;
    writer.write_all(framed.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Refuse further responses and abort every queued invocation.
fn abort_queued(rx: &mut mpsc::Receiver<Pending>) {
    rx.close();
    while let Ok(pending) = rx.try_recv() {
        pending.abort();
    }
}

//! Progress reporting handed to tool handlers.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, Mutex};

use crate::types::{Failure, StreamEvent, ToolError};

struct Channel {
    tx: mpsc::Sender<StreamEvent>,
    next_sequence: Mutex<u64>,
}

/// Emits intermediate values of a streamed invocation.
///
/// In sync mode the reporter discards everything. In stream mode every
/// emitted value becomes a `StreamEvent`; the sequence advances only after a
/// successful send, so delivered events never skip a number.
#[derive(Clone, Default)]
pub struct Progress {
    channel: Option<Arc<Channel>>,
}

impl Progress {
    pub fn discard() -> Self {
        Self { channel: None }
    }

    pub(crate) fn channel(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            channel: Some(Arc::new(Channel {
                tx,
                next_sequence: Mutex::new(0),
            })),
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.channel.is_some()
    }

    /// Emit one partial value. Fails with `Cancelled` once the consumer is gone.
    pub async fn emit(&self, partial: Value) -> Result<(), ToolError> {
        let Some(channel) = &self.channel else {
            return Ok(());
        };
        let mut sequence = channel.next_sequence.lock().await;
        channel
            .tx
            .send(StreamEvent::progress(*sequence, partial))
            .await
            .map_err(|_| ToolError::Cancelled)?;
        *sequence += 1;
        Ok(())
    }

    /// Send the terminal event. Returns false if the consumer is gone.
    pub(crate) async fn finish(&self, result: Result<Value, Failure>) -> bool {
        let Some(channel) = &self.channel else {
            return false;
        };
        let mut sequence = channel.next_sequence.lock().await;
        let sent = channel
            .tx
            .send(StreamEvent::finished(*sequence, result))
            .await
            .is_ok();
        if sent {
            *sequence += 1;
        }
        sent
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("streaming", &self.is_streaming())
            .finish()
    }
}

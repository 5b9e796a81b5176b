//! Write sink for one downstream stream.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::response::sse::Event;
use tokio::sync::mpsc;

/// A frame queued for a downstream SSE stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// `endpoint` event carrying the upstream URL for this session.
    Endpoint(String),
    /// `message` event carrying a serialized JSON-RPC message.
    Message(String),
    /// Comment frame that keeps intermediaries from idling the stream out.
    Ping,
}

impl Frame {
    /// Render as an SSE event.
    pub fn into_event(self) -> Event {
        match self {
            Self::Endpoint(url) => Event::default().event("endpoint").data(url),
            Self::Message(json) => Event::default().event("message").data(json),
            Self::Ping => Event::default().comment("ping"),
        }
    }
}

/// Why a frame could not be queued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PushError {
    /// The outbound queue is at capacity.
    #[error("send queue full")]
    Full,
    /// The downstream stream is gone.
    #[error("downstream closed")]
    Closed,
}

/// Handle that pushes frames to exactly one downstream connection.
pub struct SessionHandle {
    tx: mpsc::Sender<Frame>,
    dropped_frames: AtomicU64,
}

impl SessionHandle {
    /// Create a handle and the receiving end consumed by the SSE body.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            tx,
            dropped_frames: AtomicU64::new(0),
        };
        (handle, rx)
    }

    /// Queue a frame, waiting for room if the queue is full.
    pub async fn push(&self, frame: Frame) -> Result<(), PushError> {
        self.tx.send(frame).await.map_err(|_| PushError::Closed)
    }

    /// Queue a frame without waiting.
    pub fn try_push(&self, frame: Frame) -> Result<(), PushError> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                let _ = self.dropped_frames.fetch_add(1, Ordering::Relaxed);
                PushError::Full
            }
            mpsc::error::TrySendError::Closed(_) => PushError::Closed,
        })
    }

    /// Whether the downstream receiver has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Frames dropped because the queue was full.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("closed", &self.is_closed())
            .field("dropped_frames", &self.dropped_frames())
            .finish()
    }
}

//! Frame stream backing an SSE response body.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use super::handle::Frame;
use super::lifecycle::{ConnectionGuard, ConnectionLifecycle};

/// Yields the frames queued for one session.
///
/// Holds the connection's [`ConnectionGuard`], so dropping the stream closes
/// the session.
pub struct SessionStream {
    rx: mpsc::Receiver<Frame>,
    guard: ConnectionGuard,
}

impl SessionStream {
    /// Wrap the receiver returned by [`ConnectionLifecycle::open`].
    pub fn new(rx: mpsc::Receiver<Frame>, lifecycle: Arc<ConnectionLifecycle>) -> Self {
        Self {
            rx,
            guard: ConnectionGuard::new(lifecycle),
        }
    }
}

impl Stream for SessionStream {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        self.rx.poll_recv(cx)
    }
}

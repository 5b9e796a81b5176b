//! Periodic keep-alive comments on a downstream stream.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::handle::{Frame, PushError, SessionHandle};

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// A ping could not be written; the downstream stream is gone.
    WriteFailed,
    /// The heartbeat was cancelled by its owner.
    Cancelled,
}

/// Write a ping frame every `interval` until cancelled or the handle closes.
///
/// The first ping goes out one full `interval` after start. A full queue
/// skips the ping (the stream is not idle); a closed queue ends the loop.
pub async fn run_heartbeat(
    handle: Arc<SessionHandle>,
    interval: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return HeartbeatResult::Cancelled,
            _ = ticker.tick() => {
                if cancel.is_cancelled() {
                    return HeartbeatResult::Cancelled;
                }
                match handle.try_push(Frame::Ping) {
                    Ok(()) => {
                        counter!("sse_heartbeats_total").increment(1);
                        trace!("sent heartbeat");
                    }
                    Err(PushError::Full) => trace!("send queue full, heartbeat skipped"),
                    Err(PushError::Closed) => return HeartbeatResult::WriteFailed,
                }
            }
        }
    }
}

/// A running heartbeat owned by one connection.
pub struct HeartbeatTask {
    cancel: CancellationToken,
    cancelled: AtomicBool,
    task: JoinHandle<HeartbeatResult>,
}

impl HeartbeatTask {
    /// Spawn the heartbeat loop. `on_exit` runs with the loop's result.
    pub fn spawn<F>(
        handle: Arc<SessionHandle>,
        interval: Duration,
        cancel: CancellationToken,
        on_exit: F,
    ) -> Self
    where
        F: FnOnce(HeartbeatResult) + Send + 'static,
    {
        let loop_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let result = run_heartbeat(handle, interval, loop_cancel).await;
            on_exit(result);
            result
        });
        Self {
            cancel,
            cancelled: AtomicBool::new(false),
            task,
        }
    }

    /// Stop the heartbeat.
    ///
    /// Returns `true` only for the call that actually cancelled; later calls
    /// are no-ops.
    pub fn cancel(&self) -> bool {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.cancel.cancel();
        true
    }

    /// Whether the heartbeat has been cancelled (by its owner or a parent token).
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for HeartbeatTask {
    fn drop(&mut self) {
        let _ = self.cancel();
    }
}

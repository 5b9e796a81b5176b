//! Per-connection lifecycle: `Connecting → Open → Closed`.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use hash_core::ids::SessionId;
use metrics::{counter, gauge, histogram};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::handle::{Frame, SessionHandle};
use super::heartbeat::{HeartbeatResult, HeartbeatTask};
use super::registry::{RegistryError, SessionRegistry};

/// Lifecycle state of one downstream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport accepted, session not yet registered.
    Connecting,
    /// Registered and heartbeating.
    Open,
    /// Torn down. Terminal.
    Closed,
}

/// Tunables for a connection.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleOptions {
    /// Period between heartbeat pings.
    pub heartbeat_interval: Duration,
    /// Capacity of the outbound frame queue.
    pub send_queue_capacity: usize,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            send_queue_capacity: 256,
        }
    }
}

/// Owns one session from registration to teardown.
///
/// Teardown cancels the heartbeat and removes the registry entry; it runs
/// at most once however many times [`close`](Self::close) is called.
pub struct ConnectionLifecycle {
    id: SessionId,
    handle: Arc<SessionHandle>,
    registry: Arc<SessionRegistry>,
    state: Mutex<ConnectionState>,
    heartbeat: Mutex<Option<HeartbeatTask>>,
    opened_at: Instant,
}

impl ConnectionLifecycle {
    /// Establish a session for a newly accepted downstream connection.
    ///
    /// Mints an id, registers it, and starts the heartbeat. The heartbeat
    /// token is a child of `parent` so server shutdown stops it too.
    /// Returns the lifecycle and the frame receiver that feeds the stream.
    pub fn open(
        registry: Arc<SessionRegistry>,
        options: LifecycleOptions,
        parent: &CancellationToken,
    ) -> Result<(Arc<Self>, mpsc::Receiver<Frame>), RegistryError> {
        Self::open_with_id(SessionId::new(), registry, options, parent)
    }

    /// [`open`](Self::open) with a caller-chosen id.
    pub fn open_with_id(
        id: SessionId,
        registry: Arc<SessionRegistry>,
        options: LifecycleOptions,
        parent: &CancellationToken,
    ) -> Result<(Arc<Self>, mpsc::Receiver<Frame>), RegistryError> {
        let (handle, rx) = SessionHandle::channel(options.send_queue_capacity);
        let handle = Arc::new(handle);

        // Register before the lifecycle exists: a rejected id must not be
        // torn down by this connection's drop.
        let _ = registry.register(id.clone(), Arc::clone(&handle))?;

        let lifecycle = Arc::new(Self {
            id: id.clone(),
            handle: Arc::clone(&handle),
            registry,
            state: Mutex::new(ConnectionState::Connecting),
            heartbeat: Mutex::new(None),
            opened_at: Instant::now(),
        });

        let weak: Weak<Self> = Arc::downgrade(&lifecycle);
        let heartbeat = HeartbeatTask::spawn(
            handle,
            options.heartbeat_interval,
            parent.child_token(),
            move |result| {
                if result == HeartbeatResult::WriteFailed {
                    if let Some(lifecycle) = weak.upgrade() {
                        debug!(session_id = %lifecycle.id, "heartbeat write failed");
                        let _ = lifecycle.close();
                    }
                }
            },
        );
        *lifecycle.heartbeat.lock() = Some(heartbeat);
        *lifecycle.state.lock() = ConnectionState::Open;

        info!(session_id = %id, "session opened");
        counter!("sse_connections_total").increment(1);
        gauge!("sse_connections_active").increment(1.0);

        Ok((lifecycle, rx))
    }

    /// Session id.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Write sink for this connection.
    pub fn handle(&self) -> &Arc<SessionHandle> {
        &self.handle
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Tear the connection down.
    ///
    /// Cancels the heartbeat, then removes the registry entry. Returns
    /// `false` if the connection was already closed.
    pub fn close(&self) -> bool {
        {
            let mut state = self.state.lock();
            if *state == ConnectionState::Closed {
                return false;
            }
            *state = ConnectionState::Closed;
        }

        if let Some(heartbeat) = self.heartbeat.lock().take() {
            let _ = heartbeat.cancel();
        }
        let _ = self.registry.remove(&self.id);

        let lifetime = self.opened_at.elapsed();
        info!(
            session_id = %self.id,
            duration_secs = lifetime.as_secs_f64(),
            dropped_frames = self.handle.dropped_frames(),
            "session closed"
        );
        counter!("sse_disconnections_total").increment(1);
        gauge!("sse_connections_active").decrement(1.0);
        histogram!("sse_connection_duration_seconds").record(lifetime.as_secs_f64());
        true
    }
}

impl std::fmt::Debug for ConnectionLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionLifecycle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for ConnectionLifecycle {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Closes its connection when dropped.
///
/// Owned by the SSE response body, so dropping the body (client went away,
/// stream ended, server shut down) tears the session down.
pub struct ConnectionGuard(Arc<ConnectionLifecycle>);

impl ConnectionGuard {
    /// Guard `lifecycle`.
    pub fn new(lifecycle: Arc<ConnectionLifecycle>) -> Self {
        Self(lifecycle)
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let _ = self.0.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tokio::time;

    fn options() -> LifecycleOptions {
        LifecycleOptions {
            heartbeat_interval: Duration::from_secs(30),
            send_queue_capacity: 16,
        }
    }

    #[tokio::test]
    async fn open_registers_session() {
        let registry = Arc::new(SessionRegistry::new());
        let (conn, _rx) =
            ConnectionLifecycle::open(Arc::clone(&registry), options(), &CancellationToken::new())
                .unwrap();

        assert_eq!(conn.state(), ConnectionState::Open);
        assert_eq!(registry.size(), 1);
        let session = registry.lookup(conn.id()).unwrap();
        assert!(Arc::ptr_eq(&session.handle, conn.handle()));
    }

    #[tokio::test]
    async fn close_removes_session_and_is_idempotent() {
        let registry = Arc::new(SessionRegistry::new());
        let (conn, _rx) =
            ConnectionLifecycle::open(Arc::clone(&registry), options(), &CancellationToken::new())
                .unwrap();

        assert!(conn.close());
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(registry.size(), 0);
        assert!(registry.lookup(conn.id()).is_none());

        assert!(!conn.close());
        assert_eq!(registry.size(), 0);
    }

    #[tokio::test]
    async fn duplicate_id_fails_without_disturbing_existing() {
        let registry = Arc::new(SessionRegistry::new());
        let token = CancellationToken::new();
        let id = SessionId::from_raw("abc123");
        let (first, _rx) =
            ConnectionLifecycle::open_with_id(id.clone(), Arc::clone(&registry), options(), &token)
                .unwrap();

        let second =
            ConnectionLifecycle::open_with_id(id.clone(), Arc::clone(&registry), options(), &token);
        assert_matches!(second, Err(RegistryError::DuplicateSession(_)));
        assert_eq!(registry.size(), 1);
        assert!(Arc::ptr_eq(&registry.lookup(&id).unwrap().handle, first.handle()));
    }

    #[tokio::test]
    async fn debug_shows_id_and_state() {
        let registry = Arc::new(SessionRegistry::new());
        let (conn, _rx) = ConnectionLifecycle::open_with_id(
            SessionId::from_raw("dbg1"),
            registry,
            options(),
            &CancellationToken::new(),
        )
        .unwrap();
        let text = format!("{conn:?}");
        assert!(text.contains("dbg1"), "{text}");
        assert!(text.contains("Open"), "{text}");
    }

    #[tokio::test]
    async fn guard_drop_closes() {
        let registry = Arc::new(SessionRegistry::new());
        let (conn, _rx) =
            ConnectionLifecycle::open(Arc::clone(&registry), options(), &CancellationToken::new())
                .unwrap();
        let guard = ConnectionGuard::new(Arc::clone(&conn));
        drop(guard);
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(registry.size(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_runs_while_open_and_stops_after_close() {
        let registry = Arc::new(SessionRegistry::new());
        let (conn, mut rx) =
            ConnectionLifecycle::open(Arc::clone(&registry), options(), &CancellationToken::new())
                .unwrap();

        time::sleep(Duration::from_secs(31)).await;
        assert_eq!(rx.try_recv(), Ok(Frame::Ping));
        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(rx.try_recv(), Ok(Frame::Ping));

        assert!(conn.close());
        time::sleep(Duration::from_secs(120)).await;
        assert!(rx.try_recv().is_err(), "no heartbeat after teardown");
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_write_failure_closes() {
        let registry = Arc::new(SessionRegistry::new());
        let (conn, rx) =
            ConnectionLifecycle::open(Arc::clone(&registry), options(), &CancellationToken::new())
                .unwrap();
        drop(rx);

        time::sleep(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(registry.size(), 0);
    }

    #[tokio::test]
    async fn connections_are_independent() {
        let registry = Arc::new(SessionRegistry::new());
        let token = CancellationToken::new();
        let (a, _rx_a) = ConnectionLifecycle::open(Arc::clone(&registry), options(), &token).unwrap();
        let (b, _rx_b) = ConnectionLifecycle::open(Arc::clone(&registry), options(), &token).unwrap();
        assert_eq!(registry.size(), 2);

        assert!(a.close());
        assert_eq!(registry.size(), 1);
        assert!(registry.lookup(a.id()).is_none());
        assert!(registry.lookup(b.id()).is_some());
        assert_eq!(b.state(), ConnectionState::Open);
    }
}

//! Concurrent map from session id to downstream handle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use hash_core::ids::SessionId;

use super::handle::SessionHandle;

/// Registry errors.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// An entry with this id is already live.
    #[error("session already registered: {0}")]
    DuplicateSession(SessionId),
}

/// One live downstream stream.
#[derive(Debug)]
pub struct Session {
    /// Session id.
    pub id: SessionId,
    /// Write sink for the stream.
    pub handle: Arc<SessionHandle>,
    /// When the session was registered.
    pub created_at: DateTime<Utc>,
}

/// Registry of live sessions.
///
/// Holds exactly one entry per open downstream connection.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Session>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `handle` under `id`.
    ///
    /// An id that is already live is rejected and the existing entry is left
    /// untouched.
    pub fn register(
        &self,
        id: SessionId,
        handle: Arc<SessionHandle>,
    ) -> Result<Arc<Session>, RegistryError> {
        match self.sessions.entry(id.clone()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateSession(id)),
            Entry::Vacant(slot) => {
                let session = Arc::new(Session {
                    id,
                    handle,
                    created_at: Utc::now(),
                });
                let _ = slot.insert(Arc::clone(&session));
                Ok(session)
            }
        }
    }

    /// Look up a live session.
    pub fn lookup(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove a session. Returns whether an entry was present.
    pub fn remove(&self, id: &SessionId) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Number of live sessions.
    pub fn size(&self) -> usize {
        self.sessions.len()
    }

    /// Ids of all live sessions.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }
}

//! Session storage.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::SessionResult;
use crate::state::{SessionId, SessionState};

/// Storage for [`SessionState`] keyed by [`SessionId`].
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the stored state, or an empty state for unknown sessions.
    async fn get(&self, id: &SessionId) -> SessionResult<SessionState>;

    /// Replaces the stored state.
    async fn put(&self, id: &SessionId, state: SessionState) -> SessionResult<()>;

    /// Forgets the session.
    async fn destroy(&self, id: &SessionId) -> SessionResult<()>;
}

/// Process-local session store.
///
/// A session that has not been read or written for longer than the idle
/// timeout reads back empty. Expired entries are swept on every write, so abandoned
/// sessions do not accumulate.
#[derive(Debug, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Entry>>>,
    idle_timeout: Duration,
}

#[derive(Debug)]
struct Entry {
    state: SessionState,
    touched: Instant,
}

impl Entry {
    fn is_expired(&self, idle_timeout: Duration) -> bool {
        self.touched.elapsed() > idle_timeout
    }
}

impl InMemorySessionStore {
    /// Idle timeout used by [`InMemorySessionStore::new`]: 30 minutes.
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

    /// Creates an empty store with the default idle timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_idle_timeout(Self::DEFAULT_IDLE_TIMEOUT)
    }

    /// Creates an empty store whose sessions expire after `idle_timeout`
    /// without access.
    #[must_use]
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Returns the idle timeout.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Number of stored sessions, expired ones included until the next sweep.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns true if no session is stored.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drops every expired session and returns how many were removed.
    pub async fn remove_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        self.sweep(&mut sessions)
    }

    fn sweep(&self, sessions: &mut HashMap<SessionId, Entry>) -> usize {
        let initial_len = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(self.idle_timeout));
        let removed = initial_len - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, "Expired sessions swept");
        }
        removed
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &SessionId) -> SessionResult<SessionState> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(entry) if !entry.is_expired(self.idle_timeout) => {
                entry.touched = Instant::now();
                Ok(entry.state.clone())
            }
            _ => Ok(SessionState::default()),
        }
    }

    async fn put(&self, id: &SessionId, state: SessionState) -> SessionResult<()> {
        let mut sessions = self.sessions.write().await;
        self.sweep(&mut sessions);
        if state.is_empty() {
            sessions.remove(id);
        } else {
            sessions.insert(
                *id,
                Entry {
                    state,
                    touched: Instant::now(),
                },
            );
        }
        Ok(())
    }

    async fn destroy(&self, id: &SessionId) -> SessionResult<()> {
        self.sessions.write().await.remove(id);
        tracing::debug!(session = %id, "Session destroyed");
        Ok(())
    }
}

//! Connection pool: tracks all active connections indexed by session.

use std::sync::Arc;

use dashmap::DashMap;

use slotgate_core::types::id::SessionId;

use super::handle::ConnectionHandle;

/// Thread-safe pool of all active WebSocket connections.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    by_session: DashMap<SessionId, Arc<ConnectionHandle>>,
}

impl ConnectionPool {
    /// Creates a new empty connection pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to the pool.
    pub fn add(&self, handle: Arc<ConnectionHandle>) {
        self.by_session.insert(handle.session_id, handle);
    }

    /// Removes a connection from the pool.
    pub fn remove(&self, session_id: &SessionId) -> Option<Arc<ConnectionHandle>> {
        self.by_session.remove(session_id).map(|(_, handle)| handle)
    }

    /// Gets the connection for a session.
    pub fn get(&self, session_id: &SessionId) -> Option<Arc<ConnectionHandle>> {
        self.by_session
            .get(session_id)
            .map(|entry| entry.value().clone())
    }

    /// Returns total number of active connections.
    pub fn connection_count(&self) -> usize {
        self.by_session.len()
    }

    /// Returns all connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_session
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

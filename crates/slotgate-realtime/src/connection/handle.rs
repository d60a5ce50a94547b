//! Individual WebSocket connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};
use tracing::warn;

use slotgate_core::types::id::SessionId;

/// A handle to a single WebSocket connection.
///
/// A session lives exactly as long as its connection, so the session id
/// doubles as the connection id.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Session this connection carries.
    pub session_id: SessionId,
    /// Advisory client description (user agent).
    pub browser_info: Option<String>,
    /// Sender for serialized outbound frames.
    sender: mpsc::Sender<String>,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    /// Last pong received.
    last_pong: RwLock<DateTime<Utc>>,
    /// Whether the connection is still alive.
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new connection handle.
    pub fn new(
        session_id: SessionId,
        browser_info: Option<String>,
        sender: mpsc::Sender<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            browser_info,
            sender,
            connected_at: now,
            last_pong: RwLock::new(now),
            alive: AtomicBool::new(true),
        }
    }

    /// Queue a frame for this connection without waiting.
    ///
    /// Returns `false` if the frame was dropped.
    pub fn send(&self, frame: String) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(session_id = %self.session_id, "Send buffer full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if connection is alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead.
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Record a pong response.
    pub async fn record_pong(&self) {
        *self.last_pong.write().await = Utc::now();
    }

    /// When the last pong arrived.
    pub async fn last_pong(&self) -> DateTime<Utc> {
        *self.last_pong.read().await
    }

    /// Get a snapshot of connection info.
    pub async fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            session_id: self.session_id,
            browser_info: self.browser_info.clone(),
            connected_at: self.connected_at,
            last_pong: self.last_pong().await,
            alive: self.is_alive(),
        }
    }
}

/// Snapshot of connection info (serializable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Session ID.
    pub session_id: SessionId,
    /// Client description.
    pub browser_info: Option<String>,
    /// Connected at.
    pub connected_at: DateTime<Utc>,
    /// Last pong.
    pub last_pong: DateTime<Utc>,
    /// Is alive.
    pub alive: bool,
}

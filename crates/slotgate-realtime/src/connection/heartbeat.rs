//! Ping/pong heartbeat for WebSocket keepalive.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time;
use tracing::{debug, warn};

use slotgate_core::config::RealtimeConfig;

use super::handle::ConnectionHandle;
use crate::message::types::OutboundMessage;

/// Heartbeat configuration.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    /// Interval between pings.
    pub ping_interval: Duration,
    /// Silence after which the connection is considered dead.
    pub ping_timeout: Duration,
}

impl From<&RealtimeConfig> for HeartbeatConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            ping_interval: Duration::from_secs(config.ping_interval_seconds.max(1)),
            ping_timeout: Duration::from_secs(config.ping_timeout_seconds.max(1)),
        }
    }
}

/// Run the heartbeat loop for a connection.
///
/// Returns once the connection is dead: either the send side closed or no
/// pong arrived within the timeout. The caller treats that as a disconnect.
pub async fn run_heartbeat(handle: Arc<ConnectionHandle>, config: HeartbeatConfig) {
    let mut interval = time::interval(config.ping_interval);

    loop {
        interval.tick().await;

        if !handle.is_alive() {
            break;
        }

        let silence = Utc::now() - handle.last_pong().await;
        if let Ok(silence) = silence.to_std() {
            if silence > config.ping_timeout {
                warn!(
                    session_id = %handle.session_id,
                    silence_seconds = silence.as_secs(),
                    "Heartbeat timeout"
                );
                handle.mark_dead();
                break;
            }
        }

        let frame = match OutboundMessage::ping().to_json() {
            Ok(frame) => frame,
            Err(_) => continue,
        };
        if !handle.send(frame) && !handle.is_alive() {
            debug!(session_id = %handle.session_id, "Ping send failed");
            break;
        }
    }

    debug!(session_id = %handle.session_id, "Heartbeat loop ended");
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use slotgate_core::types::id::SessionId;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_loop_pings_until_connection_dies() {
        let (tx, mut rx) = mpsc::channel(16);
        let handle = Arc::new(ConnectionHandle::new(SessionId::new(), None, tx));
        let config = HeartbeatConfig {
            ping_interval: Duration::from_millis(10),
            ping_timeout: Duration::from_millis(25),
        };

        let task = tokio::spawn(run_heartbeat(handle.clone(), config));
        time::advance(Duration::from_millis(15)).await;
        let ping = rx.recv().await.unwrap();
        assert!(ping.contains("\"ping\""));

        handle.mark_dead();
        time::advance(Duration::from_millis(15)).await;
        task.await.unwrap();
        assert!(!handle.is_alive());
    }
}

//! Inbound and outbound WebSocket message type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use slotgate_core::events::{BroadcastEvent, SessionNotice};
use slotgate_core::types::id::{EventId, ReservationId};

/// Messages sent by the client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Place a temporary hold on an event.
    Reserve {
        /// Event to hold.
        event_id: EventId,
    },
    /// Confirm a temporary hold.
    Confirm {
        /// Hold to confirm.
        reservation_id: ReservationId,
        /// Holder name.
        holder_name: String,
        /// Holder contact.
        holder_contact: String,
    },
    /// Release a temporary hold.
    Cancel {
        /// Hold to release.
        reservation_id: ReservationId,
    },
    /// Pong response to server ping.
    Pong {
        /// Echoed timestamp.
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },
}

/// Transport-level messages that do not come from business logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Number of open connections.
    OnlineUsers {
        /// Connection count.
        count: usize,
    },
    /// Keepalive ping.
    Ping {
        /// Server time.
        timestamp: DateTime<Utc>,
    },
    /// Malformed request.
    Error {
        /// Machine-readable code.
        code: String,
        /// Human-readable message.
        message: String,
    },
}

/// Messages sent by the server to the client.
///
/// Every variant serializes to a flat object carrying a `type` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    /// A notice for this session only.
    Notice(SessionNotice),
    /// A state change every session sees.
    Broadcast(BroadcastEvent),
    /// Transport control.
    Control(ControlMessage),
}

impl OutboundMessage {
    /// Build a ping stamped with the current time.
    pub fn ping() -> Self {
        Self::Control(ControlMessage::Ping {
            timestamp: Utc::now(),
        })
    }

    /// Build an error reply.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Control(ControlMessage::Error {
            code: code.into(),
            message: message.into(),
        })
    }

    /// Build an online-users update.
    pub fn online_users(count: usize) -> Self {
        Self::Control(ControlMessage::OnlineUsers { count })
    }

    /// Serialize to the JSON text frame payload.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

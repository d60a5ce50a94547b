//! Notices emitted by Slotgate operations.
//!
//! Every notice is addressed: either to a single session
//! ([`SessionNotice`]) or to every connected session ([`BroadcastEvent`]).
//! Both travel through the notification queue and are consumed by the
//! real-time engine.

pub mod broadcast;
pub mod session;

use serde::{Deserialize, Serialize};

pub use broadcast::{ActiveSessionView, BroadcastEvent};
pub use session::{RejectionReason, SessionNotice};

use crate::types::id::SessionId;

/// A notice together with its audience.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "audience", rename_all = "snake_case")]
pub enum Outbound {
    /// Delivered to one session only.
    Session {
        /// Addressee.
        session_id: SessionId,
        /// Notice payload.
        notice: SessionNotice,
    },
    /// Delivered to every connected session.
    Broadcast {
        /// Event payload.
        event: BroadcastEvent,
    },
}

impl Outbound {
    /// Address a notice to one session.
    pub fn to_session(session_id: SessionId, notice: SessionNotice) -> Self {
        Self::Session { session_id, notice }
    }

    /// Address an event to everyone.
    pub fn broadcast(event: BroadcastEvent) -> Self {
        Self::Broadcast { event }
    }
}

//! Admission queue coordinator.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use slotgate_core::events::{BroadcastEvent, SessionNotice};
use slotgate_core::types::id::SessionId;
use slotgate_core::types::settings::AdmissionSettings;

use super::state::{AdmissionState, Placement, Removed};
use crate::notify::NotificationPublisher;

/// Sizes of the two admission sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdmissionCounts {
    /// Admitted sessions.
    pub active: usize,
    /// Waiting sessions.
    pub waiting: usize,
}

/// Result of requeueing a session whose choice window lapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requeued {
    /// Where the session is now.
    pub placement: Placement,
    /// Sessions admitted into the freed slot(s).
    pub promoted: Vec<SessionId>,
}

/// Result of a queue purge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Sessions dropped for waiting too long.
    pub dropped: Vec<SessionId>,
    /// Sessions admitted afterwards.
    pub promoted: Vec<SessionId>,
}

/// Owns the admission structures and the one lock that guards them.
///
/// Every method takes the settings snapshot for this decision and the
/// current time explicitly. The lock is held only for in-memory work and
/// for enqueueing notices (which never blocks); no persistence call ever
/// happens under it. Notices and the status snapshot for a change are
/// published before the lock is released, so the outbound queue sees
/// changes in exactly the order they were applied.
#[derive(Debug)]
pub struct AdmissionCoordinator {
    state: Mutex<AdmissionState>,
    publisher: NotificationPublisher,
}

impl AdmissionCoordinator {
    /// Create an empty coordinator.
    pub fn new(publisher: NotificationPublisher) -> Self {
        Self {
            state: Mutex::new(AdmissionState::new()),
            publisher,
        }
    }

    /// Admit a session or place it at the tail of the queue.
    ///
    /// Stale queue entries are purged first. Admitting a session that is
    /// already known returns its current placement unchanged.
    pub async fn admit(
        &self,
        session_id: SessionId,
        browser_info: Option<String>,
        settings: &AdmissionSettings,
        now: DateTime<Utc>,
    ) -> Placement {
        let mut state = self.state.lock().await;

        let dropped = state.purge_expired(settings, now);
        self.notify_dropped(&dropped);

        let (placement, promoted) = state.admit(session_id, settings, now);
        if let Some(info) = browser_info {
            state.set_browser_info(session_id, info);
        }
        self.notify_promoted(&promoted, settings);

        match placement {
            Placement::Admitted { .. } => {
                info!(
                    session_id = %session_id,
                    active = state.active_len(),
                    max = settings.max_active_sessions,
                    "Session admitted"
                );
                self.notify_admitted(session_id, settings);
            }
            Placement::Queued {
                position,
                time_remaining_seconds,
            } => {
                info!(
                    session_id = %session_id,
                    position,
                    waiting = state.waiting_len(),
                    "Session queued"
                );
                self.publisher.to_session(
                    session_id,
                    SessionNotice::Queued {
                        position,
                        time_remaining_seconds,
                    },
                );
            }
        }

        self.publisher.broadcast(state.snapshot(settings, now));
        placement
    }

    /// Remove a session from whichever set it occupies.
    ///
    /// Idempotent: releasing an unknown session does nothing. When an active
    /// session leaves and `settings` is available, queue heads are promoted
    /// into the freed capacity and returned. Without settings the queue is
    /// left for the next sweep to advance.
    pub async fn release(
        &self,
        session_id: SessionId,
        settings: Option<&AdmissionSettings>,
        now: DateTime<Utc>,
    ) -> Vec<SessionId> {
        let mut state = self.state.lock().await;

        let removed = state.remove(&session_id);
        if removed == Removed::Absent {
            debug!(session_id = %session_id, "Release of unknown session ignored");
            return Vec::new();
        }

        let promoted = match settings {
            Some(settings) => {
                let promoted = state.advance(settings, now);
                self.notify_promoted(&promoted, settings);
                promoted
            }
            None => Vec::new(),
        };

        info!(
            session_id = %session_id,
            was_active = removed == Removed::Active,
            promoted = promoted.len(),
            "Session released"
        );

        if let Some(settings) = settings {
            self.publisher.broadcast(state.snapshot(settings, now));
        }
        promoted
    }

    /// Move an active session to the tail of the queue and refill the slot.
    ///
    /// Returns `None` if the session was no longer active.
    pub async fn requeue_at_tail(
        &self,
        session_id: SessionId,
        settings: &AdmissionSettings,
        now: DateTime<Utc>,
    ) -> Option<Requeued> {
        let mut state = self.state.lock().await;

        if !state.move_to_tail(session_id, now) {
            return None;
        }

        let promoted = state.advance(settings, now);
        let placement = state.placement(&session_id, settings, now)?;
        if let Placement::Queued {
            position,
            time_remaining_seconds,
        } = placement
        {
            self.publisher.to_session(
                session_id,
                SessionNotice::RequeuedToTail {
                    position,
                    time_remaining_seconds,
                },
            );
        }
        self.notify_promoted(&promoted, settings);

        info!(
            session_id = %session_id,
            browser = state.browser_info(&session_id).unwrap_or("unknown"),
            promoted = promoted.len(),
            "Choice window lapsed, session requeued at tail"
        );

        self.publisher.broadcast(state.snapshot(settings, now));
        Some(Requeued {
            placement,
            promoted,
        })
    }

    /// Drop queue entries older than the queue timeout and refill capacity.
    pub async fn purge_expired(&self, settings: &AdmissionSettings, now: DateTime<Utc>) -> PurgeReport {
        let mut state = self.state.lock().await;

        let dropped = state.purge_expired(settings, now);
        self.notify_dropped(&dropped);
        let promoted = state.advance(settings, now);
        self.notify_promoted(&promoted, settings);

        if !dropped.is_empty() || !promoted.is_empty() {
            self.publisher.broadcast(state.snapshot(settings, now));
        }
        PurgeReport { dropped, promoted }
    }

    /// Active sessions whose choice window has lapsed.
    pub async fn lapsed_choices(&self, now: DateTime<Utc>) -> Vec<SessionId> {
        self.state.lock().await.lapsed_choices(now)
    }

    /// 1-based queue position of a waiting session.
    pub async fn position(&self, session_id: &SessionId) -> Option<usize> {
        self.state.lock().await.position(session_id)
    }

    /// Whether the session is currently admitted.
    pub async fn is_active(&self, session_id: &SessionId) -> bool {
        self.state.lock().await.is_active(session_id)
    }

    /// Current placement of a session.
    pub async fn placement(
        &self,
        session_id: &SessionId,
        settings: &AdmissionSettings,
        now: DateTime<Utc>,
    ) -> Option<Placement> {
        self.state.lock().await.placement(session_id, settings, now)
    }

    /// Build a fresh status snapshot without publishing it.
    pub async fn snapshot(&self, settings: &AdmissionSettings, now: DateTime<Utc>) -> BroadcastEvent {
        self.state.lock().await.snapshot(settings, now)
    }

    /// Sizes of the active set and the queue.
    pub async fn counts(&self) -> AdmissionCounts {
        let state = self.state.lock().await;
        AdmissionCounts {
            active: state.active_len(),
            waiting: state.waiting_len(),
        }
    }

    fn notify_admitted(&self, session_id: SessionId, settings: &AdmissionSettings) {
        self.publisher.to_session(session_id, SessionNotice::Admitted);
        self.publisher.to_session(
            session_id,
            SessionNotice::ChoiceTimerStart {
                seconds: settings.choice_timeout_seconds,
            },
        );
    }

    fn notify_promoted(&self, promoted: &[SessionId], settings: &AdmissionSettings) {
        for session_id in promoted {
            info!(session_id = %session_id, "Queued session promoted");
            self.notify_admitted(*session_id, settings);
        }
    }

    fn notify_dropped(&self, dropped: &[SessionId]) {
        for session_id in dropped {
            warn!(session_id = %session_id, "Queue timeout elapsed, session dropped");
            self.publisher
                .to_session(*session_id, SessionNotice::QueueTimedOut);
        }
    }
}

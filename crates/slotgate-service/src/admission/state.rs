//! In-memory admission structures.
//!
//! Everything here is synchronous and lock-free by itself; the coordinator
//! owns the only instance behind its mutex.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;

use slotgate_core::events::{ActiveSessionView, BroadcastEvent};
use slotgate_core::types::id::SessionId;
use slotgate_core::types::settings::AdmissionSettings;

/// Where a session ended up after an admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "placement", rename_all = "snake_case")]
pub enum Placement {
    /// In the active set.
    Admitted {
        /// End of the session's choice window.
        choice_deadline: DateTime<Utc>,
    },
    /// In the waiting queue.
    Queued {
        /// 1-based position.
        position: usize,
        /// Seconds left before the queue timeout.
        time_remaining_seconds: i64,
    },
}

/// Bookkeeping for an admitted session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveEntry {
    /// When the session was admitted.
    pub admitted_at: DateTime<Utc>,
    /// When its choice window lapses.
    pub choice_deadline: DateTime<Utc>,
}

/// A waiting session and its queue-entry stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedEntry {
    /// Waiting session.
    pub session_id: SessionId,
    /// When it entered (or re-entered) the queue.
    pub entered_at: DateTime<Utc>,
}

/// Which set a removed session was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removed {
    /// It was admitted.
    Active,
    /// It was waiting.
    Waiting,
    /// It was in neither set.
    Absent,
}

/// Active set plus FIFO waiting queue.
///
/// A session is in at most one of the two. The active set never grows past
/// `max_active_sessions`; if the limit shrinks, existing sessions drain
/// naturally and nobody is evicted.
#[derive(Debug, Default)]
pub struct AdmissionState {
    active: HashMap<SessionId, ActiveEntry>,
    waiting: VecDeque<QueuedEntry>,
    browser_info: HashMap<SessionId, String>,
    revision: u64,
}

impl AdmissionState {
    /// Create empty structures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of admitted sessions.
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Number of waiting sessions.
    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    /// Whether the session is admitted.
    pub fn is_active(&self, session_id: &SessionId) -> bool {
        self.active.contains_key(session_id)
    }

    /// 1-based queue position, computed live.
    pub fn position(&self, session_id: &SessionId) -> Option<usize> {
        self.waiting
            .iter()
            .position(|e| &e.session_id == session_id)
            .map(|index| index + 1)
    }

    /// Advisory client metadata recorded at connect time.
    pub fn browser_info(&self, session_id: &SessionId) -> Option<&str> {
        self.browser_info.get(session_id).map(String::as_str)
    }

    /// Current placement of a session, if it is known.
    pub fn placement(
        &self,
        session_id: &SessionId,
        settings: &AdmissionSettings,
        now: DateTime<Utc>,
    ) -> Option<Placement> {
        if let Some(entry) = self.active.get(session_id) {
            return Some(Placement::Admitted {
                choice_deadline: entry.choice_deadline,
            });
        }
        let index = self
            .waiting
            .iter()
            .position(|e| &e.session_id == session_id)?;
        Some(Placement::Queued {
            position: index + 1,
            time_remaining_seconds: queue_time_remaining(&self.waiting[index], settings, now),
        })
    }

    /// Drop waiting entries older than the queue timeout.
    ///
    /// Returns the dropped sessions in queue order.
    pub fn purge_expired(
        &mut self,
        settings: &AdmissionSettings,
        now: DateTime<Utc>,
    ) -> Vec<SessionId> {
        let timeout = settings.queue_timeout();
        let mut dropped = Vec::new();
        self.waiting.retain(|entry| {
            let stale = now - entry.entered_at > timeout;
            if stale {
                dropped.push(entry.session_id);
            }
            !stale
        });
        for session_id in &dropped {
            self.browser_info.remove(session_id);
        }
        dropped
    }

    /// Promote queue heads while there is room.
    ///
    /// Returns promoted sessions in the order they were admitted.
    pub fn advance(&mut self, settings: &AdmissionSettings, now: DateTime<Utc>) -> Vec<SessionId> {
        let mut promoted = Vec::new();
        while self.has_room(settings) {
            let Some(head) = self.waiting.pop_front() else {
                break;
            };
            self.activate(head.session_id, settings, now);
            promoted.push(head.session_id);
        }
        promoted
    }

    /// Admit or enqueue a session.
    ///
    /// The queue is advanced first so a newcomer never overtakes someone
    /// already waiting. A session that is already known keeps its place.
    pub fn admit(
        &mut self,
        session_id: SessionId,
        settings: &AdmissionSettings,
        now: DateTime<Utc>,
    ) -> (Placement, Vec<SessionId>) {
        if let Some(existing) = self.placement(&session_id, settings, now) {
            return (existing, Vec::new());
        }

        let promoted = self.advance(settings, now);

        if self.has_room(settings) {
            let entry = self.activate(session_id, settings, now);
            return (
                Placement::Admitted {
                    choice_deadline: entry.choice_deadline,
                },
                promoted,
            );
        }

        self.waiting.push_back(QueuedEntry {
            session_id,
            entered_at: now,
        });
        (
            Placement::Queued {
                position: self.waiting.len(),
                time_remaining_seconds: settings.queue_timeout().num_seconds(),
            },
            promoted,
        )
    }

    /// Record advisory client metadata.
    pub fn set_browser_info(&mut self, session_id: SessionId, info: String) {
        self.browser_info.insert(session_id, info);
    }

    /// Remove a session from whichever set holds it.
    pub fn remove(&mut self, session_id: &SessionId) -> Removed {
        self.browser_info.remove(session_id);
        if self.active.remove(session_id).is_some() {
            return Removed::Active;
        }
        let before = self.waiting.len();
        self.waiting.retain(|e| &e.session_id != session_id);
        if self.waiting.len() < before {
            Removed::Waiting
        } else {
            Removed::Absent
        }
    }

    /// Move an active session to the queue tail with a fresh entry stamp.
    ///
    /// Returns `false` if the session was not active.
    pub fn move_to_tail(&mut self, session_id: SessionId, now: DateTime<Utc>) -> bool {
        if self.active.remove(&session_id).is_none() {
            return false;
        }
        self.waiting.push_back(QueuedEntry {
            session_id,
            entered_at: now,
        });
        true
    }

    /// Active sessions whose choice window has lapsed at `now`.
    pub fn lapsed_choices(&self, now: DateTime<Utc>) -> Vec<SessionId> {
        let mut lapsed: Vec<(DateTime<Utc>, SessionId)> = self
            .active
            .iter()
            .filter(|(_, entry)| now >= entry.choice_deadline)
            .map(|(id, entry)| (entry.choice_deadline, *id))
            .collect();
        lapsed.sort_by_key(|(deadline, id)| (*deadline, *id.as_uuid()));
        lapsed.into_iter().map(|(_, id)| id).collect()
    }

    /// Build the next status snapshot, bumping the revision.
    pub fn snapshot(&mut self, settings: &AdmissionSettings, now: DateTime<Utc>) -> BroadcastEvent {
        self.revision += 1;

        let mut active: Vec<(&SessionId, &ActiveEntry)> = self.active.iter().collect();
        active.sort_by_key(|(id, entry)| (entry.admitted_at, *id.as_uuid()));

        BroadcastEvent::StatusSnapshot {
            revision: self.revision,
            active_sessions: active
                .into_iter()
                .map(|(id, entry)| ActiveSessionView {
                    session_id: *id,
                    time_left_seconds: (entry.choice_deadline - now).num_seconds().max(0),
                })
                .collect(),
            queue: self.waiting.iter().map(|e| e.session_id).collect(),
            max_active_sessions: settings.max_active_sessions,
        }
    }

    fn has_room(&self, settings: &AdmissionSettings) -> bool {
        self.active.len() < settings.max_active_sessions as usize
    }

    fn activate(
        &mut self,
        session_id: SessionId,
        settings: &AdmissionSettings,
        now: DateTime<Utc>,
    ) -> ActiveEntry {
        let entry = ActiveEntry {
            admitted_at: now,
            choice_deadline: now + settings.choice_timeout(),
        };
        self.active.insert(session_id, entry);
        entry
    }
}

fn queue_time_remaining(entry: &QueuedEntry, settings: &AdmissionSettings, now: DateTime<Utc>) -> i64 {
    (entry.entered_at + settings.queue_timeout() - now)
        .num_seconds()
        .max(0)
}

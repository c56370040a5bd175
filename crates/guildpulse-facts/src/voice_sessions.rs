//! Voice-session lifecycle tracker.
//!
//! The gateway reports voice occupancy as independent previous/next snapshots.
//! `VoiceSessionTracker` turns those deltas into closed `VoiceSessionRecord`s,
//! keeping at most one open session per (guild, member) key. Every
//! observation is applied under a single lock acquisition that is never held
//! across an `.await`, so the open/close decision and the table mutation are
//! atomic with respect to other events for the same key.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};

use crate::facts::VoiceSessionRecord;
use crate::raw_events::VoiceChannelRef;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceSessionKey {
    pub guild_id: String,
    pub member_id: String,
}

impl VoiceSessionKey {
    pub fn new(guild_id: impl Into<String>, member_id: impl Into<String>) -> Self {
        Self {
            guild_id: guild_id.into(),
            member_id: member_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceStateTransition {
    pub key: VoiceSessionKey,
    pub before: Option<VoiceChannelRef>,
    pub after: Option<VoiceChannelRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenVoiceSession {
    pub channel: VoiceChannelRef,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `VoiceTransitionOutcome` values.
pub enum VoiceTransitionOutcome {
    /// A session was opened for a member entering voice.
    Opened,
    /// The member left voice and the open session was closed.
    Closed,
    /// The member switched channels; one segment closed, one opened.
    Moved,
    /// Same channel (or no channel) on both sides.
    Unchanged,
    /// A leave or move-out arrived with no open session to close.
    Untracked,
}

impl VoiceTransitionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Closed => "closed",
            Self::Moved => "moved",
            Self::Unchanged => "unchanged",
            Self::Untracked => "untracked",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceObservation {
    pub outcome: VoiceTransitionOutcome,
    pub record: Option<VoiceSessionRecord>,
}

impl VoiceObservation {
    fn without_record(outcome: VoiceTransitionOutcome) -> Self {
        Self {
            outcome,
            record: None,
        }
    }
}

#[derive(Debug, Default)]
/// Owns the in-memory table of open voice sessions for the process lifetime.
pub struct VoiceSessionTracker {
    sessions: Mutex<HashMap<VoiceSessionKey, OpenVoiceSession>>,
}

impl VoiceSessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one before/after observation at `now`.
    ///
    /// A leave closes the stored session; a move closes it and opens the
    /// destination with the same `now`, so consecutive segments share a
    /// boundary. Leaves and moves with no stored session emit nothing.
    pub fn observe(
        &self,
        transition: &VoiceStateTransition,
        now: DateTime<Utc>,
    ) -> VoiceObservation {
        let before = transition.before.as_ref();
        let after = transition.after.as_ref();
        let mut sessions = self.lock_sessions();

        match (before, after) {
            (None, None) => VoiceObservation::without_record(VoiceTransitionOutcome::Unchanged),
            (Some(previous), Some(next)) if previous.id == next.id => {
                VoiceObservation::without_record(VoiceTransitionOutcome::Unchanged)
            }
            (None, Some(next)) => {
                sessions.insert(
                    transition.key.clone(),
                    OpenVoiceSession {
                        channel: next.clone(),
                        started_at: now,
                    },
                );
                VoiceObservation::without_record(VoiceTransitionOutcome::Opened)
            }
            (Some(_), None) => match sessions.remove(&transition.key) {
                Some(open) => VoiceObservation {
                    outcome: VoiceTransitionOutcome::Closed,
                    record: Some(close_session(&transition.key, open, now)),
                },
                None => VoiceObservation::without_record(VoiceTransitionOutcome::Untracked),
            },
            (Some(_), Some(next)) => {
                let replaced = sessions.insert(
                    transition.key.clone(),
                    OpenVoiceSession {
                        channel: next.clone(),
                        started_at: now,
                    },
                );
                match replaced {
                    Some(open) => VoiceObservation {
                        outcome: VoiceTransitionOutcome::Moved,
                        record: Some(close_session(&transition.key, open, now)),
                    },
                    None => VoiceObservation::without_record(VoiceTransitionOutcome::Opened),
                }
            }
        }
    }

    pub fn open_session(&self, key: &VoiceSessionKey) -> Option<OpenVoiceSession> {
        self.lock_sessions().get(key).cloned()
    }

    pub fn open_session_count(&self) -> usize {
        self.lock_sessions().len()
    }

    /// Empties the table, returning the sessions that were still open.
    ///
    /// Used at shutdown; orphaned sessions have no end and emit no records.
    pub fn drain_open_sessions(&self) -> Vec<(VoiceSessionKey, OpenVoiceSession)> {
        let mut drained = self.lock_sessions().drain().collect::<Vec<_>>();
        drained.sort_by(|left, right| left.0.cmp(&right.0));
        drained
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<VoiceSessionKey, OpenVoiceSession>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn close_session(
    key: &VoiceSessionKey,
    open: OpenVoiceSession,
    now: DateTime<Utc>,
) -> VoiceSessionRecord {
    VoiceSessionRecord::close(
        key.guild_id.clone(),
        key.member_id.clone(),
        open.channel.id,
        open.channel.name,
        open.started_at,
        now,
    )
}

//! Routes inbound listener events through normalization, voice tracking and
//! interaction extraction.
//!
//! Routing is synchronous: every fact an event produces is computed, and the
//! voice table already mutated, before any fact reaches a sink.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::facts::Fact;
use crate::interactions::extract_interactions;
use crate::normalizer::{
    normalize_member_join, normalize_member_leave, normalize_message, normalize_voice_state,
};
use crate::raw_events::{ListenerEvent, RawMessageEvent, RawVoiceStateChange};
use crate::voice_sessions::{VoiceSessionTracker, VoiceTransitionOutcome};

#[derive(Clone)]
pub struct EventRouter {
    tracker: Arc<VoiceSessionTracker>,
}

impl EventRouter {
    pub fn new(tracker: Arc<VoiceSessionTracker>) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &Arc<VoiceSessionTracker> {
        &self.tracker
    }

    /// Returns the facts derived from `event`; `now` stamps voice transitions.
    pub fn route(&self, event: &ListenerEvent, now: DateTime<Utc>) -> Vec<Fact> {
        match event {
            ListenerEvent::MessageCreated(message) => self.route_message(message),
            ListenerEvent::MemberJoined(member) => normalize_member_join(member)
                .map(Fact::MemberJoin)
                .into_iter()
                .collect(),
            ListenerEvent::MemberLeft(member) => normalize_member_leave(member)
                .map(Fact::MemberLeave)
                .into_iter()
                .collect(),
            ListenerEvent::VoiceStateChanged(change) => self.route_voice_state(change, now),
        }
    }

    fn route_message(&self, event: &RawMessageEvent) -> Vec<Fact> {
        let Some(message) = normalize_message(event) else {
            return Vec::new();
        };
        let edges = extract_interactions(&message, &event.mentions, event.replied_to.as_ref());
        let mut facts = Vec::with_capacity(edges.len().saturating_add(1));
        facts.push(Fact::MessageCreated(message));
        facts.extend(edges.into_iter().map(Fact::Interaction));
        facts
    }

    fn route_voice_state(&self, change: &RawVoiceStateChange, now: DateTime<Utc>) -> Vec<Fact> {
        let Some(transition) = normalize_voice_state(change) else {
            return Vec::new();
        };
        let observation = self.tracker.observe(&transition, now);
        match observation.outcome {
            VoiceTransitionOutcome::Untracked => tracing::debug!(
                guild_id = transition.key.guild_id.as_str(),
                member_id = transition.key.member_id.as_str(),
                "voice leave observed without an open session"
            ),
            VoiceTransitionOutcome::Unchanged => {}
            outcome => tracing::debug!(
                guild_id = transition.key.guild_id.as_str(),
                member_id = transition.key.member_id.as_str(),
                outcome = outcome.as_str(),
                "voice session transition"
            ),
        }
        observation
            .record
            .map(Fact::VoiceSession)
            .into_iter()
            .collect()
    }
}

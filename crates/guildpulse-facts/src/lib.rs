//! Analytics facts derived from chat gateway events.
//!
//! Hosts the platform-neutral event shapes, the fact model, the normalizer,
//! the voice-session tracker, interaction extraction and the `FactSink`
//! boundary plus the dispatcher that drives it.

pub mod event_router;
pub mod fact_dispatcher;
pub mod fact_sink;
pub mod facts;
pub mod interactions;
pub mod normalizer;
pub mod raw_events;
pub mod voice_sessions;

pub use event_router::EventRouter;
pub use fact_dispatcher::{DeliveryReport, FactDispatcher};
pub use fact_sink::FactSink;
pub use facts::{
    rounded_duration_minutes, Fact, FactKind, InteractionEdge, InteractionKind, MemberJoinFact,
    MemberLeaveFact, MessageFact, VoiceSessionRecord,
};
pub use interactions::extract_interactions;
pub use normalizer::{
    normalize_member_join, normalize_member_leave, normalize_message, normalize_voice_state,
};
pub use raw_events::{
    ListenerEvent, RawMemberEvent, RawMessageEvent, RawUser, RawVoiceStateChange,
    VoiceChannelRef,
};
pub use voice_sessions::{
    OpenVoiceSession, VoiceObservation, VoiceSessionKey, VoiceSessionTracker,
    VoiceStateTransition, VoiceTransitionOutcome,
};

//! Platform-neutral shapes of the inbound gateway events the listener handles.
//!
//! The gateway adapter fills these from the chat client's models; ids are
//! opaque strings and nothing here is validated.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUser {
    pub id: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessageEvent {
    pub message_id: String,
    pub guild_id: Option<String>,
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub author: RawUser,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub mentions: Vec<RawUser>,
    /// Author of the referenced message, when a reply target could be resolved.
    pub replied_to: Option<RawUser>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMemberEvent {
    pub guild_id: String,
    pub user: RawUser,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoiceChannelRef {
    pub id: String,
    pub name: String,
}

impl VoiceChannelRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Previous and next voice-channel snapshots for one member.
pub struct RawVoiceStateChange {
    pub guild_id: Option<String>,
    pub member: RawUser,
    pub before: Option<VoiceChannelRef>,
    pub after: Option<VoiceChannelRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enumerates the inbound event kinds the listener reacts to.
pub enum ListenerEvent {
    MessageCreated(RawMessageEvent),
    MemberJoined(RawMemberEvent),
    MemberLeft(RawMemberEvent),
    VoiceStateChanged(RawVoiceStateChange),
}

impl ListenerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessageCreated(_) => "message_created",
            Self::MemberJoined(_) => "member_joined",
            Self::MemberLeft(_) => "member_left",
            Self::VoiceStateChanged(_) => "voice_state_changed",
        }
    }
}

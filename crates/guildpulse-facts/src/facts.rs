//! Fact records emitted by the listener and their wire representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `FactKind` values.
pub enum FactKind {
    MessageCreated,
    MemberJoin,
    MemberLeave,
    VoiceSession,
    Interaction,
}

impl FactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessageCreated => "message_created",
            Self::MemberJoin => "member_join",
            Self::MemberLeave => "member_leave",
            Self::VoiceSession => "voice_session",
            Self::Interaction => "interaction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFact {
    pub guild_id: String,
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    pub message_id: String,
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub author_id: String,
    pub author_username: String,
    pub author_avatar_url: Option<String>,
    pub mentioned_user_ids: Vec<String>,
    pub replied_to_user_id: Option<String>,
    pub content_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberJoinFact {
    pub guild_id: String,
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    pub member_id: String,
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberLeaveFact {
    pub guild_id: String,
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    pub member_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A closed voice segment: one member, one channel, one contiguous interval.
pub struct VoiceSessionRecord {
    pub guild_id: String,
    pub member_id: String,
    pub channel_id: String,
    pub channel_name: String,
    #[serde(with = "iso8601")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "iso8601")]
    pub ended_at: DateTime<Utc>,
    pub duration_minutes: u64,
}

impl VoiceSessionRecord {
    /// Builds a record, clamping `ended_at` so it never precedes `started_at`.
    pub fn close(
        guild_id: impl Into<String>,
        member_id: impl Into<String>,
        channel_id: impl Into<String>,
        channel_name: impl Into<String>,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Self {
        let ended_at = ended_at.max(started_at);
        Self {
            guild_id: guild_id.into(),
            member_id: member_id.into(),
            channel_id: channel_id.into(),
            channel_name: channel_name.into(),
            started_at,
            ended_at,
            duration_minutes: rounded_duration_minutes(started_at, ended_at),
        }
    }
}

/// Whole minutes between two instants, halves rounded up, never negative.
pub fn rounded_duration_minutes(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> u64 {
    let elapsed_ms = (ended_at - started_at).num_milliseconds().max(0);
    let elapsed_ms = u64::try_from(elapsed_ms).unwrap_or_default();
    elapsed_ms.saturating_add(30_000) / 60_000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Mention,
    Reply,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mention => "mention",
            Self::Reply => "reply",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionEdge {
    pub guild_id: String,
    pub source_id: String,
    pub target_id: String,
    pub kind: InteractionKind,
    pub channel_id: String,
    #[serde(with = "iso8601")]
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Normalized, immutable record ready for delivery to a `FactSink`.
pub enum Fact {
    MessageCreated(MessageFact),
    MemberJoin(MemberJoinFact),
    MemberLeave(MemberLeaveFact),
    VoiceSession(VoiceSessionRecord),
    Interaction(InteractionEdge),
}

impl Fact {
    pub fn kind(&self) -> FactKind {
        match self {
            Self::MessageCreated(_) => FactKind::MessageCreated,
            Self::MemberJoin(_) => FactKind::MemberJoin,
            Self::MemberLeave(_) => FactKind::MemberLeave,
            Self::VoiceSession(_) => FactKind::VoiceSession,
            Self::Interaction(_) => FactKind::Interaction,
        }
    }

    pub fn guild_id(&self) -> &str {
        match self {
            Self::MessageCreated(fact) => &fact.guild_id,
            Self::MemberJoin(fact) => &fact.guild_id,
            Self::MemberLeave(fact) => &fact.guild_id,
            Self::VoiceSession(record) => &record.guild_id,
            Self::Interaction(edge) => &edge.guild_id,
        }
    }

    /// Instant the fact is attributed to; voice sessions use their start.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::MessageCreated(fact) => fact.timestamp,
            Self::MemberJoin(fact) => fact.timestamp,
            Self::MemberLeave(fact) => fact.timestamp,
            Self::VoiceSession(record) => record.started_at,
            Self::Interaction(edge) => edge.occurred_at,
        }
    }
}

pub(crate) mod iso8601 {
    use chrono::{DateTime, Utc};
    use guildpulse_core::format_iso8601;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_iso8601(value))
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

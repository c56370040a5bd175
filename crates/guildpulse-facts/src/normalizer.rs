//! Maps raw gateway events into flat facts, dropping bot and direct-message traffic.

use crate::facts::{MemberJoinFact, MemberLeaveFact, MessageFact};
use crate::raw_events::{RawMemberEvent, RawMessageEvent, RawVoiceStateChange};
use crate::voice_sessions::{VoiceSessionKey, VoiceStateTransition};

pub fn normalize_message(event: &RawMessageEvent) -> Option<MessageFact> {
    if event.author.bot {
        return None;
    }
    let guild_id = event.guild_id.clone()?;
    Some(MessageFact {
        guild_id,
        timestamp: event.timestamp,
        message_id: event.message_id.clone(),
        channel_id: event.channel_id.clone(),
        channel_name: event.channel_name.clone(),
        author_id: event.author.id.clone(),
        author_username: event.author.username.clone(),
        author_avatar_url: event.author.avatar_url.clone(),
        mentioned_user_ids: event.mentions.iter().map(|user| user.id.clone()).collect(),
        replied_to_user_id: event.replied_to.as_ref().map(|user| user.id.clone()),
        content_length: event.content.chars().count(),
    })
}

pub fn normalize_member_join(event: &RawMemberEvent) -> Option<MemberJoinFact> {
    if event.user.bot {
        return None;
    }
    Some(MemberJoinFact {
        guild_id: event.guild_id.clone(),
        timestamp: event.occurred_at,
        member_id: event.user.id.clone(),
        username: event.user.username.clone(),
        avatar_url: event.user.avatar_url.clone(),
    })
}

pub fn normalize_member_leave(event: &RawMemberEvent) -> Option<MemberLeaveFact> {
    if event.user.bot {
        return None;
    }
    Some(MemberLeaveFact {
        guild_id: event.guild_id.clone(),
        timestamp: event.occurred_at,
        member_id: event.user.id.clone(),
    })
}

pub fn normalize_voice_state(change: &RawVoiceStateChange) -> Option<VoiceStateTransition> {
    if change.member.bot {
        return None;
    }
    let guild_id = change.guild_id.clone()?;
    Some(VoiceStateTransition {
        key: VoiceSessionKey::new(guild_id, change.member.id.clone()),
        before: change.before.clone(),
        after: change.after.clone(),
    })
}

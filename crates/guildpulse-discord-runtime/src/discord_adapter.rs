//! Conversions from serenity models into platform-neutral listener events.
//!
//! Everything here reads the gateway cache synchronously; the only network
//! lookup is reply-target resolution, which never blocks voice handling.

use chrono::{DateTime, Utc};
use guildpulse_core::unix_seconds_to_utc;
use guildpulse_facts::{
    RawMemberEvent, RawMessageEvent, RawUser, RawVoiceStateChange, VoiceChannelRef,
};
use serenity::all::{
    ChannelId, Context, GuildId, Member, Message, Timestamp, User, UserId, VoiceState,
};

pub(crate) fn raw_user(user: &User) -> RawUser {
    RawUser {
        id: user.id.to_string(),
        username: user.name.clone(),
        avatar_url: user.avatar_url(),
        bot: user.bot,
    }
}

pub(crate) fn instant_or(timestamp: Option<&Timestamp>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    timestamp
        .and_then(|value| unix_seconds_to_utc(value.unix_timestamp()))
        .unwrap_or(fallback)
}

/// Channel name from the guild cache, including active threads.
pub(crate) fn cached_channel_name(
    ctx: &Context,
    guild_id: Option<GuildId>,
    channel_id: ChannelId,
) -> Option<String> {
    let guild = ctx.cache.guild(guild_id?)?;
    if let Some(channel) = guild.channels.get(&channel_id) {
        return Some(channel.name.clone());
    }
    guild
        .threads
        .iter()
        .find(|thread| thread.id == channel_id)
        .map(|thread| thread.name.clone())
}

pub(crate) fn voice_channel_ref(channel_id: ChannelId, cached_name: Option<String>) -> VoiceChannelRef {
    let id = channel_id.to_string();
    let name = cached_name.unwrap_or_else(|| id.clone());
    VoiceChannelRef { id, name }
}

/// Author of the message being replied to, if it can still be found.
pub(crate) async fn resolve_reply_author(ctx: &Context, message: &Message) -> Option<RawUser> {
    if let Some(referenced) = message.referenced_message.as_deref() {
        return Some(raw_user(&referenced.author));
    }
    let reference = message.message_reference.as_ref()?;
    let message_id = reference.message_id?;
    match reference.channel_id.message(ctx, message_id).await {
        Ok(original) => Some(raw_user(&original.author)),
        Err(error) => {
            tracing::debug!(
                channel_id = %reference.channel_id,
                message_id = %message_id,
                error = %error,
                "reply target unavailable"
            );
            None
        }
    }
}

pub(crate) fn message_event(
    message: &Message,
    channel_name: Option<String>,
    replied_to: Option<RawUser>,
    received_at: DateTime<Utc>,
) -> RawMessageEvent {
    RawMessageEvent {
        message_id: message.id.to_string(),
        guild_id: message.guild_id.map(|id| id.to_string()),
        channel_id: message.channel_id.to_string(),
        channel_name,
        author: raw_user(&message.author),
        content: message.content.clone(),
        timestamp: instant_or(Some(&message.timestamp), received_at),
        mentions: message.mentions.iter().map(raw_user).collect(),
        replied_to,
    }
}

pub(crate) fn member_join_event(member: &Member, received_at: DateTime<Utc>) -> RawMemberEvent {
    RawMemberEvent {
        guild_id: member.guild_id.to_string(),
        user: raw_user(&member.user),
        occurred_at: instant_or(member.joined_at.as_ref(), received_at),
    }
}

pub(crate) fn member_leave_event(
    guild_id: GuildId,
    user: &User,
    received_at: DateTime<Utc>,
) -> RawMemberEvent {
    RawMemberEvent {
        guild_id: guild_id.to_string(),
        user: raw_user(user),
        occurred_at: received_at,
    }
}

/// Member or global user from the cache, for voice payloads without a member.
fn cached_voice_user(ctx: &Context, guild_id: Option<GuildId>, user_id: UserId) -> Option<User> {
    guild_id
        .and_then(|guild_id| ctx.cache.member(guild_id, user_id))
        .map(|member| member.user.clone())
        .or_else(|| ctx.cache.user(user_id).map(|user| User::clone(&user)))
}

/// Identity of the member behind a voice update. Without a payload member or
/// a cached user only the id is known, and the user is assumed human.
pub(crate) fn voice_member(
    user_id: UserId,
    member: Option<&Member>,
    cached_user: Option<User>,
) -> RawUser {
    if let Some(member) = member {
        return raw_user(&member.user);
    }
    match cached_user {
        Some(user) => raw_user(&user),
        None => RawUser {
            id: user_id.to_string(),
            username: String::new(),
            avatar_url: None,
            bot: false,
        },
    }
}

pub(crate) fn voice_state_change(
    ctx: &Context,
    old: Option<&VoiceState>,
    new: &VoiceState,
) -> RawVoiceStateChange {
    let guild_id = new.guild_id.or_else(|| old.and_then(|state| state.guild_id));
    let channel_ref = |channel_id: ChannelId| {
        voice_channel_ref(channel_id, cached_channel_name(ctx, guild_id, channel_id))
    };
    let cached_user = match new.member {
        Some(_) => None,
        None => cached_voice_user(ctx, guild_id, new.user_id),
    };
    let member = voice_member(new.user_id, new.member.as_ref(), cached_user);

    RawVoiceStateChange {
        guild_id: guild_id.map(|id| id.to_string()),
        member,
        before: old.and_then(|state| state.channel_id).map(channel_ref),
        after: new.channel_id.map(channel_ref),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn unit_voice_channel_ref_falls_back_to_id_when_uncached() {
        let channel_id = ChannelId::new(4242);
        assert_eq!(
            voice_channel_ref(channel_id, None),
            VoiceChannelRef::new("4242", "4242")
        );
        assert_eq!(
            voice_channel_ref(channel_id, Some("lounge".to_string())),
            VoiceChannelRef::new("4242", "lounge")
        );
    }

    #[test]
    fn regression_voice_member_keeps_cached_bot_flag_without_payload_member() {
        let user_id = UserId::new(77);
        let mut cached = User::default();
        cached.id = user_id;
        cached.name = "music-bot".to_string();
        cached.bot = true;

        let member = voice_member(user_id, None, Some(cached));
        assert_eq!(member.id, "77");
        assert_eq!(member.username, "music-bot");
        assert!(member.bot);
    }

    #[test]
    fn unit_voice_member_falls_back_to_bare_id_when_uncached() {
        let member = voice_member(UserId::new(78), None, None);
        assert_eq!(member.id, "78");
        assert!(member.username.is_empty());
        assert!(!member.bot);
    }

    #[test]
    fn unit_instant_or_prefers_platform_timestamp() {
        let fallback = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .expect("valid instant");
        assert_eq!(instant_or(None, fallback), fallback);

        let platform = Timestamp::from_unix_timestamp(1_700_000_000).expect("timestamp");
        assert_eq!(
            instant_or(Some(&platform), fallback).timestamp(),
            1_700_000_000
        );
    }
}

use chrono::Utc;
use guildpulse_facts::ListenerEvent;
use serenity::all::{Context, EventHandler, GuildId, Member, Message, Ready, User, VoiceState};
use serenity::async_trait;

use crate::discord_adapter::{
    cached_channel_name, member_join_event, member_leave_event, message_event,
    resolve_reply_author, voice_state_change,
};
use crate::listener_runtime::ListenerRuntime;

/// serenity `EventHandler` that forwards the four tracked gateway events.
pub struct DiscordListenerHandler {
    runtime: ListenerRuntime,
}

impl DiscordListenerHandler {
    pub fn new(runtime: ListenerRuntime) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl EventHandler for DiscordListenerHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        tracing::info!(
            bot_user = ready.user.name.as_str(),
            guilds = ready.guilds.len(),
            "connected to discord gateway"
        );
    }

    async fn message(&self, ctx: Context, new_message: Message) {
        let received_at = Utc::now();
        let channel_name = cached_channel_name(&ctx, new_message.guild_id, new_message.channel_id);
        // Bot and direct-message traffic is dropped downstream; skip the lookup.
        let replied_to = if new_message.author.bot || new_message.guild_id.is_none() {
            None
        } else {
            resolve_reply_author(&ctx, &new_message).await
        };
        let event = message_event(&new_message, channel_name, replied_to, received_at);
        self.runtime
            .handle_event(ListenerEvent::MessageCreated(event), received_at);
    }

    async fn guild_member_addition(&self, _ctx: Context, new_member: Member) {
        let received_at = Utc::now();
        let event = member_join_event(&new_member, received_at);
        self.runtime
            .handle_event(ListenerEvent::MemberJoined(event), received_at);
    }

    async fn guild_member_removal(
        &self,
        _ctx: Context,
        guild_id: GuildId,
        user: User,
        _member_data_if_available: Option<Member>,
    ) {
        let received_at = Utc::now();
        let event = member_leave_event(guild_id, &user, received_at);
        self.runtime
            .handle_event(ListenerEvent::MemberLeft(event), received_at);
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let received_at = Utc::now();
        let change = voice_state_change(&ctx, old.as_ref(), &new);
        self.runtime
            .handle_event(ListenerEvent::VoiceStateChanged(change), received_at);
    }
}

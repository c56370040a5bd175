//! Discord gateway runtime for the guildpulse listener.
//!
//! serenity owns the gateway connection, authentication and reconnects. This
//! crate adapts its events into `ListenerEvent`s and drives the router and
//! fact dispatcher until the process is asked to stop.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use serenity::all::{Client, GatewayIntents};

mod discord_adapter;
mod discord_handler;
pub mod listener_runtime;

pub use discord_handler::DiscordListenerHandler;
pub use listener_runtime::ListenerRuntime;

/// Gateway intents needed for messages, membership and voice occupancy.
pub fn listener_gateway_intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_VOICE_STATES
}

/// Connects to the gateway and processes events until Ctrl-C or a fatal
/// client error.
pub async fn run_discord_listener(token: &str, runtime: ListenerRuntime) -> Result<()> {
    let mut client = Client::builder(token, listener_gateway_intents())
        .event_handler(DiscordListenerHandler::new(runtime.clone()))
        .await
        .context("failed to build discord gateway client")?;
    let shard_manager = Arc::clone(&client.shard_manager);

    tokio::select! {
        result = client.start() => {
            result.context("discord gateway client stopped")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            tracing::info!("shutdown requested; closing gateway shards");
            shard_manager.shutdown_all().await;
        }
    }

    runtime.shutdown();
    Ok(())
}

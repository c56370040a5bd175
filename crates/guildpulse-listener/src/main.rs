mod bootstrap_helpers;
mod startup;

use anyhow::Result;
use clap::Parser;
use guildpulse_cli::{ListenerCli, ListenerConfig};

use crate::bootstrap_helpers::init_tracing;
use crate::startup::run_listener;

// serenity spawns one task per gateway event; the single-threaded scheduler
// polls them in spawn order, so voice updates for a member reach the
// tracker in arrival order.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = ListenerCli::parse();
    let config = ListenerConfig::from_cli(&cli)?;
    init_tracing();
    run_listener(config).await
}

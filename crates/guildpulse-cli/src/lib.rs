//! CLI argument models and configuration validation for the guildpulse listener.
//!
//! Every flag has an environment fallback; `ListenerConfig::from_cli` turns
//! parsed flags into a validated configuration or a descriptive error.

pub mod cli_args;
pub mod cli_types;
pub mod listener_config;

pub use cli_args::ListenerCli;
pub use cli_types::CliSinkMode;
pub use listener_config::{ConfigError, ListenerConfig, SinkSettings};

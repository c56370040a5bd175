use std::path::PathBuf;

use thiserror::Error;

use crate::{CliSinkMode, ListenerCli};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Enumerates supported `ConfigError` values.
pub enum ConfigError {
    #[error("missing required option --{flag} (env {env})")]
    MissingOption {
        flag: &'static str,
        env: &'static str,
    },
    #[error("--ingest-url must be an http:// or https:// URL, got '{value}'")]
    InvalidIngestUrl { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkSettings {
    Http {
        base_url: String,
        signing_secret: String,
        request_timeout_ms: u64,
    },
    Sqlite {
        path: PathBuf,
    },
}

impl SinkSettings {
    pub fn mode(&self) -> CliSinkMode {
        match self {
            Self::Http { .. } => CliSinkMode::Http,
            Self::Sqlite { .. } => CliSinkMode::Sqlite,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Validated listener configuration.
pub struct ListenerConfig {
    pub discord_token: String,
    pub sink: SinkSettings,
}

impl ListenerConfig {
    /// Validates parsed flags; blank values count as missing.
    pub fn from_cli(cli: &ListenerCli) -> Result<Self, ConfigError> {
        let discord_token = required_text(
            cli.discord_token.as_deref(),
            "discord-token",
            "GUILDPULSE_DISCORD_TOKEN",
        )?;

        let sink = match cli.sink {
            CliSinkMode::Http => {
                let base_url = required_text(
                    cli.ingest_url.as_deref(),
                    "ingest-url",
                    "GUILDPULSE_INGEST_URL",
                )?;
                if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                    return Err(ConfigError::InvalidIngestUrl { value: base_url });
                }
                let signing_secret = required_text(
                    cli.ingest_secret.as_deref(),
                    "ingest-secret",
                    "GUILDPULSE_INGEST_SECRET",
                )?;
                SinkSettings::Http {
                    base_url,
                    signing_secret,
                    request_timeout_ms: cli.request_timeout_ms,
                }
            }
            CliSinkMode::Sqlite => {
                let path = cli
                    .sqlite_path
                    .as_ref()
                    .filter(|path| !path.as_os_str().is_empty())
                    .cloned()
                    .ok_or(ConfigError::MissingOption {
                        flag: "sqlite-path",
                        env: "GUILDPULSE_SQLITE_PATH",
                    })?;
                SinkSettings::Sqlite { path }
            }
        };

        Ok(Self {
            discord_token,
            sink,
        })
    }
}

fn required_text(
    value: Option<&str>,
    flag: &'static str,
    env: &'static str,
) -> Result<String, ConfigError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::MissingOption { flag, env })
}

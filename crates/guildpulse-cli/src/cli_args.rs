use std::path::PathBuf;

use clap::Parser;

use crate::CliSinkMode;

pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "guildpulse-listener",
    about = "Discord gateway listener that forwards server analytics facts",
    version
)]
pub struct ListenerCli {
    #[arg(
        long,
        env = "GUILDPULSE_DISCORD_TOKEN",
        hide_env_values = true,
        help = "Discord bot token used to connect to the gateway"
    )]
    pub discord_token: Option<String>,

    #[arg(
        long,
        env = "GUILDPULSE_SINK",
        value_enum,
        default_value_t = CliSinkMode::Http,
        help = "Where facts are delivered: the HTTP ingestion endpoint or a local SQLite file"
    )]
    pub sink: CliSinkMode,

    #[arg(
        long,
        env = "GUILDPULSE_INGEST_URL",
        help = "Base URL of the ingestion endpoint; facts are POSTed to <url>/ingest"
    )]
    pub ingest_url: Option<String>,

    #[arg(
        long,
        env = "GUILDPULSE_INGEST_SECRET",
        hide_env_values = true,
        help = "Shared secret used to HMAC-sign outbound payloads"
    )]
    pub ingest_secret: Option<String>,

    #[arg(
        long,
        env = "GUILDPULSE_SQLITE_PATH",
        help = "SQLite database path used by the sqlite sink"
    )]
    pub sqlite_path: Option<PathBuf>,

    #[arg(
        long,
        env = "GUILDPULSE_REQUEST_TIMEOUT_MS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_MS,
        value_parser = parse_positive_u64,
        help = "Timeout in milliseconds for a single ingest request"
    )]
    pub request_timeout_ms: u64,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn unit_parse_positive_u64_rejects_zero_and_garbage() {
        assert_eq!(parse_positive_u64("250"), Ok(250));
        assert_eq!(
            parse_positive_u64("0"),
            Err("value must be greater than 0".to_string())
        );
        assert!(parse_positive_u64("ten").is_err());
    }

    #[test]
    fn functional_cli_parses_flags_and_defaults() {
        let cli = ListenerCli::try_parse_from([
            "guildpulse-listener",
            "--discord-token",
            "token",
            "--sink",
            "sqlite",
            "--sqlite-path",
            "/tmp/facts.sqlite",
        ])
        .expect("parse");
        assert_eq!(cli.discord_token.as_deref(), Some("token"));
        assert_eq!(cli.sink, CliSinkMode::Sqlite);
        assert_eq!(cli.sqlite_path, Some(PathBuf::from("/tmp/facts.sqlite")));
        assert_eq!(cli.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
    }

    #[test]
    fn regression_cli_rejects_unknown_sink_and_zero_timeout() {
        assert!(ListenerCli::try_parse_from(["guildpulse-listener", "--sink", "kafka"]).is_err());
        assert!(
            ListenerCli::try_parse_from(["guildpulse-listener", "--request-timeout-ms", "0"])
                .is_err()
        );
    }
}

use std::sync::Arc;

use anyhow::Result;
use guildpulse_cli::{ListenerConfig, SinkSettings};
use guildpulse_discord_runtime::{run_discord_listener, ListenerRuntime};
use guildpulse_facts::{EventRouter, FactDispatcher, FactSink, VoiceSessionTracker};
use guildpulse_sink::{HttpIngestConfig, HttpIngestSink, SqliteFactStore};

pub(crate) fn build_fact_sink(settings: &SinkSettings) -> Result<Arc<dyn FactSink>> {
    match settings {
        SinkSettings::Http {
            base_url,
            signing_secret,
            request_timeout_ms,
        } => {
            let sink = HttpIngestSink::new(HttpIngestConfig {
                base_url: base_url.clone(),
                signing_secret: signing_secret.clone(),
                request_timeout_ms: *request_timeout_ms,
            })?;
            tracing::info!(ingest_url = sink.ingest_url(), "delivering facts over http");
            Ok(Arc::new(sink))
        }
        SinkSettings::Sqlite { path } => {
            let store = SqliteFactStore::open(path)?;
            tracing::info!(path = %store.path().display(), "delivering facts to sqlite");
            Ok(Arc::new(store))
        }
    }
}

pub(crate) fn build_listener_runtime(sink: Arc<dyn FactSink>) -> ListenerRuntime {
    let tracker = Arc::new(VoiceSessionTracker::new());
    ListenerRuntime::new(EventRouter::new(tracker), FactDispatcher::new(sink))
}

pub(crate) async fn run_listener(config: ListenerConfig) -> Result<()> {
    let sink = build_fact_sink(&config.sink)?;
    let runtime = build_listener_runtime(sink);
    run_discord_listener(&config.discord_token, runtime).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn functional_sqlite_settings_build_a_sqlite_sink() {
        let temp = tempfile::tempdir().expect("tempdir");
        let sink = build_fact_sink(&SinkSettings::Sqlite {
            path: temp.path().join("facts.sqlite"),
        })
        .expect("sink");
        assert_eq!(sink.name(), "sqlite");
        assert!(temp.path().join("facts.sqlite").exists());
    }

    #[test]
    fn functional_http_settings_build_an_http_sink() {
        let sink = build_fact_sink(&SinkSettings::Http {
            base_url: "https://ingest.example/".to_string(),
            signing_secret: "secret".to_string(),
            request_timeout_ms: 1_000,
        })
        .expect("sink");
        assert_eq!(sink.name(), "http-ingest");
    }

    #[test]
    fn unit_listener_runtime_starts_with_empty_voice_table() {
        let sink = build_fact_sink(&SinkSettings::Http {
            base_url: "http://127.0.0.1:9".to_string(),
            signing_secret: "secret".to_string(),
            request_timeout_ms: 1_000,
        })
        .expect("sink");
        let runtime = build_listener_runtime(sink);
        assert_eq!(runtime.router().tracker().open_session_count(), 0);
    }
}

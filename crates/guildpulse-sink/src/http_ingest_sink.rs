//! Signed HTTP delivery of facts to the remote ingestion endpoint.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use guildpulse_core::truncate_for_error;
use guildpulse_facts::{Fact, FactSink};

use crate::payload_signing::{sign_payload, EVENT_TYPE_HEADER, SIGNATURE_HEADER};

const INGEST_PATH: &str = "/ingest";

#[derive(Debug, Clone)]
pub struct HttpIngestConfig {
    pub base_url: String,
    pub signing_secret: String,
    pub request_timeout_ms: u64,
}

#[derive(Clone)]
/// Posts each fact as signed JSON; one attempt per fact, no retries.
pub struct HttpIngestSink {
    http: reqwest::Client,
    ingest_url: String,
    signing_secret: String,
}

impl HttpIngestSink {
    pub fn new(config: HttpIngestConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("guildpulse-listener"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .context("failed to create ingest http client")?;

        Ok(Self {
            http,
            ingest_url: format!("{}{INGEST_PATH}", config.base_url.trim_end_matches('/')),
            signing_secret: config.signing_secret,
        })
    }

    pub fn ingest_url(&self) -> &str {
        &self.ingest_url
    }
}

#[async_trait]
impl FactSink for HttpIngestSink {
    fn name(&self) -> &'static str {
        "http-ingest"
    }

    async fn deliver(&self, fact: &Fact) -> Result<()> {
        let body = serde_json::to_vec(fact).context("failed to encode fact payload")?;
        let signature = sign_payload(&self.signing_secret, &body)?;
        let fact_type = fact.kind().as_str();

        let response = self
            .http
            .post(&self.ingest_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(EVENT_TYPE_HEADER, fact_type)
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .with_context(|| format!("ingest request for {fact_type} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "ingest endpoint rejected {fact_type} with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 320)
            );
        }
        Ok(())
    }
}

//! `FactSink` bindings for guildpulse.
//!
//! `HttpIngestSink` forwards signed JSON to the remote ingestion service;
//! `SqliteFactStore` is the local fallback that writes aggregates directly.

pub mod http_ingest_sink;
pub mod payload_signing;
pub mod sqlite_fact_store;

pub use http_ingest_sink::{HttpIngestConfig, HttpIngestSink};
pub use payload_signing::{
    sign_payload, verify_payload_signature, EVENT_TYPE_HEADER, SIGNATURE_HEADER,
};
pub use sqlite_fact_store::{MemberDailyCounts, SqliteFactStore, StoredVoiceSession};

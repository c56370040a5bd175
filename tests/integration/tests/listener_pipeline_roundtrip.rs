use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use guildpulse_discord_runtime::ListenerRuntime;
use guildpulse_facts::{
    EventRouter, FactDispatcher, FactSink, ListenerEvent, RawMemberEvent, RawMessageEvent,
    RawUser, RawVoiceStateChange, VoiceChannelRef, VoiceSessionTracker,
};
use guildpulse_sink::{
    sign_payload, verify_payload_signature, HttpIngestConfig, HttpIngestSink, SqliteFactStore,
    StoredVoiceSession,
};
use httpmock::prelude::*;
use serde_json::Value;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 14, 19, 30, 0)
        .single()
        .expect("valid instant")
}

fn user(id: &str, bot: bool) -> RawUser {
    RawUser {
        id: id.to_string(),
        username: format!("user-{id}"),
        avatar_url: None,
        bot,
    }
}

fn runtime_with(sink: Arc<dyn FactSink>) -> ListenerRuntime {
    ListenerRuntime::new(
        EventRouter::new(Arc::new(VoiceSessionTracker::new())),
        FactDispatcher::new(sink),
    )
}

fn voice(member: &str, before: Option<&str>, after: Option<&str>) -> ListenerEvent {
    ListenerEvent::VoiceStateChanged(RawVoiceStateChange {
        guild_id: Some("guild-1".to_string()),
        member: user(member, false),
        before: before.map(|name| VoiceChannelRef::new(format!("id-{name}"), name)),
        after: after.map(|name| VoiceChannelRef::new(format!("id-{name}"), name)),
    })
}

fn message_a_to_b_c_replying_d() -> ListenerEvent {
    ListenerEvent::MessageCreated(RawMessageEvent {
        message_id: "msg-1".to_string(),
        guild_id: Some("guild-1".to_string()),
        channel_id: "text-1".to_string(),
        channel_name: Some("general".to_string()),
        author: user("A", false),
        content: "hey @B @C".to_string(),
        timestamp: t0(),
        mentions: vec![user("B", false), user("C", false), user("A", false)],
        replied_to: Some(user("D", false)),
    })
}

async fn settle(runtime: &ListenerRuntime, event: ListenerEvent, now: DateTime<Utc>) {
    if let Some(handle) = runtime.handle_event(event, now) {
        let report = handle.await.expect("delivery task");
        assert_eq!(report.failed, 0, "unexpected delivery failure");
    }
}

#[tokio::test]
async fn integration_voice_moves_persist_contiguous_sessions_to_sqlite() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = SqliteFactStore::open(&temp.path().join("facts.sqlite")).expect("store");
    let runtime = runtime_with(Arc::new(store.clone()));

    settle(&runtime, voice("M", None, Some("#voice-a")), t0()).await;
    settle(
        &runtime,
        voice("M", Some("#voice-a"), Some("#voice-b")),
        t0() + Duration::minutes(5),
    )
    .await;
    settle(
        &runtime,
        voice("M", Some("#voice-b"), None),
        t0() + Duration::minutes(8),
    )
    .await;
    // Leave with no recorded join, as after a restart.
    settle(&runtime, voice("N", Some("#voice-a"), None), t0()).await;

    let sessions = store.voice_sessions("guild-1").expect("sessions");
    assert_eq!(
        sessions,
        vec![
            StoredVoiceSession {
                guild_id: "guild-1".to_string(),
                member_id: "M".to_string(),
                channel_id: "id-#voice-a".to_string(),
                channel_name: "#voice-a".to_string(),
                started_at: "2024-09-14T19:30:00.000Z".to_string(),
                ended_at: "2024-09-14T19:35:00.000Z".to_string(),
                duration_minutes: 5,
            },
            StoredVoiceSession {
                guild_id: "guild-1".to_string(),
                member_id: "M".to_string(),
                channel_id: "id-#voice-b".to_string(),
                channel_name: "#voice-b".to_string(),
                started_at: "2024-09-14T19:35:00.000Z".to_string(),
                ended_at: "2024-09-14T19:38:00.000Z".to_string(),
                duration_minutes: 3,
            },
        ]
    );
    assert_eq!(runtime.router().tracker().open_session_count(), 0);
}

#[tokio::test]
async fn integration_messages_and_members_aggregate_in_sqlite() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = SqliteFactStore::open(&temp.path().join("facts.sqlite")).expect("store");
    let runtime = runtime_with(Arc::new(store.clone()));

    settle(&runtime, message_a_to_b_c_replying_d(), t0()).await;
    settle(&runtime, message_a_to_b_c_replying_d(), t0()).await;
    settle(
        &runtime,
        ListenerEvent::MemberJoined(RawMemberEvent {
            guild_id: "guild-1".to_string(),
            user: user("E", false),
            occurred_at: t0(),
        }),
        t0(),
    )
    .await;
    settle(
        &runtime,
        ListenerEvent::MemberJoined(RawMemberEvent {
            guild_id: "guild-1".to_string(),
            user: user("bot", true),
            occurred_at: t0(),
        }),
        t0(),
    )
    .await;

    let day = "2024-09-14";
    assert_eq!(
        store
            .daily_message_count("guild-1", "text-1", "A", day)
            .expect("count"),
        2
    );
    for target in ["B", "C"] {
        assert_eq!(
            store
                .daily_interaction_count("guild-1", "A", target, "mention", day)
                .expect("count"),
            2
        );
    }
    assert_eq!(
        store
            .daily_interaction_count("guild-1", "A", "D", "reply", day)
            .expect("count"),
        2
    );
    assert_eq!(
        store
            .daily_interaction_count("guild-1", "A", "A", "mention", day)
            .expect("count"),
        0
    );
    assert_eq!(
        store.member_daily_counts("guild-1", day).expect("counts").joins,
        1
    );
}

#[tokio::test]
async fn integration_http_ingest_receives_signed_message_and_edges() {
    let server = MockServer::start();
    let message = server.mock(|when, then| {
        when.method(POST)
            .path("/ingest")
            .header("x-guildpulse-event", "message_created")
            .header_exists("x-guildpulse-signature");
        then.status(200);
    });
    let edges = server.mock(|when, then| {
        when.method(POST)
            .path("/ingest")
            .header("x-guildpulse-event", "interaction")
            .header_exists("x-guildpulse-signature");
        then.status(200);
    });

    let sink = HttpIngestSink::new(HttpIngestConfig {
        base_url: server.base_url(),
        signing_secret: "shared-secret".to_string(),
        request_timeout_ms: 2_000,
    })
    .expect("sink");
    let runtime = runtime_with(Arc::new(sink));
    settle(&runtime, message_a_to_b_c_replying_d(), t0()).await;

    message.assert_calls(1);
    edges.assert_calls(3);
}

#[test]
fn integration_signature_covers_exact_serialized_fact() {
    let router = EventRouter::new(Arc::new(VoiceSessionTracker::new()));
    let facts = router.route(&message_a_to_b_c_replying_d(), t0());
    let body = serde_json::to_vec(&facts[0]).expect("encode");
    let signature = sign_payload("shared-secret", &body).expect("sign");
    verify_payload_signature("shared-secret", &body, &signature).expect("verify");

    let decoded: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(decoded["type"], "message_created");
    assert_eq!(decoded["timestamp"], "2024-09-14T19:30:00.000Z");
    assert_eq!(
        decoded["mentioned_user_ids"],
        serde_json::json!(["B", "C", "A"])
    );
    assert_eq!(decoded["replied_to_user_id"], "D");
}

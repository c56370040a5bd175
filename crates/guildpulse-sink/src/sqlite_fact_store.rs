//! Direct SQLite persistence of facts.
//!
//! Voice sessions are stored as raw rows. Messages, member churn and
//! interactions are folded into per-day counters with
//! increment-if-exists-else-insert upserts, so replays of the same fact are
//! counted rather than rejected.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use guildpulse_core::{format_iso8601, utc_day_key};
use guildpulse_facts::{
    Fact, FactSink, InteractionEdge, MemberJoinFact, MemberLeaveFact, MessageFact,
    VoiceSessionRecord,
};
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVoiceSession {
    pub guild_id: String,
    pub member_id: String,
    pub channel_id: String,
    pub channel_name: String,
    pub started_at: String,
    pub ended_at: String,
    pub duration_minutes: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemberDailyCounts {
    pub joins: u64,
    pub leaves: u64,
}

#[derive(Clone)]
pub struct SqliteFactStore {
    path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl SqliteFactStore {
    pub fn open(path: &Path) -> Result<Self> {
        let connection = open_fact_sqlite_connection(path)?;
        initialize_fact_sqlite_schema(&connection)?;
        Ok(Self {
            path: path.to_path_buf(),
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn daily_message_count(
        &self,
        guild_id: &str,
        channel_id: &str,
        author_id: &str,
        day: &str,
    ) -> Result<u64> {
        let connection = lock_connection(&self.connection);
        let count: Option<i64> = connection
            .query_row(
                r#"
                SELECT message_count FROM message_daily
                WHERE guild_id = ?1 AND channel_id = ?2 AND author_id = ?3 AND day = ?4
                "#,
                params![guild_id, channel_id, author_id, day],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query daily message count")?;
        Ok(non_negative(count))
    }

    pub fn daily_interaction_count(
        &self,
        guild_id: &str,
        source_id: &str,
        target_id: &str,
        kind: &str,
        day: &str,
    ) -> Result<u64> {
        let connection = lock_connection(&self.connection);
        let count: Option<i64> = connection
            .query_row(
                r#"
                SELECT interaction_count FROM interaction_daily
                WHERE guild_id = ?1 AND source_id = ?2 AND target_id = ?3
                  AND kind = ?4 AND day = ?5
                "#,
                params![guild_id, source_id, target_id, kind, day],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query daily interaction count")?;
        Ok(non_negative(count))
    }

    pub fn member_daily_counts(&self, guild_id: &str, day: &str) -> Result<MemberDailyCounts> {
        let connection = lock_connection(&self.connection);
        let counts: Option<(i64, i64)> = connection
            .query_row(
                "SELECT joins, leaves FROM member_daily WHERE guild_id = ?1 AND day = ?2",
                params![guild_id, day],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("failed to query member daily counts")?;
        Ok(counts
            .map(|(joins, leaves)| MemberDailyCounts {
                joins: non_negative(Some(joins)),
                leaves: non_negative(Some(leaves)),
            })
            .unwrap_or_default())
    }

    pub fn voice_sessions(&self, guild_id: &str) -> Result<Vec<StoredVoiceSession>> {
        let connection = lock_connection(&self.connection);
        let mut statement = connection.prepare(
            r#"
            SELECT guild_id, member_id, channel_id, channel_name, started_at, ended_at,
                   duration_minutes
            FROM voice_sessions
            WHERE guild_id = ?1
            ORDER BY started_at ASC, id ASC
            "#,
        )?;
        let rows = statement
            .query_map(params![guild_id], |row| {
                let duration: i64 = row.get(6)?;
                Ok(StoredVoiceSession {
                    guild_id: row.get(0)?,
                    member_id: row.get(1)?,
                    channel_id: row.get(2)?,
                    channel_name: row.get(3)?,
                    started_at: row.get(4)?,
                    ended_at: row.get(5)?,
                    duration_minutes: non_negative(Some(duration)),
                })
            })
            .context("failed to query voice sessions")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to decode voice session row")
    }

    fn persist(connection: &mut Connection, fact: &Fact) -> Result<()> {
        match fact {
            Fact::MessageCreated(message) => persist_message(connection, message),
            Fact::MemberJoin(join) => persist_member_join(connection, join),
            Fact::MemberLeave(leave) => persist_member_leave(connection, leave),
            Fact::VoiceSession(record) => persist_voice_session(connection, record),
            Fact::Interaction(edge) => persist_interaction(connection, edge),
        }
    }
}

#[async_trait]
impl FactSink for SqliteFactStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn deliver(&self, fact: &Fact) -> Result<()> {
        let connection = Arc::clone(&self.connection);
        let fact = fact.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = lock_connection(&connection);
            Self::persist(&mut connection, &fact)
                .with_context(|| format!("failed to persist {} fact", fact.kind().as_str()))
        })
        .await
        .context("sqlite persistence task failed")?
    }
}

fn persist_message(connection: &mut Connection, message: &MessageFact) -> Result<()> {
    let transaction = connection.transaction()?;
    transaction.execute(
        r#"
        INSERT INTO message_daily (guild_id, channel_id, author_id, day, channel_name, message_count)
        VALUES (?1, ?2, ?3, ?4, ?5, 1)
        ON CONFLICT (guild_id, channel_id, author_id, day) DO UPDATE SET
            message_count = message_count + 1,
            channel_name = COALESCE(excluded.channel_name, message_daily.channel_name)
        "#,
        params![
            message.guild_id,
            message.channel_id,
            message.author_id,
            utc_day_key(&message.timestamp),
            message.channel_name,
        ],
    )?;
    transaction.execute(
        r#"
        INSERT INTO members (guild_id, member_id, username, avatar_url)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (guild_id, member_id) DO UPDATE SET
            username = excluded.username,
            avatar_url = excluded.avatar_url
        "#,
        params![
            message.guild_id,
            message.author_id,
            message.author_username,
            message.author_avatar_url,
        ],
    )?;
    transaction.commit()?;
    Ok(())
}

fn persist_member_join(connection: &mut Connection, join: &MemberJoinFact) -> Result<()> {
    let transaction = connection.transaction()?;
    transaction.execute(
        r#"
        INSERT INTO members (guild_id, member_id, username, avatar_url, joined_at, left_at)
        VALUES (?1, ?2, ?3, ?4, ?5, NULL)
        ON CONFLICT (guild_id, member_id) DO UPDATE SET
            username = excluded.username,
            avatar_url = excluded.avatar_url,
            joined_at = excluded.joined_at,
            left_at = NULL
        "#,
        params![
            join.guild_id,
            join.member_id,
            join.username,
            join.avatar_url,
            format_iso8601(&join.timestamp),
        ],
    )?;
    transaction.execute(
        r#"
        INSERT INTO member_daily (guild_id, day, joins, leaves)
        VALUES (?1, ?2, 1, 0)
        ON CONFLICT (guild_id, day) DO UPDATE SET joins = joins + 1
        "#,
        params![join.guild_id, utc_day_key(&join.timestamp)],
    )?;
    transaction.commit()?;
    Ok(())
}

fn persist_member_leave(connection: &mut Connection, leave: &MemberLeaveFact) -> Result<()> {
    let transaction = connection.transaction()?;
    transaction.execute(
        r#"
        INSERT INTO members (guild_id, member_id, left_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (guild_id, member_id) DO UPDATE SET left_at = excluded.left_at
        "#,
        params![
            leave.guild_id,
            leave.member_id,
            format_iso8601(&leave.timestamp)
        ],
    )?;
    transaction.execute(
        r#"
        INSERT INTO member_daily (guild_id, day, joins, leaves)
        VALUES (?1, ?2, 0, 1)
        ON CONFLICT (guild_id, day) DO UPDATE SET leaves = leaves + 1
        "#,
        params![leave.guild_id, utc_day_key(&leave.timestamp)],
    )?;
    transaction.commit()?;
    Ok(())
}

fn persist_voice_session(connection: &mut Connection, record: &VoiceSessionRecord) -> Result<()> {
    let duration_minutes = i64::try_from(record.duration_minutes).with_context(|| {
        format!(
            "duration_minutes {} exceeds sqlite integer",
            record.duration_minutes
        )
    })?;
    connection.execute(
        r#"
        INSERT INTO voice_sessions (
            guild_id, member_id, channel_id, channel_name, started_at, ended_at, duration_minutes
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            record.guild_id,
            record.member_id,
            record.channel_id,
            record.channel_name,
            format_iso8601(&record.started_at),
            format_iso8601(&record.ended_at),
            duration_minutes,
        ],
    )?;
    Ok(())
}

fn persist_interaction(connection: &mut Connection, edge: &InteractionEdge) -> Result<()> {
    connection.execute(
        r#"
        INSERT INTO interaction_daily (guild_id, source_id, target_id, kind, day, interaction_count)
        VALUES (?1, ?2, ?3, ?4, ?5, 1)
        ON CONFLICT (guild_id, source_id, target_id, kind, day) DO UPDATE SET
            interaction_count = interaction_count + 1
        "#,
        params![
            edge.guild_id,
            edge.source_id,
            edge.target_id,
            edge.kind.as_str(),
            utc_day_key(&edge.occurred_at),
        ],
    )?;
    Ok(())
}

fn open_fact_sqlite_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create fact store directory {}", parent.display())
            })?;
        }
    }
    let connection = Connection::open(path)
        .with_context(|| format!("failed to open sqlite fact store {}", path.display()))?;
    connection.busy_timeout(Duration::from_secs(5))?;
    connection.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        "#,
    )?;
    Ok(connection)
}

fn initialize_fact_sqlite_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS members (
                guild_id TEXT NOT NULL,
                member_id TEXT NOT NULL,
                username TEXT NULL,
                avatar_url TEXT NULL,
                joined_at TEXT NULL,
                left_at TEXT NULL,
                PRIMARY KEY (guild_id, member_id)
            );
            CREATE TABLE IF NOT EXISTS member_daily (
                guild_id TEXT NOT NULL,
                day TEXT NOT NULL,
                joins INTEGER NOT NULL DEFAULT 0,
                leaves INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (guild_id, day)
            );
            CREATE TABLE IF NOT EXISTS message_daily (
                guild_id TEXT NOT NULL,
                channel_id TEXT NOT NULL,
                author_id TEXT NOT NULL,
                day TEXT NOT NULL,
                channel_name TEXT NULL,
                message_count INTEGER NOT NULL,
                PRIMARY KEY (guild_id, channel_id, author_id, day)
            );
            CREATE TABLE IF NOT EXISTS voice_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id TEXT NOT NULL,
                member_id TEXT NOT NULL,
                channel_id TEXT NOT NULL,
                channel_name TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT NOT NULL,
                duration_minutes INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS voice_sessions_guild_member
                ON voice_sessions (guild_id, member_id);
            CREATE TABLE IF NOT EXISTS interaction_daily (
                guild_id TEXT NOT NULL,
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                day TEXT NOT NULL,
                interaction_count INTEGER NOT NULL,
                PRIMARY KEY (guild_id, source_id, target_id, kind, day)
            );
            "#,
        )
        .context("failed to initialize sqlite fact schema")
}

fn lock_connection(connection: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    match connection.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn non_negative(value: Option<i64>) -> u64 {
    value
        .and_then(|count| u64::try_from(count).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use guildpulse_facts::InteractionKind;
    use tempfile::tempdir;

    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 2, hour, minute, 0)
            .single()
            .expect("valid instant")
    }

    fn message(author_id: &str, timestamp: DateTime<Utc>) -> Fact {
        Fact::MessageCreated(MessageFact {
            guild_id: "g1".to_string(),
            timestamp,
            message_id: format!("m-{author_id}-{}", timestamp.timestamp()),
            channel_id: "c1".to_string(),
            channel_name: Some("general".to_string()),
            author_id: author_id.to_string(),
            author_username: author_id.to_string(),
            author_avatar_url: None,
            mentioned_user_ids: Vec::new(),
            replied_to_user_id: None,
            content_length: 5,
        })
    }

    fn mention(source: &str, target: &str, occurred_at: DateTime<Utc>) -> Fact {
        Fact::Interaction(InteractionEdge {
            guild_id: "g1".to_string(),
            source_id: source.to_string(),
            target_id: target.to_string(),
            kind: InteractionKind::Mention,
            channel_id: "c1".to_string(),
            occurred_at,
        })
    }

    #[tokio::test]
    async fn functional_message_and_interaction_counters_increment_per_day() {
        let temp = tempdir().expect("tempdir");
        let store = SqliteFactStore::open(&temp.path().join("nested/facts.sqlite")).expect("open");

        store.deliver(&message("a", at(9, 0))).await.expect("first");
        store.deliver(&message("a", at(23, 59))).await.expect("second");
        store
            .deliver(&message("a", at(23, 59) + ChronoDuration::minutes(2)))
            .await
            .expect("next day");
        store.deliver(&mention("a", "b", at(10, 0))).await.expect("edge");
        store.deliver(&mention("a", "b", at(11, 0))).await.expect("edge");

        assert_eq!(
            store
                .daily_message_count("g1", "c1", "a", "2024-06-02")
                .expect("count"),
            2
        );
        assert_eq!(
            store
                .daily_message_count("g1", "c1", "a", "2024-06-03")
                .expect("count"),
            1
        );
        assert_eq!(
            store
                .daily_interaction_count("g1", "a", "b", "mention", "2024-06-02")
                .expect("count"),
            2
        );
        assert_eq!(
            store
                .daily_interaction_count("g1", "a", "b", "reply", "2024-06-02")
                .expect("count"),
            0
        );
    }

    #[tokio::test]
    async fn regression_failed_member_upsert_rolls_back_message_counter() {
        let temp = tempdir().expect("tempdir");
        let store = SqliteFactStore::open(&temp.path().join("facts.sqlite")).expect("open");
        lock_connection(&store.connection)
            .execute_batch("DROP TABLE members;")
            .expect("drop members");

        let error = store
            .deliver(&message("a", at(9, 0)))
            .await
            .expect_err("members upsert fails");
        assert!(error.to_string().contains("message_created"));
        assert_eq!(
            store
                .daily_message_count("g1", "c1", "a", "2024-06-02")
                .expect("count"),
            0
        );
    }

    #[tokio::test]
    async fn functional_member_churn_and_voice_sessions_are_persisted() {
        let temp = tempdir().expect("tempdir");
        let store = SqliteFactStore::open(&temp.path().join("facts.sqlite")).expect("open");

        store
            .deliver(&Fact::MemberJoin(MemberJoinFact {
                guild_id: "g1".to_string(),
                timestamp: at(8, 0),
                member_id: "u1".to_string(),
                username: "alice".to_string(),
                avatar_url: Some("https://cdn.example/a.png".to_string()),
            }))
            .await
            .expect("join");
        store
            .deliver(&Fact::MemberLeave(MemberLeaveFact {
                guild_id: "g1".to_string(),
                timestamp: at(9, 0),
                member_id: "u2".to_string(),
            }))
            .await
            .expect("leave");
        store
            .deliver(&Fact::VoiceSession(VoiceSessionRecord::close(
                "g1",
                "u1",
                "v1",
                "#voice-a",
                at(20, 0),
                at(20, 5),
            )))
            .await
            .expect("voice");

        assert_eq!(
            store.member_daily_counts("g1", "2024-06-02").expect("counts"),
            MemberDailyCounts {
                joins: 1,
                leaves: 1,
            }
        );
        assert_eq!(
            store.voice_sessions("g1").expect("sessions"),
            vec![StoredVoiceSession {
                guild_id: "g1".to_string(),
                member_id: "u1".to_string(),
                channel_id: "v1".to_string(),
                channel_name: "#voice-a".to_string(),
                started_at: "2024-06-02T20:00:00.000Z".to_string(),
                ended_at: "2024-06-02T20:05:00.000Z".to_string(),
                duration_minutes: 5,
            }]
        );
    }

    #[test]
    fn regression_reopening_store_keeps_existing_schema_and_rows() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("facts.sqlite");
        {
            let store = SqliteFactStore::open(&path).expect("open");
            let mut connection = lock_connection(&store.connection);
            SqliteFactStore::persist(&mut connection, &message("a", at(9, 0))).expect("persist");
        }
        let reopened = SqliteFactStore::open(&path).expect("reopen");
        assert_eq!(reopened.path(), path.as_path());
        assert_eq!(
            reopened
                .daily_message_count("g1", "c1", "a", "2024-06-02")
                .expect("count"),
            1
        );
    }
}

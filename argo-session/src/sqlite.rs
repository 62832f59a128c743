//! SQLite-backed [`SessionStore`] (§4.10): one file per assistant install,
//! mirroring the `rusqlite` usage this corpus's local-first desktop state
//! layer uses (schema migrations via idempotent `CREATE TABLE IF NOT
//! EXISTS`, `Mutex<Connection>` behind `spawn_blocking` since `rusqlite`
//! is synchronous).

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use argo_types::{Message, ProfileFact, Role, RunStatus, SessionSummary, StorageError, ToolRun};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::store::{SessionStore, ToolUseStats};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS messages (
    session_id TEXT NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    seq INTEGER
);
CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, seq);

CREATE TABLE IF NOT EXISTS sessions (
    session_id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS session_summaries (
    session_id TEXT PRIMARY KEY,
    summary_text TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    message_count_at_update INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS session_summary_snapshots (
    session_id TEXT NOT NULL,
    summary_text TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    message_count_at_update INTEGER NOT NULL,
    archived_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS profile_facts (
    id TEXT PRIMARY KEY,
    fact_type TEXT NOT NULL,
    text TEXT NOT NULL,
    source TEXT NOT NULL,
    created_at TEXT NOT NULL,
    active INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS tool_runs (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    tool_name TEXT NOT NULL,
    input TEXT NOT NULL,
    output TEXT NOT NULL,
    metadata TEXT NOT NULL,
    created_at TEXT NOT NULL,
    status TEXT NOT NULL,
    error_type TEXT,
    error_message TEXT
);
CREATE INDEX IF NOT EXISTS idx_tool_runs_session ON tool_runs(session_id);
";

fn to_storage_err(e: rusqlite::Error) -> StorageError {
    StorageError::Database(e.to_string())
}

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

fn role_from_str(s: &str) -> Role {
    match s {
        "assistant" => Role::Assistant,
        "system" => Role::System,
        _ => Role::User,
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(e.to_string()))
}

/// SQLite-backed session store. The production backend for a locally
/// hosted install (§4.10).
#[derive(Clone)]
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    /// Open (creating if absent) a session store at `path`, running schema
    /// migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(to_storage_err)?;
        conn.execute_batch(SCHEMA).map_err(to_storage_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-process SQLite database (useful for tests that want the
    /// real SQL path without a temp file).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(to_storage_err)?;
        conn.execute_batch(SCHEMA).map_err(to_storage_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().expect("sqlite connection mutex poisoned");
            f(&guard)
        })
        .await
        .map_err(|e| StorageError::Database(format!("blocking task join error: {e}")))?
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn ensure_session(&self, session_id: &str) -> Result<(), StorageError> {
        let session_id = session_id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO sessions (session_id, created_at) VALUES (?1, ?2)",
                rusqlite::params![session_id, Utc::now().to_rfc3339()],
            )
            .map_err(to_storage_err)?;
            Ok(())
        })
        .await
    }

    async fn append_message(&self, message: Message) -> Result<(), StorageError> {
        self.with_conn(move |conn| {
            let exists: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sessions WHERE session_id = ?1",
                    [&message.session_id],
                    |r| r.get(0),
                )
                .map_err(to_storage_err)?;
            if exists == 0 {
                return Err(StorageError::SessionNotFound(message.session_id.clone()));
            }
            let next_seq: i64 = conn
                .query_row(
                    "SELECT COALESCE(MAX(seq), -1) + 1 FROM messages WHERE session_id = ?1",
                    [&message.session_id],
                    |r| r.get(0),
                )
                .map_err(to_storage_err)?;
            conn.execute(
                "INSERT INTO messages (session_id, role, content, created_at, seq) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    message.session_id,
                    role_to_str(message.role),
                    message.content,
                    message.created_at.to_rfc3339(),
                    next_seq,
                ],
            )
            .map_err(to_storage_err)?;
            Ok(())
        })
        .await
    }

    async fn last_messages(&self, session_id: &str, k: usize) -> Result<Vec<Message>, StorageError> {
        let session_id = session_id.to_string();
        self.with_conn(move |conn| {
            let exists: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sessions WHERE session_id = ?1",
                    [&session_id],
                    |r| r.get(0),
                )
                .map_err(to_storage_err)?;
            if exists == 0 {
                return Err(StorageError::SessionNotFound(session_id));
            }
            let mut stmt = conn
                .prepare(
                    "SELECT role, content, created_at FROM messages WHERE session_id = ?1 \
                     ORDER BY seq DESC LIMIT ?2",
                )
                .map_err(to_storage_err)?;
            let rows = stmt
                .query_map(rusqlite::params![session_id, k as i64], |r| {
                    let role: String = r.get(0)?;
                    let content: String = r.get(1)?;
                    let created_at: String = r.get(2)?;
                    Ok((role, content, created_at))
                })
                .map_err(to_storage_err)?;
            let mut out = Vec::new();
            for row in rows {
                let (role, content, created_at) = row.map_err(to_storage_err)?;
                out.push(Message {
                    session_id: session_id.clone(),
                    role: role_from_str(&role),
                    content,
                    created_at: parse_timestamp(&created_at)?,
                });
            }
            out.reverse();
            Ok(out)
        })
        .await
    }

    async fn message_count(&self, session_id: &str) -> Result<u64, StorageError> {
        let session_id = session_id.to_string();
        self.with_conn(move |conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
                    [&session_id],
                    |r| r.get(0),
                )
                .map_err(to_storage_err)?;
            Ok(count as u64)
        })
        .await
    }

    async fn messages_since_summary(&self, session_id: &str) -> Result<u64, StorageError> {
        let total = self.message_count(session_id).await?;
        let since_update = self
            .live_summary(session_id)
            .await?
            .map(|s| s.message_count_at_update)
            .unwrap_or(0);
        Ok(total.saturating_sub(since_update))
    }

    async fn live_summary(&self, session_id: &str) -> Result<Option<SessionSummary>, StorageError> {
        let session_id = session_id.to_string();
        self.with_conn(move |conn| {
            let row = conn.query_row(
                "SELECT summary_text, updated_at, message_count_at_update FROM session_summaries \
                 WHERE session_id = ?1",
                [&session_id],
                |r| {
                    let text: String = r.get(0)?;
                    let updated_at: String = r.get(1)?;
                    let count: i64 = r.get(2)?;
                    Ok((text, updated_at, count))
                },
            );
            match row {
                Ok((text, updated_at, count)) => Ok(Some(SessionSummary {
                    session_id,
                    summary_text: text,
                    updated_at: parse_timestamp(&updated_at)?,
                    message_count_at_update: count as u64,
                })),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(to_storage_err(e)),
            }
        })
        .await
    }

    async fn replace_summary(&self, new_summary: SessionSummary) -> Result<(), StorageError> {
        self.with_conn(move |conn| {
            let existing = conn.query_row(
                "SELECT summary_text, updated_at, message_count_at_update FROM session_summaries \
                 WHERE session_id = ?1",
                [&new_summary.session_id],
                |r| {
                    let text: String = r.get(0)?;
                    let updated_at: String = r.get(1)?;
                    let count: i64 = r.get(2)?;
                    Ok((text, updated_at, count))
                },
            );
            if let Ok((text, updated_at, count)) = existing {
                conn.execute(
                    "INSERT INTO session_summary_snapshots \
                     (session_id, summary_text, updated_at, message_count_at_update, archived_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        new_summary.session_id,
                        text,
                        updated_at,
                        count,
                        Utc::now().to_rfc3339(),
                    ],
                )
                .map_err(to_storage_err)?;
            }
            conn.execute(
                "INSERT INTO session_summaries (session_id, summary_text, updated_at, message_count_at_update) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(session_id) DO UPDATE SET \
                     summary_text = excluded.summary_text, \
                     updated_at = excluded.updated_at, \
                     message_count_at_update = excluded.message_count_at_update",
                rusqlite::params![
                    new_summary.session_id,
                    new_summary.summary_text,
                    new_summary.updated_at.to_rfc3339(),
                    new_summary.message_count_at_update as i64,
                ],
            )
            .map_err(to_storage_err)?;
            Ok(())
        })
        .await
    }

    async fn append_profile_fact(&self, fact: ProfileFact) -> Result<(), StorageError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO profile_facts (id, fact_type, text, source, created_at, active) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    fact.id,
                    fact.fact_type,
                    fact.text,
                    fact.source,
                    fact.created_at.to_rfc3339(),
                    fact.active as i64,
                ],
            )
            .map_err(to_storage_err)?;
            Ok(())
        })
        .await
    }

    async fn set_fact_active(&self, fact_id: &str, active: bool) -> Result<(), StorageError> {
        let fact_id = fact_id.to_string();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE profile_facts SET active = ?1 WHERE id = ?2",
                    rusqlite::params![active as i64, fact_id],
                )
                .map_err(to_storage_err)?;
            if changed == 0 {
                return Err(StorageError::Database(format!("fact not found: {fact_id}")));
            }
            Ok(())
        })
        .await
    }

    async fn active_profile_facts(&self) -> Result<Vec<ProfileFact>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, fact_type, text, source, created_at, active FROM profile_facts \
                     WHERE active = 1 ORDER BY created_at DESC",
                )
                .map_err(to_storage_err)?;
            let rows = stmt
                .query_map([], |r| {
                    let id: String = r.get(0)?;
                    let fact_type: String = r.get(1)?;
                    let text: String = r.get(2)?;
                    let source: String = r.get(3)?;
                    let created_at: String = r.get(4)?;
                    let active: i64 = r.get(5)?;
                    Ok((id, fact_type, text, source, created_at, active))
                })
                .map_err(to_storage_err)?;
            let mut out = Vec::new();
            for row in rows {
                let (id, fact_type, text, source, created_at, active) = row.map_err(to_storage_err)?;
                out.push(ProfileFact {
                    id,
                    fact_type,
                    text,
                    source,
                    created_at: parse_timestamp(&created_at)?,
                    active: active != 0,
                });
            }
            Ok(out)
        })
        .await
    }

    async fn append_tool_run(&self, run: ToolRun) -> Result<(), StorageError> {
        self.with_conn(move |conn| {
            let metadata = serde_json::to_string(&run.metadata)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            conn.execute(
                "INSERT INTO tool_runs \
                 (id, session_id, tool_name, input, output, metadata, created_at, status, error_type, error_message) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    run.id,
                    run.session_id,
                    run.tool_name,
                    run.input,
                    run.output,
                    metadata,
                    run.created_at.to_rfc3339(),
                    match run.status {
                        RunStatus::Ok => "ok",
                        RunStatus::Error => "error",
                    },
                    run.error_type,
                    run.error_message,
                ],
            )
            .map_err(to_storage_err)?;
            Ok(())
        })
        .await
    }

    async fn tool_use_stats(&self, session_id: &str) -> Result<ToolUseStats, StorageError> {
        let session_id = session_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT tool_name, status FROM tool_runs WHERE session_id = ?1")
                .map_err(to_storage_err)?;
            let rows = stmt
                .query_map([&session_id], |r| {
                    let tool_name: String = r.get(0)?;
                    let status: String = r.get(1)?;
                    Ok((tool_name, status))
                })
                .map_err(to_storage_err)?;
            let mut stats = ToolUseStats::default();
            let mut by_tool: BTreeMap<String, u64> = BTreeMap::new();
            for row in rows {
                let (tool_name, status) = row.map_err(to_storage_err)?;
                stats.total_runs += 1;
                if status == "ok" {
                    stats.ok_runs += 1;
                } else {
                    stats.error_runs += 1;
                }
                *by_tool.entry(tool_name).or_insert(0) += 1;
            }
            stats.by_tool = by_tool;
            Ok(stats)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argo_types::Role;

    #[tokio::test]
    async fn round_trips_messages_in_order() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        store.ensure_session("s1").await.unwrap();
        for i in 0..5 {
            store
                .append_message(Message::new("s1", Role::User, format!("m{i}")))
                .await
                .unwrap();
        }
        let last = store.last_messages("s1", 3).await.unwrap();
        assert_eq!(last.len(), 3);
        assert_eq!(last[0].content, "m2");
        assert_eq!(last[2].content, "m4");
    }

    #[tokio::test]
    async fn replace_summary_is_atomic_and_snapshots_previous() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        store.ensure_session("s1").await.unwrap();
        store
            .replace_summary(SessionSummary {
                session_id: "s1".to_string(),
                summary_text: "v1".to_string(),
                updated_at: Utc::now(),
                message_count_at_update: 5,
            })
            .await
            .unwrap();
        store
            .replace_summary(SessionSummary {
                session_id: "s1".to_string(),
                summary_text: "v2".to_string(),
                updated_at: Utc::now(),
                message_count_at_update: 20,
            })
            .await
            .unwrap();
        let live = store.live_summary("s1").await.unwrap().unwrap();
        assert_eq!(live.summary_text, "v2");
    }

    #[tokio::test]
    async fn append_message_to_unknown_session_errors() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        let err = store
            .append_message(Message::new("ghost", Role::User, "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn open_on_disk_persists_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("argo.sqlite3");
        {
            let store = SqliteSessionStore::open(&path).unwrap();
            store.ensure_session("s1").await.unwrap();
            store
                .append_message(Message::new("s1", Role::User, "hello"))
                .await
                .unwrap();
        }
        let reopened = SqliteSessionStore::open(&path).unwrap();
        let messages = reopened.last_messages("s1", 10).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hello");
    }
}

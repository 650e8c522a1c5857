//! Embedded SQLite Storage
//!
//! Information Hiding:
//! - Database file location and schema creation hidden behind `open`
//! - One long-lived connection guarded by a mutex, one statement per call
//! - Timestamps assigned by SQLite on insert with millisecond precision

use super::{ArchivedChat, ConversationRecord, Storage, StoreError, StoreResult};
use crate::knowledge::FaqEntry;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use tokio::sync::Mutex;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS faq (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category TEXT NOT NULL,
        question TEXT NOT NULL,
        answer TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS conversations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        employee_id TEXT NOT NULL,
        user_query TEXT NOT NULL,
        bot_response TEXT NOT NULL,
        timestamp TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );

    CREATE INDEX IF NOT EXISTS idx_conversations_employee ON conversations (employee_id);

    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT UNIQUE NOT NULL,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );

    CREATE TABLE IF NOT EXISTS chats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users (id),
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );
";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// SQLite storage - a single database file shared by all tables
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) the database file at `path`, creating parent directories
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("cannot create directory {:?}: {}", parent, e))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| StoreError::Unavailable(format!("cannot open {:?}: {}", path, e)))?;
        tracing::debug!("[SqliteStorage] Opened database at {:?}", path);
        Self::with_connection(conn)
    }

    /// Private in-memory database, used by tests and throwaway runs
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn parse_timestamp(value: String) -> StoreResult<DateTime<Utc>> {
    match NaiveDateTime::parse_from_str(&value, TIMESTAMP_FORMAT) {
        Ok(naive) => Ok(naive.and_utc()),
        Err(source) => Err(StoreError::Timestamp { value, source }),
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn seed_if_empty(&self, entries: &[FaqEntry]) -> StoreResult<usize> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let count: i64 = tx.query_row("SELECT COUNT(*) FROM faq", [], |row| row.get(0))?;
        if count > 0 {
            tracing::debug!("[SqliteStorage] FAQ table already seeded ({} rows)", count);
            return Ok(0);
        }

        {
            let mut stmt =
                tx.prepare("INSERT INTO faq (category, question, answer) VALUES (?1, ?2, ?3)")?;
            for entry in entries {
                stmt.execute(params![
                    &*entry.category,
                    &*entry.question,
                    &*entry.answer
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!("[SqliteStorage] Seeded {} FAQ rows", entries.len());
        Ok(entries.len())
    }

    async fn find_by_text(&self, query: &str) -> StoreResult<Option<String>> {
        let conn = self.conn.lock().await;
        // instr() is case-sensitive and treats '%' and '_' literally, unlike LIKE
        let answer = conn
            .query_row(
                "SELECT answer FROM faq
                 WHERE instr(question, ?1) > 0 OR instr(answer, ?1) > 0
                 ORDER BY id
                 LIMIT 1",
                params![query],
                |row| row.get(0),
            )
            .optional()?;
        Ok(answer)
    }

    async fn faq_count(&self) -> StoreResult<i64> {
        let conn = self.conn.lock().await;
        Ok(conn.query_row("SELECT COUNT(*) FROM faq", [], |row| row.get(0))?)
    }

    async fn record(
        &self,
        user_id: &str,
        query: &str,
        response: &str,
    ) -> StoreResult<ConversationRecord> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO conversations (employee_id, user_query, bot_response) VALUES (?1, ?2, ?3)",
            params![user_id, query, response],
        )?;
        let id = conn.last_insert_rowid();
        let timestamp: String = conn.query_row(
            "SELECT timestamp FROM conversations WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;

        tracing::debug!("[SqliteStorage] Recorded conversation {} for '{}'", id, user_id);
        Ok(ConversationRecord {
            id,
            user_id: user_id.to_string(),
            query: query.to_string(),
            response: response.to_string(),
            timestamp: parse_timestamp(timestamp)?,
        })
    }

    async fn count_by_user(&self, user_id: &str) -> StoreResult<i64> {
        let conn = self.conn.lock().await;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM conversations WHERE employee_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?)
    }

    async fn ensure_user(&self, username: &str) -> StoreResult<i64> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO users (username) VALUES (?1) ON CONFLICT (username) DO NOTHING",
            params![username],
        )?;
        Ok(conn.query_row(
            "SELECT id FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )?)
    }

    async fn save_chat(&self, user_id: i64, role: &str, content: &str) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO chats (user_id, role, content) VALUES (?1, ?2, ?3)",
            params![user_id, role, content],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::UnknownUser(user_id)
            }
            other => StoreError::Sqlite(other),
        })?;
        Ok(())
    }

    async fn chat_history(&self, user_id: i64, limit: usize) -> StoreResult<Vec<ArchivedChat>> {
        let limit = limit as i64;
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT role, content, created_at FROM chats
             WHERE user_id = ?1
             ORDER BY id DESC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![user_id, limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut history = rows
            .into_iter()
            .map(|(role, content, created_at)| {
                Ok(ArchivedChat {
                    role,
                    content,
                    created_at: parse_timestamp(created_at)?,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;
        history.reverse();
        Ok(history)
    }
}

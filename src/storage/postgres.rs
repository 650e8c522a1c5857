//! Networked Postgres Storage
//!
//! Information Hiding:
//! - Connection pool sizing and lifecycle hidden behind `connect`/`close`
//! - Postgres dialect (BIGSERIAL, TIMESTAMPTZ, strpos) kept out of callers
//! - Same observable contract as the embedded SQLite backend

use super::{ArchivedChat, ConversationRecord, Storage, StoreError, StoreResult};
use crate::knowledge::FaqEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};

const SCHEMA: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS faq (
        id BIGSERIAL PRIMARY KEY,
        category TEXT NOT NULL,
        question TEXT NOT NULL,
        answer TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS conversations (
        id BIGSERIAL PRIMARY KEY,
        employee_id TEXT NOT NULL,
        user_query TEXT NOT NULL,
        bot_response TEXT NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE INDEX IF NOT EXISTS idx_conversations_employee ON conversations (employee_id)",
    "CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username TEXT UNIQUE NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS chats (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users (id),
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
];

/// Postgres storage backed by a connection pool
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connect to `url` and create the schema.
    /// Connection failures surface as `StoreError::Unavailable`.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("cannot connect to postgres: {}", e)))?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }

        tracing::debug!("[PostgresStorage] Connected with up to {} connections", max_connections);
        Ok(Self { pool })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn seed_if_empty(&self, entries: &[FaqEntry]) -> StoreResult<usize> {
        let mut tx = self.pool.begin().await?;
        // Serialises concurrent startups so only one of them seeds
        sqlx::query("LOCK TABLE faq IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM faq")
            .fetch_one(&mut *tx)
            .await?;
        if count > 0 {
            tracing::debug!("[PostgresStorage] FAQ table already seeded ({} rows)", count);
            tx.rollback().await?;
            return Ok(0);
        }

        for entry in entries {
            sqlx::query("INSERT INTO faq (category, question, answer) VALUES ($1, $2, $3)")
                .bind(&*entry.category)
                .bind(&*entry.question)
                .bind(&*entry.answer)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::debug!("[PostgresStorage] Seeded {} FAQ rows", entries.len());
        Ok(entries.len())
    }

    async fn find_by_text(&self, query: &str) -> StoreResult<Option<String>> {
        let answer = sqlx::query_scalar(
            "SELECT answer FROM faq
             WHERE strpos(question, $1) > 0 OR strpos(answer, $1) > 0
             ORDER BY id
             LIMIT 1",
        )
        .bind(query)
        .fetch_optional(&self.pool)
        .await?;
        Ok(answer)
    }

    async fn faq_count(&self) -> StoreResult<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM faq")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn record(
        &self,
        user_id: &str,
        query: &str,
        response: &str,
    ) -> StoreResult<ConversationRecord> {
        let (id, timestamp): (i64, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO conversations (employee_id, user_query, bot_response)
             VALUES ($1, $2, $3)
             RETURNING id, timestamp",
        )
        .bind(user_id)
        .bind(query)
        .bind(response)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("[PostgresStorage] Recorded conversation {} for '{}'", id, user_id);
        Ok(ConversationRecord {
            id,
            user_id: user_id.to_string(),
            query: query.to_string(),
            response: response.to_string(),
            timestamp,
        })
    }

    async fn count_by_user(&self, user_id: &str) -> StoreResult<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM conversations WHERE employee_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn ensure_user(&self, username: &str) -> StoreResult<i64> {
        sqlx::query("INSERT INTO users (username) VALUES ($1) ON CONFLICT (username) DO NOTHING")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
            .bind(username)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn save_chat(&self, user_id: i64, role: &str, content: &str) -> StoreResult<()> {
        sqlx::query("INSERT INTO chats (user_id, role, content) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(role)
            .bind(content)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                    StoreError::UnknownUser(user_id)
                }
                other => StoreError::Postgres(other),
            })?;
        Ok(())
    }

    async fn chat_history(&self, user_id: i64, limit: usize) -> StoreResult<Vec<ArchivedChat>> {
        let rows: Vec<(String, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT role, content, created_at FROM chats
             WHERE user_id = $1
             ORDER BY id DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .rev()
            .map(|(role, content, created_at)| ArchivedChat {
                role,
                content,
                created_at,
            })
            .collect())
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("[PostgresStorage] Connection pool closed");
    }
}

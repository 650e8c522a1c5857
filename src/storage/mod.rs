//! Storage Boundary
//!
//! Information Hiding:
//! - Backend choice (embedded SQLite, networked Postgres, in-process) hidden behind one trait
//! - SQL dialect differences and connection handling stay inside each backend
//! - Resolver, conversation log and chatbot only ever see `Arc<dyn Storage>`

use crate::config::Settings;
use crate::knowledge::FaqEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub mod memory;
pub mod postgres;
pub mod sqlite;

/// Errors raised by storage backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("invalid timestamp '{value}': {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("unknown chat user id {0}")]
    UnknownUser(i64),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One logged query/response pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: i64,
    pub user_id: String,
    pub query: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

/// One message of the secondary chat archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedChat {
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Storage interface shared by every backend
///
/// All operations are single statements with autocommit semantics, except
/// `seed_if_empty` which checks and inserts inside one transaction.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;

    /// Insert `entries` only when the FAQ table is empty.
    /// Returns the number of rows inserted.
    async fn seed_if_empty(&self, entries: &[FaqEntry]) -> StoreResult<usize>;

    /// Answer of the first FAQ row (storage order) whose question or answer
    /// contains `query`, compared case-sensitively
    async fn find_by_text(&self, query: &str) -> StoreResult<Option<String>>;

    /// Number of FAQ rows
    async fn faq_count(&self) -> StoreResult<i64>;

    /// Append a conversation record; the timestamp is assigned on insert
    async fn record(
        &self,
        user_id: &str,
        query: &str,
        response: &str,
    ) -> StoreResult<ConversationRecord>;

    /// Number of conversation records logged for `user_id`
    async fn count_by_user(&self, user_id: &str) -> StoreResult<i64>;

    // Secondary chat archive (users/chats)

    /// Id of the archive user named `username`, creating it when missing
    async fn ensure_user(&self, username: &str) -> StoreResult<i64>;

    async fn save_chat(&self, user_id: i64, role: &str, content: &str) -> StoreResult<()>;

    /// The most recent `limit` archived messages of a user, oldest first
    async fn chat_history(&self, user_id: i64, limit: usize) -> StoreResult<Vec<ArchivedChat>>;

    /// Release backend resources. Dropping the handle is enough for most backends.
    async fn close(&self) {}
}

/// Backend chosen once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// In-process storage (lost on process termination)
    Memory,
    /// Embedded file-backed SQLite database
    Sqlite(PathBuf),
    /// Networked Postgres reached through a connection string
    Postgres(String),
}

/// Connection string variable of the hosted (Neon) deployment
pub const LEGACY_URL_ENV: &str = "NEON_DATABASE_URL";

impl Backend {
    /// A connection string in the environment selects Postgres; otherwise
    /// the embedded SQLite file is used.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::select(settings, |name| std::env::var(name).ok())
    }

    fn select(settings: &Settings, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let url = [settings.database.url_env.as_str(), LEGACY_URL_ENV]
            .into_iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty());

        match url {
            Some(url) => Backend::Postgres(url),
            None => Backend::Sqlite(PathBuf::from(&settings.database.sqlite_path)),
        }
    }
}

/// Open the selected backend and create its schema.
/// Any failure here is fatal for the process.
pub async fn connect(backend: &Backend, settings: &Settings) -> StoreResult<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match backend {
        Backend::Memory => Arc::new(memory::InMemoryStorage::new()),
        Backend::Sqlite(path) => Arc::new(sqlite::SqliteStorage::open(path)?),
        Backend::Postgres(url) => {
            let max_connections = settings.database.max_connections;
            Arc::new(postgres::PostgresStorage::connect(url, max_connections).await?)
        }
    };

    tracing::info!("Storage backend '{}' ready", storage.backend_name());
    Ok(storage)
}

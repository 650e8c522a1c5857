//! In-Memory Storage
//!
//! Information Hiding:
//! - Vec-backed tables hidden from users
//! - Thread-safe access via RwLock hidden behind async interface
//! - Suitable for testing and ephemeral sessions

use super::{ArchivedChat, ConversationRecord, Storage, StoreError, StoreResult};
use crate::knowledge::FaqEntry;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    faq: Vec<FaqEntry>,
    conversations: Vec<ConversationRecord>,
    users: HashMap<String, i64>,
    chats: Vec<(i64, ArchivedChat)>,
}

/// In-memory storage, data is lost when process terminates
pub struct InMemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn seed_if_empty(&self, entries: &[FaqEntry]) -> StoreResult<usize> {
        let mut tables = self.tables.write().await;
        if !tables.faq.is_empty() {
            tracing::debug!(
                "[InMemoryStorage] FAQ table already seeded ({} rows)",
                tables.faq.len()
            );
            return Ok(0);
        }
        tables.faq.extend_from_slice(entries);
        tracing::debug!("[InMemoryStorage] Seeded {} FAQ rows", entries.len());
        Ok(entries.len())
    }

    async fn find_by_text(&self, query: &str) -> StoreResult<Option<String>> {
        let tables = self.tables.read().await;
        Ok(tables
            .faq
            .iter()
            .find(|faq| faq.contains(query))
            .map(|faq| faq.answer.to_string()))
    }

    async fn faq_count(&self) -> StoreResult<i64> {
        Ok(self.tables.read().await.faq.len() as i64)
    }

    async fn record(
        &self,
        user_id: &str,
        query: &str,
        response: &str,
    ) -> StoreResult<ConversationRecord> {
        let mut tables = self.tables.write().await;
        let record = ConversationRecord {
            id: tables.conversations.len() as i64 + 1,
            user_id: user_id.to_string(),
            query: query.to_string(),
            response: response.to_string(),
            timestamp: Utc::now(),
        };
        tables.conversations.push(record.clone());
        tracing::debug!("[InMemoryStorage] Recorded conversation {} for '{}'", record.id, user_id);
        Ok(record)
    }

    async fn count_by_user(&self, user_id: &str) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .conversations
            .iter()
            .filter(|record| record.user_id == user_id)
            .count() as i64)
    }

    async fn ensure_user(&self, username: &str) -> StoreResult<i64> {
        let mut tables = self.tables.write().await;
        let next_id = tables.users.len() as i64 + 1;
        Ok(*tables.users.entry(username.to_string()).or_insert(next_id))
    }

    async fn save_chat(&self, user_id: i64, role: &str, content: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.values().any(|id| *id == user_id) {
            return Err(StoreError::UnknownUser(user_id));
        }
        tables.chats.push((
            user_id,
            ArchivedChat {
                role: role.to_string(),
                content: content.to_string(),
                created_at: Utc::now(),
            },
        ));
        Ok(())
    }

    async fn chat_history(&self, user_id: i64, limit: usize) -> StoreResult<Vec<ArchivedChat>> {
        let tables = self.tables.read().await;
        let mut recent: Vec<ArchivedChat> = tables
            .chats
            .iter()
            .rev()
            .filter(|(owner, _)| *owner == user_id)
            .take(limit)
            .map(|(_, chat)| chat.clone())
            .collect();
        recent.reverse();
        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::SEED_FAQS;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let storage = InMemoryStorage::new();
        assert_eq!(storage.seed_if_empty(SEED_FAQS).await.unwrap(), 6);
        assert_eq!(storage.seed_if_empty(SEED_FAQS).await.unwrap(), 0);
        assert_eq!(storage.faq_count().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_find_first_match_wins() {
        let storage = InMemoryStorage::new();
        let entries = vec![
            FaqEntry::owned("A", "first question", "shared answer one"),
            FaqEntry::owned("B", "second question", "shared answer two"),
        ];
        storage.seed_if_empty(&entries).await.unwrap();

        let found = storage.find_by_text("shared").await.unwrap();
        assert_eq!(found.as_deref(), Some("shared answer one"));
        assert_eq!(storage.find_by_text("SHARED").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_record_and_count() {
        let storage = InMemoryStorage::new();
        storage.record("NUT-1", "hola", "menu").await.unwrap();
        storage.record("NUT-1", "bono", "bonos").await.unwrap();
        storage.record("NUT-2", "hola", "menu").await.unwrap();

        assert_eq!(storage.count_by_user("NUT-1").await.unwrap(), 2);
        assert_eq!(storage.count_by_user("NUT-3").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_chat_history_limit() {
        let storage = InMemoryStorage::new();
        let user = storage.ensure_user("ana").await.unwrap();
        assert_eq!(storage.ensure_user("ana").await.unwrap(), user);

        for i in 0..5 {
            storage.save_chat(user, "user", &format!("msg {}", i)).await.unwrap();
        }

        let history = storage.chat_history(user, 3).await.unwrap();
        let contents: Vec<&str> = history.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 2", "msg 3", "msg 4"]);
    }

    #[tokio::test]
    async fn test_save_chat_unknown_user() {
        let storage = InMemoryStorage::new();
        let result = storage.save_chat(42, "user", "hola").await;
        assert!(matches!(result, Err(StoreError::UnknownUser(42))));
    }
}

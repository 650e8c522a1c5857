//! Chatbot
//!
//! One synchronous round trip per user turn: resolve, log, archive, render.
//! Logging and archiving are best-effort; only resolution is on the critical path.

use crate::config::Settings;
use crate::conversation_log::ConversationLog;
use crate::knowledge::Topic;
use crate::resolver::Resolver;
use crate::session::{ChatRole, Session};
use crate::storage::{ArchivedChat, Storage, StoreError, StoreResult};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("log in with your employee ID or email first")]
    NotLoggedIn,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub struct Chatbot {
    store: Arc<dyn Storage>,
    resolver: Resolver,
    log: ConversationLog,
    archive_chats: bool,
    history_limit: usize,
}

impl Chatbot {
    pub fn new(store: Arc<dyn Storage>, settings: &Settings) -> Self {
        Self {
            resolver: Resolver::new(store.clone()),
            log: ConversationLog::new(store.clone()),
            store,
            archive_chats: settings.bot.archive_chats,
            history_limit: settings.bot.history_limit,
        }
    }

    /// Answer one query for the logged-in user of `session`
    pub async fn ask(&self, session: &mut Session, query: &str) -> Result<String, BotError> {
        let user_id = session.user_id().ok_or(BotError::NotLoggedIn)?.to_string();

        session.push(ChatRole::User, query);
        let response = self.resolver.resolve(query).await;
        self.log.record(&user_id, query, &response).await;

        if self.archive_chats {
            self.archive_turn(&user_id, query, &response).await;
        }

        session.push(ChatRole::Assistant, response.clone());
        Ok(response)
    }

    /// Same as typing the topic's query
    pub async fn ask_topic(&self, session: &mut Session, topic: Topic) -> Result<String, BotError> {
        self.ask(session, topic.query()).await
    }

    /// Queries logged for the session's user
    pub async fn query_count(&self, session: &Session) -> Result<i64, BotError> {
        let user_id = session.user_id().ok_or(BotError::NotLoggedIn)?;
        Ok(self.log.count_by_user(user_id).await?)
    }

    /// Most recent archived messages of `username`, oldest first
    pub async fn archived_history(&self, username: &str) -> Result<Vec<ArchivedChat>, BotError> {
        let user = self.store.ensure_user(username).await?;
        Ok(self.store.chat_history(user, self.history_limit).await?)
    }

    async fn archive_turn(&self, username: &str, query: &str, response: &str) {
        let result: StoreResult<()> = async {
            let user = self.store.ensure_user(username).await?;
            self.store
                .save_chat(user, ChatRole::User.as_str(), query)
                .await?;
            self.store
                .save_chat(user, ChatRole::Assistant.as_str(), response)
                .await
        }
        .await;

        if let Err(e) = result {
            tracing::error!("Failed to archive chat turn for '{}': {}", username, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{FaqEntry, DEFAULT_MENU, SEED_FAQS};
    use crate::storage::memory::InMemoryStorage;
    use crate::storage::ConversationRecord;
    use async_trait::async_trait;

    async fn bot_with_storage() -> (Chatbot, Arc<dyn Storage>) {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        storage.seed_if_empty(SEED_FAQS).await.unwrap();
        (Chatbot::new(storage.clone(), &Settings::default()), storage)
    }

    #[tokio::test]
    async fn test_ask_requires_login() {
        let (bot, storage) = bot_with_storage().await;
        let mut session = Session::new();

        let result = bot.ask(&mut session, "bono").await;
        assert!(matches!(result, Err(BotError::NotLoggedIn)));
        assert!(session.history().is_empty());
        assert_eq!(storage.count_by_user("").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ask_updates_history_log_and_archive() {
        let (bot, storage) = bot_with_storage().await;
        let mut session = Session::new();
        session.login("NUT-00123", "nutrisco.cl").unwrap();

        let answer = bot.ask(&mut session, "asdf").await.unwrap();
        assert_eq!(answer, DEFAULT_MENU);

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[0].content, "asdf");
        assert_eq!(history[1].role, ChatRole::Assistant);

        assert_eq!(bot.query_count(&session).await.unwrap(), 1);
        assert_eq!(storage.count_by_user("NUT-00123").await.unwrap(), 1);

        let archived = bot.archived_history("NUT-00123").await.unwrap();
        assert_eq!(archived.len(), 2);
        assert_eq!(archived[0].role, "user");
        assert_eq!(archived[1].content, DEFAULT_MENU);
    }

    #[tokio::test]
    async fn test_topic_matches_typed_query() {
        let (bot, _storage) = bot_with_storage().await;
        let mut session = Session::new();
        session.login("ana@nutrisco.cl", "nutrisco.cl").unwrap();

        for topic in Topic::ALL {
            let via_topic = bot.ask_topic(&mut session, topic).await.unwrap();
            let typed = bot.ask(&mut session, topic.query()).await.unwrap();
            assert_eq!(via_topic, typed);
        }
        assert_eq!(bot.query_count(&session).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_archive_can_be_disabled() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let mut settings = Settings::default();
        settings.bot.archive_chats = false;
        let bot = Chatbot::new(storage.clone(), &settings);

        let mut session = Session::new();
        session.login("NUT-7", "nutrisco.cl").unwrap();
        bot.ask(&mut session, "bono").await.unwrap();

        assert!(bot.archived_history("NUT-7").await.unwrap().is_empty());
        assert_eq!(storage.count_by_user("NUT-7").await.unwrap(), 1);
    }

    /// Serves answers but rejects every write
    struct ReadOnlyStore(InMemoryStorage);

    #[async_trait]
    impl Storage for ReadOnlyStore {
        fn backend_name(&self) -> &'static str {
            "read-only"
        }
        async fn seed_if_empty(&self, entries: &[FaqEntry]) -> StoreResult<usize> {
            self.0.seed_if_empty(entries).await
        }
        async fn find_by_text(&self, query: &str) -> StoreResult<Option<String>> {
            self.0.find_by_text(query).await
        }
        async fn faq_count(&self) -> StoreResult<i64> {
            self.0.faq_count().await
        }
        async fn record(&self, _: &str, _: &str, _: &str) -> StoreResult<ConversationRecord> {
            Err(StoreError::Unavailable("read-only".into()))
        }
        async fn count_by_user(&self, user_id: &str) -> StoreResult<i64> {
            self.0.count_by_user(user_id).await
        }
        async fn ensure_user(&self, _: &str) -> StoreResult<i64> {
            Err(StoreError::Unavailable("read-only".into()))
        }
        async fn save_chat(&self, _: i64, _: &str, _: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable("read-only".into()))
        }
        async fn chat_history(&self, user_id: i64, limit: usize) -> StoreResult<Vec<ArchivedChat>> {
            self.0.chat_history(user_id, limit).await
        }
    }

    #[tokio::test]
    async fn test_write_failures_do_not_block_answer() {
        let inner = InMemoryStorage::new();
        inner.seed_if_empty(SEED_FAQS).await.unwrap();
        let storage: Arc<dyn Storage> = Arc::new(ReadOnlyStore(inner));
        let bot = Chatbot::new(storage, &Settings::default());

        let mut session = Session::new();
        session.login("NUT-9", "nutrisco.cl").unwrap();
        let answer = bot.ask(&mut session, "¿Cómo solicito vacaciones?").await.unwrap();

        assert_eq!(answer, SEED_FAQS[0].answer);
        assert_eq!(session.message_count(), 2);
        assert_eq!(bot.query_count(&session).await.unwrap(), 0);
    }
}

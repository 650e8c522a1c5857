//! Query Resolver
//!
//! Maps free text to an answer in three steps:
//! 1. Case-sensitive substring lookup in the answer store (first row wins)
//! 2. Ordered keyword fallback against the lower-cased query (first keyword wins)
//! 3. The default menu
//!
//! Resolution never fails. A storage error degrades to a store miss.

use crate::knowledge::{KeywordAnswer, DEFAULT_MENU, KEYWORD_ANSWERS};
use crate::storage::Storage;
use std::sync::Arc;

/// Resolves queries against an answer store and a keyword table
pub struct Resolver {
    store: Arc<dyn Storage>,
    keywords: &'static [KeywordAnswer],
}

impl Resolver {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self::with_keywords(store, KEYWORD_ANSWERS)
    }

    pub fn with_keywords(store: Arc<dyn Storage>, keywords: &'static [KeywordAnswer]) -> Self {
        Self { store, keywords }
    }

    /// Answer for `query`; total over all inputs
    pub async fn resolve(&self, query: &str) -> String {
        // An empty needle is contained in every row
        if query.is_empty() {
            return DEFAULT_MENU.to_string();
        }

        match self.store.find_by_text(query).await {
            Ok(Some(answer)) => {
                tracing::debug!("Resolved '{}' from answer store", query);
                return answer;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Answer store lookup failed for '{}': {}", query, e);
            }
        }

        match Self::keyword_answer_in(self.keywords, query) {
            Some(answer) => answer.to_string(),
            None => {
                tracing::debug!("No match for '{}', returning default menu", query);
                DEFAULT_MENU.to_string()
            }
        }
    }

    /// Canned answer of the first built-in keyword contained in `query`
    pub fn keyword_answer(query: &str) -> Option<&'static str> {
        Self::keyword_answer_in(KEYWORD_ANSWERS, query)
    }

    fn keyword_answer_in(keywords: &'static [KeywordAnswer], query: &str) -> Option<&'static str> {
        let query_lower = query.to_lowercase();
        keywords
            .iter()
            .find(|entry| query_lower.contains(entry.keyword))
            .map(|entry| entry.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{FaqEntry, SEED_FAQS};
    use crate::storage::memory::InMemoryStorage;
    use crate::storage::{ArchivedChat, ConversationRecord, StoreError, StoreResult};
    use async_trait::async_trait;

    async fn seeded_resolver() -> Resolver {
        let storage = Arc::new(InMemoryStorage::new());
        storage.seed_if_empty(SEED_FAQS).await.unwrap();
        Resolver::new(storage)
    }

    fn keyword(name: &str) -> &'static str {
        KEYWORD_ANSWERS
            .iter()
            .find(|k| k.keyword == name)
            .map(|k| k.answer)
            .unwrap()
    }

    #[tokio::test]
    async fn test_exact_question_returns_seeded_answer() {
        let resolver = seeded_resolver().await;
        let answer = resolver.resolve("¿Cómo solicito vacaciones?").await;
        assert_eq!(answer, SEED_FAQS[0].answer);
    }

    #[tokio::test]
    async fn test_keyword_fallback() {
        let resolver = seeded_resolver().await;
        let answer = resolver.resolve("tengo una duda de bono").await;
        assert_eq!(answer, keyword("bono"));
    }

    #[tokio::test]
    async fn test_keyword_match_ignores_case() {
        let resolver = seeded_resolver().await;
        assert_eq!(resolver.resolve("Mi SALARIO llegó tarde").await, keyword("salario"));
    }

    #[tokio::test]
    async fn test_store_lookup_is_case_sensitive() {
        let resolver = seeded_resolver().await;
        // Upper-case text misses the store and lands on the keyword table
        assert_eq!(resolver.resolve("VACACIONES").await, keyword("vacaciones"));
        // Lower-case text hits the seeded question first
        assert_eq!(resolver.resolve("vacaciones").await, SEED_FAQS[0].answer);
    }

    #[tokio::test]
    async fn test_first_keyword_wins() {
        let resolver = seeded_resolver().await;
        let answer = resolver.resolve("seguro y licencia").await;
        assert_eq!(answer, keyword("licencia"));
    }

    #[tokio::test]
    async fn test_unmatched_and_empty_queries_return_menu() {
        let resolver = seeded_resolver().await;
        assert_eq!(resolver.resolve("asdf").await, DEFAULT_MENU);
        assert_eq!(resolver.resolve("").await, DEFAULT_MENU);
    }

    #[tokio::test]
    async fn test_whitespace_query_is_a_substring_lookup() {
        let resolver = seeded_resolver().await;
        // A single space is contained in the first seeded question
        assert_eq!(resolver.resolve(" ").await, SEED_FAQS[0].answer);
    }

    #[tokio::test]
    async fn test_store_first_match_wins() {
        let storage = Arc::new(InMemoryStorage::new());
        storage
            .seed_if_empty(&[
                FaqEntry::owned("X", "pregunta", "respuesta uno"),
                FaqEntry::owned("Y", "pregunta", "respuesta dos"),
            ])
            .await
            .unwrap();
        let resolver = Resolver::new(storage);
        assert_eq!(resolver.resolve("pregunta").await, "respuesta uno");
    }

    struct BrokenStore;

    #[async_trait]
    impl Storage for BrokenStore {
        fn backend_name(&self) -> &'static str {
            "broken"
        }
        async fn seed_if_empty(&self, _: &[FaqEntry]) -> StoreResult<usize> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn find_by_text(&self, _: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn faq_count(&self) -> StoreResult<i64> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn record(&self, _: &str, _: &str, _: &str) -> StoreResult<ConversationRecord> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn count_by_user(&self, _: &str) -> StoreResult<i64> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn ensure_user(&self, _: &str) -> StoreResult<i64> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn save_chat(&self, _: i64, _: &str, _: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn chat_history(&self, _: i64, _: usize) -> StoreResult<Vec<ArchivedChat>> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_keywords() {
        let resolver = Resolver::new(Arc::new(BrokenStore));
        assert_eq!(resolver.resolve("bono").await, keyword("bono"));
        assert_eq!(resolver.resolve("asdf").await, DEFAULT_MENU);
    }

    #[test]
    fn test_keyword_answer_pure() {
        assert_eq!(Resolver::keyword_answer("LICENCIA médica"), Some(keyword("licencia")));
        assert_eq!(Resolver::keyword_answer("nada"), None);
    }
}

//! Conversation Log
//!
//! Append-only record of every answered query. Writes are best-effort:
//! a failed append is logged and swallowed so the answer still reaches the user.

use crate::storage::{ConversationRecord, Storage, StoreResult};
use std::sync::Arc;

pub struct ConversationLog {
    store: Arc<dyn Storage>,
}

impl ConversationLog {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    /// Append one record. Returns `None` when the write failed.
    pub async fn record(
        &self,
        user_id: &str,
        query: &str,
        response: &str,
    ) -> Option<ConversationRecord> {
        match self.store.record(user_id, query, response).await {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::error!("Failed to log conversation for '{}': {}", user_id, e);
                None
            }
        }
    }

    /// Number of queries logged for `user_id`
    pub async fn count_by_user(&self, user_id: &str) -> StoreResult<i64> {
        self.store.count_by_user(user_id).await
    }
}

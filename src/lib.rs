//! HR FAQ Bot - keyword-matching HR chatbot with an append-only conversation log
//!
//! Free-text questions are answered from a small FAQ table, then from an
//! ordered keyword table, then with a default menu. Every exchange is logged.

pub mod bot;
pub mod cli;
mod config;
pub mod conversation_log;
pub mod knowledge;
pub mod resolver;
pub mod session;
pub mod storage;
pub mod utils;

pub use bot::{BotError, Chatbot};
pub use config::{BotConfig, DatabaseConfig, LoggingConfig, Settings};
pub use conversation_log::ConversationLog;
pub use knowledge::{FaqEntry, Topic, DEFAULT_MENU, KEYWORD_ANSWERS, SEED_FAQS};
pub use resolver::Resolver;
pub use session::{ChatMessage, ChatRole, Identity, LoginError, Session};
pub use storage::{Backend, ConversationRecord, Storage, StoreError};

use anyhow::Context;
use std::sync::Arc;

/// Connect to the selected backend and seed the FAQ table when empty.
/// Returns the handle, which lives until the process shuts down, and the
/// number of FAQ rows inserted by this call.
pub async fn open_storage(
    backend: &Backend,
    settings: &Settings,
) -> anyhow::Result<(Arc<dyn Storage>, usize)> {
    let storage = storage::connect(backend, settings)
        .await
        .context("Storage unavailable")?;

    let inserted = storage
        .seed_if_empty(SEED_FAQS)
        .await
        .context("Failed to seed FAQ table")?;
    if inserted > 0 {
        tracing::info!("Seeded {} FAQ entries", inserted);
    }

    Ok((storage, inserted))
}

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub bot: BotConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Embedded database file used when no connection string is set
    pub sqlite_path: String,
    /// Name of the environment variable holding a Postgres connection string
    pub url_env: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Domain used to build corporate email addresses
    pub corporate_domain: String,
    /// Mirror every chat turn into the users/chats archive
    pub archive_chats: bool,
    /// Messages returned by archive history reads
    pub history_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                sqlite_path: "data/chatbot.db".to_string(),
                url_env: "DATABASE_URL".to_string(),
                max_connections: 5,
            },
            bot: BotConfig {
                corporate_domain: "nutrisco.cl".to_string(),
                archive_chats: true,
                history_limit: 20,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Settings {
    /// Defaults, then `config/<CONFIG_ENV>`, then `APP__SECTION__KEY` variables
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());
        let defaults = Settings::default();

        let config = Config::builder()
            .set_default("database.sqlite_path", defaults.database.sqlite_path)?
            .set_default("database.url_env", defaults.database.url_env)?
            .set_default("database.max_connections", defaults.database.max_connections as i64)?
            .set_default("bot.corporate_domain", defaults.bot.corporate_domain)?
            .set_default("bot.archive_chats", defaults.bot.archive_chats)?
            .set_default("bot.history_limit", defaults.bot.history_limit as i64)?
            .set_default("logging.level", defaults.logging.level)?
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__").try_parsing(true))
            .build()?;

        config.try_deserialize()
    }
}

mod settings;

pub use settings::{BotConfig, DatabaseConfig, LoggingConfig, Settings};

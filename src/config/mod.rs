/// Database connection and table creation for the leaderboard index
pub mod database;

/// Bot settings from config.toml and environment overrides
pub mod settings;

pub use settings::{BotConfig, load_app_configuration};

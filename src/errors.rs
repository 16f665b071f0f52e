//! Unified error types for Jonas.
//!
//! Component modules keep their own narrow error enums (`ShipError`, `ComposerError`)
//! and convert into [`Error`] at the command boundary, where the poise error hook
//! reports them to the user.

use crate::core::{composer::ComposerError, ship::ShipError};
use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of the problem
        message: String,
    },

    /// Leaderboard index failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem failure (reference lists, scratch files, command log)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required environment variable was missing or invalid
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Ship file could not be read
    #[error("Ship file error: {0}")]
    Ship(#[from] ShipError),

    /// Mesh composition failed
    #[error("Mesh composition failed: {0}")]
    Composer(#[from] ComposerError),

    /// Image decoding or resizing failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Indexed PNG encoding failed
    #[error("PNG encoding error: {0}")]
    PngEncoding(#[from] png::EncodingError),

    /// Manifest serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A blocking task panicked or was cancelled
    #[error("Background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// Building a reply string failed
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Serenity/Poise framework error
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

/// Discord rejects messages longer than this many characters
pub const MAX_REPLY_CHARS: usize = 2000;

/// Reply for any mesh composition failure; the tool output stays in the logs
pub const COMPOSER_FAILED_REPLY: &str = "Sorry sir, Blender failed on that ship";

impl Error {
    /// Message shown in the channel when a command fails.
    ///
    /// Composer failures get a fixed reply since their details carry tool output and
    /// server paths. Anything else is the error text, cut to fit in one message.
    #[must_use]
    pub fn user_reply(&self) -> String {
        const PREFIX: &str = "An error occurred: ";

        if matches!(self, Self::Composer(_)) {
            return COMPOSER_FAILED_REPLY.to_string();
        }

        let detail = self.to_string();
        let room = MAX_REPLY_CHARS - PREFIX.len() - 1;
        if detail.chars().count() <= room {
            return format!("{PREFIX}{detail}");
        }
        let cut: String = detail.chars().take(room - 1).collect();
        format!("{PREFIX}{cut}…")
    }
}

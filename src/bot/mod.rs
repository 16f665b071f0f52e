//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for Jonas: the slash commands, the
//! whitelist/outcome handlers they share, and the framework setup.

/// Framework setup, error hook and client startup
pub mod client;
/// Discord command implementations (leaderboard, engrep, resize, log, general)
pub mod commands;
/// Helpers shared by commands (whitelist gate, outcome recording)
pub mod handlers;

use crate::{
    config::BotConfig,
    core::{audit::CommandLog, composer::BlenderComposer},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Shared data available to all bot commands.
///
/// Built once at startup. Reference lists and the whitelist are deliberately not
/// held here; commands re-read them on every invocation.
pub struct BotData {
    /// Settings the bot was started with
    pub config: Arc<BotConfig>,
    /// Leaderboard index
    pub database: DatabaseConnection,
    /// Audit trail
    pub command_log: CommandLog,
    /// Blender driver used by `/engrep`
    pub composer: BlenderComposer,
}

impl BotData {
    /// Creates a new `BotData` from the loaded configuration and database connection.
    #[must_use]
    pub fn new(config: Arc<BotConfig>, database: DatabaseConnection) -> Self {
        let command_log = CommandLog::new(config.paths.command_log.clone());
        let composer = BlenderComposer::new(
            config.blender.binary.clone(),
            config.paths.assets_dir.clone(),
        );
        Self {
            config,
            database,
            command_log,
            composer,
        }
    }
}

pub use client::run_bot;
pub use commands::*;

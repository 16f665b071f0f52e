//! Whitelist gate.
//!
//! The whitelist is a flat newline-delimited file of Discord user and server IDs. It
//! is re-read on every gated invocation so edits take effect without a restart, and
//! it is never read at all when the gate is switched off.

use crate::{config::BotConfig, errors::Result};
use std::{collections::HashSet, path::Path};

/// Set of permitted user and server IDs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    entries: HashSet<String>,
}

impl Whitelist {
    /// Parses whitelist file contents, one ID per line. Blank lines are ignored.
    #[must_use]
    pub fn parse(contents: &str) -> Self {
        let entries = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect();
        Self { entries }
    }

    /// Reads and parses the whitelist file.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be read.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        Ok(Self::parse(&contents))
    }

    /// Whether the user, or the server the command was issued in, is listed.
    #[must_use]
    pub fn permits(&self, user_id: u64, guild_id: Option<u64>) -> bool {
        self.entries.contains(&user_id.to_string())
            || guild_id.is_some_and(|id| self.entries.contains(&id.to_string()))
    }
}

/// Applies the configured gate to one invocation.
///
/// Always `Ok(true)` when `use_whitelist` is off. An unreadable whitelist file fails
/// the invocation rather than silently allowing or denying it.
///
/// # Errors
/// Returns an I/O error if the gate is on and the whitelist file cannot be read.
pub async fn is_permitted(
    config: &BotConfig,
    user_id: u64,
    guild_id: Option<u64>,
) -> Result<bool> {
    if !config.access.use_whitelist {
        return Ok(true);
    }
    let whitelist = Whitelist::load(&config.paths.whitelist_file).await?;
    Ok(whitelist.permits(user_id, guild_id))
}

/// Whether the user may export the command log.
///
/// # Errors
/// Returns an I/O error if the policy consults the whitelist and it cannot be read.
pub async fn may_export_log(
    config: &BotConfig,
    user_id: u64,
    guild_id: Option<u64>,
) -> Result<bool> {
    use crate::config::settings::LogAccess;

    if user_id == config.access.owner_id {
        return Ok(true);
    }
    match config.access.log_access {
        LogAccess::Owner => Ok(false),
        LogAccess::Whitelist => is_permitted(config, user_id, guild_id).await,
    }
}

//! Command log - the append-only audit trail.
//!
//! One human-readable line per invocation outcome, including denials and rejections:
//!
//! ```text
//! 2024-07-09 21:14:03.512345 - sirpoopit: engrep - invalid hull type
//! ```
//!
//! The file is opened in append mode for every write and never rotated or truncated.
//! Completed commands are also counted in the leaderboard index, so the leaderboard
//! never has to rescan this file.

use crate::{
    core::leaderboard,
    errors::{Error, Result},
};
use chrono::Local;
use sea_orm::DatabaseConnection;
use std::{
    fmt,
    future::Future,
    path::{Path, PathBuf},
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

/// Timestamp layout of a log line (local time, microseconds)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Leaderboard command
pub const BALLS: &str = "balls";
/// Ship-to-mesh command
pub const ENGREP: &str = "engrep";
/// Badge resize command
pub const RESIZE: &str = "resize";
/// Log export command
pub const LOG: &str = "log";

/// Every command whose completions are counted
pub const COMMAND_NAMES: [&str; 4] = [BALLS, ENGREP, RESIZE, LOG];

/// Outcome of one invocation, as written after `<user>: `
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStatus {
    /// The command ran to completion
    Completed(&'static str),
    /// The input was refused with a fixed reply
    Rejected {
        /// Command name
        command: &'static str,
        /// Short reason, e.g. `"invalid hull type"`
        reason: &'static str,
    },
    /// The command aborted on an error
    Failed {
        /// Command name
        command: &'static str,
        /// Short reason
        reason: &'static str,
    },
    /// The whitelist gate denied the user
    NotWhitelisted,
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(command) => f.write_str(command),
            Self::Rejected { command, reason } | Self::Failed { command, reason } => {
                write!(f, "{command} - {reason}")
            }
            Self::NotWhitelisted => f.write_str("not whitelisted"),
        }
    }
}

/// One parsed log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLogEntry {
    /// Timestamp text as written
    pub timestamp: String,
    /// User display string
    pub user: String,
    /// Command name or status text
    pub status: String,
}

/// Formats a log line, including the trailing newline.
#[must_use]
pub fn format_entry(timestamp: &str, user: &str, status: &LogStatus) -> String {
    format!("{timestamp} - {user}: {status}\n")
}

/// Parses a log line. The timestamp never contains `" - "` and Discord names never
/// contain `':'`, so the first occurrence of each separator delimits the fields.
#[must_use]
pub fn parse_entry(line: &str) -> Option<CommandLogEntry> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (timestamp, rest) = line.split_once(" - ")?;
    let (user, status) = rest.split_once(": ")?;
    Some(CommandLogEntry {
        timestamp: timestamp.to_string(),
        user: user.to_string(),
        status: status.to_string(),
    })
}

/// Handle to the command log file
#[derive(Debug, Clone)]
pub struct CommandLog {
    path: PathBuf,
}

impl CommandLog {
    /// Wraps the log path; nothing is opened until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the log file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line stamped with the current local time.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be opened or written.
    pub async fn append(&self, user: &str, status: &LogStatus) -> Result<()> {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let line = format_entry(&timestamp, user, status);

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        debug!("Logged `{}` for {}", status, user);
        Ok(())
    }

    /// Reads every parseable line. A missing file reads as empty.
    ///
    /// # Errors
    /// Returns an I/O error if the file exists but cannot be read.
    pub async fn read_entries(&self) -> Result<Vec<CommandLogEntry>> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(contents.lines().filter_map(parse_entry).collect())
    }
}

/// Writes the audit line and, for completed commands, bumps the leaderboard index.
///
/// # Errors
/// Returns an error if the log write or the index update fails.
pub async fn record_outcome(
    log: &CommandLog,
    db: &DatabaseConnection,
    user: &str,
    status: &LogStatus,
) -> Result<()> {
    log.append(user, status).await?;
    if let LogStatus::Completed(command) = status {
        leaderboard::record_invocation(db, user, command).await?;
    }
    Ok(())
}

/// Short reason logged for a command that aborted on `error`.
#[must_use]
pub const fn failure_reason(error: &Error) -> &'static str {
    match error {
        Error::Composer(_) => "composer failed",
        _ => "failed",
    }
}

/// Runs a command's work and logs `<command> - <reason>` if any step of it fails.
///
/// The original error is handed back for the framework's error hook. A failure to
/// write the log line itself is only reported through tracing.
///
/// # Errors
/// Returns whatever error `work` produced.
pub async fn record_failures<T, F>(
    log: &CommandLog,
    db: &DatabaseConnection,
    user: &str,
    command: &'static str,
    work: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match work.await {
        Ok(value) => Ok(value),
        Err(e) => {
            error!("{} failed for {}: {}", command, user, e);
            let status = LogStatus::Failed {
                command,
                reason: failure_reason(&e),
            };
            if let Err(log_error) = record_outcome(log, db, user, &status).await {
                warn!("Could not log failure of {}: {}", command, log_error);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;

    #[test]
    fn test_status_display() {
        assert_eq!(LogStatus::Completed(BALLS).to_string(), "balls");
        assert_eq!(
            LogStatus::Rejected {
                command: ENGREP,
                reason: "invalid hull type"
            }
            .to_string(),
            "engrep - invalid hull type"
        );
        assert_eq!(
            LogStatus::Failed {
                command: ENGREP,
                reason: "composer failed"
            }
            .to_string(),
            "engrep - composer failed"
        );
        assert_eq!(LogStatus::NotWhitelisted.to_string(), "not whitelisted");
    }

    #[test]
    fn test_format_then_parse_line() {
        let line = format_entry(
            "2024-07-09 21:14:03.512345",
            "sirpoopit",
            &LogStatus::Rejected {
                command: RESIZE,
                reason: "not a PNG",
            },
        );
        assert_eq!(
            line,
            "2024-07-09 21:14:03.512345 - sirpoopit: resize - not a PNG\n"
        );

        let entry = parse_entry(&line).unwrap();
        assert_eq!(entry.timestamp, "2024-07-09 21:14:03.512345");
        assert_eq!(entry.user, "sirpoopit");
        assert_eq!(entry.status, "resize - not a PNG");
    }

    #[test]
    fn test_parse_legacy_discriminator_names() {
        let entry = parse_entry("2024-07-09 21:14:03.512345 - old-name#1234: balls").unwrap();
        assert_eq!(entry.user, "old-name#1234");
        assert_eq!(entry.status, "balls");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_entry("").is_none());
        assert!(parse_entry("no separators here").is_none());
    }

    #[tokio::test]
    async fn test_append_only() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let log = CommandLog::new(dir.path().join("command_log.txt"));

        assert!(log.read_entries().await?.is_empty());

        log.append("alice", &LogStatus::Completed(BALLS)).await?;
        log.append("bob", &LogStatus::NotWhitelisted).await?;
        let log_again = CommandLog::new(log.path());
        log_again.append("alice", &LogStatus::Completed(ENGREP)).await?;

        let entries = log.read_entries().await?;
        let summary: Vec<(&str, &str)> = entries
            .iter()
            .map(|e| (e.user.as_str(), e.status.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("alice", "balls"),
                ("bob", "not whitelisted"),
                ("alice", "engrep")
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_record_failures_logs_every_failing_step() -> Result<()> {
        use crate::core::composer::ComposerError;

        let db = setup_test_db().await?;
        let dir = tempfile::tempdir().unwrap();
        let log = CommandLog::new(dir.path().join("command_log.txt"));

        // A download or staging step failing before any processing starts.
        let staged: Result<()> = record_failures(&log, &db, "alice", ENGREP, async {
            tokio::fs::read(dir.path().join("never-downloaded.ship")).await?;
            Ok::<(), Error>(())
        })
        .await;
        assert!(matches!(staged, Err(Error::Io(_))));

        let composed: Result<()> = record_failures(&log, &db, "bob", ENGREP, async {
            Err::<(), Error>(
                ComposerError::MissingOutput {
                    path: PathBuf::from("Raines.stl"),
                }
                .into(),
            )
        })
        .await;
        assert!(matches!(composed, Err(Error::Composer(_))));

        let ok = record_failures(&log, &db, "carol", RESIZE, async { Ok::<_, Error>(7) }).await?;
        assert_eq!(ok, 7);

        let statuses: Vec<(String, String)> = log
            .read_entries()
            .await?
            .into_iter()
            .map(|e| (e.user, e.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("alice".to_string(), "engrep - failed".to_string()),
                ("bob".to_string(), "engrep - composer failed".to_string()),
            ]
        );
        assert!(leaderboard::top_users(&db, ENGREP, 3).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_record_outcome_counts_only_completions() -> Result<()> {
        let db = setup_test_db().await?;
        let dir = tempfile::tempdir().unwrap();
        let log = CommandLog::new(dir.path().join("command_log.txt"));

        record_outcome(&log, &db, "alice", &LogStatus::Completed(BALLS)).await?;
        record_outcome(&log, &db, "alice", &LogStatus::NotWhitelisted).await?;
        record_outcome(
            &log,
            &db,
            "alice",
            &LogStatus::Rejected {
                command: BALLS,
                reason: "whatever",
            },
        )
        .await?;

        assert_eq!(log.read_entries().await?.len(), 3);
        let top = leaderboard::top_users(&db, BALLS, 3).await?;
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].count, 1);
        Ok(())
    }
}

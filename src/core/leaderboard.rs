//! Leaderboard index business logic.
//!
//! Completed invocations are counted per (user, command) in the `command_counts`
//! table. The `/balls` leaderboard reads the top entries straight from that index;
//! equal counts are ordered by user name so the result is deterministic. On startup an
//! empty index is rebuilt once from the existing command log.

use crate::{
    core::audit::{COMMAND_NAMES, CommandLogEntry},
    entities::{CommandCount, command_count},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr};
use std::{collections::HashMap, fmt::Write};
use tracing::info;

/// Number of users shown by `/balls`
pub const LEADERBOARD_SIZE: u64 = 3;

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// User display string
    pub user: String,
    /// Completed invocations
    pub count: i64,
}

impl From<command_count::Model> for LeaderboardEntry {
    fn from(model: command_count::Model) -> Self {
        Self {
            user: model.user_name,
            count: model.invocations,
        }
    }
}

/// Adds `amount` to the counter for `user` and `command`, creating it if needed.
async fn add_invocations<C>(db: &C, user: &str, command: &str, amount: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = Utc::now().naive_utc();

    let updated = CommandCount::update_many()
        .col_expr(
            command_count::Column::Invocations,
            Expr::col(command_count::Column::Invocations).add(amount),
        )
        .col_expr(command_count::Column::UpdatedAt, Expr::value(now))
        .filter(command_count::Column::UserName.eq(user))
        .filter(command_count::Column::Command.eq(command))
        .exec(db)
        .await?;

    if updated.rows_affected == 0 {
        command_count::ActiveModel {
            user_name: Set(user.to_string()),
            command: Set(command.to_string()),
            invocations: Set(amount),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Counts one completed invocation.
///
/// The update-or-insert runs in a transaction so two first invocations can't both
/// insert a row.
pub async fn record_invocation(db: &DatabaseConnection, user: &str, command: &str) -> Result<()> {
    let txn = db.begin().await?;
    add_invocations(&txn, user, command, 1).await?;
    txn.commit().await?;
    Ok(())
}

/// Top users for a command by count, then by user name.
pub async fn top_users(
    db: &DatabaseConnection,
    command: &str,
    limit: u64,
) -> Result<Vec<LeaderboardEntry>> {
    let rows = CommandCount::find()
        .filter(command_count::Column::Command.eq(command))
        .order_by_desc(command_count::Column::Invocations)
        .order_by_asc(command_count::Column::UserName)
        .limit(limit)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(LeaderboardEntry::from).collect())
}

/// Whether any counter exists yet
pub async fn is_index_empty(db: &DatabaseConnection) -> Result<bool> {
    Ok(CommandCount::find().one(db).await?.is_none())
}

/// Tallies completed commands in parsed log entries. Only statuses that are exactly
/// a command name count; rejections and denials are ignored.
#[must_use]
pub fn tally_entries(entries: &[CommandLogEntry]) -> HashMap<(String, String), i64> {
    let mut counts: HashMap<(String, String), i64> = HashMap::new();
    for entry in entries {
        if COMMAND_NAMES.contains(&entry.status.as_str()) {
            *counts
                .entry((entry.user.clone(), entry.status.clone()))
                .or_default() += 1;
        }
    }
    counts
}

/// Fills an empty index from the command log. Returns the number of counters created,
/// or 0 if the index already had data.
pub async fn rebuild_from_log(db: &DatabaseConnection, entries: &[CommandLogEntry]) -> Result<usize> {
    if !is_index_empty(db).await? {
        return Ok(0);
    }

    let counts = tally_entries(entries);
    let txn = db.begin().await?;
    for ((user, command), amount) in &counts {
        add_invocations(&txn, user, command, *amount).await?;
    }
    txn.commit().await?;

    info!(
        counters = counts.len(),
        lines = entries.len(),
        "Rebuilt leaderboard index from command log"
    );
    Ok(counts.len())
}

/// Renders the `/balls` reply.
pub fn format_leaderboard(entries: &[LeaderboardEntry]) -> Result<String> {
    if entries.is_empty() {
        return Ok("No one has used the 'balls' command yet.".to_string());
    }

    let mut message = String::from("# Top 3 ballers \n");
    for entry in entries {
        writeln!(&mut message, "{}: {} times", entry.user, entry.count)?;
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit::{BALLS, ENGREP, parse_entry};
    use crate::test_utils::{record_times, setup_test_db};

    #[tokio::test]
    async fn test_record_invocation_increments() -> Result<()> {
        let db = setup_test_db().await?;

        record_invocation(&db, "alice", BALLS).await?;
        record_invocation(&db, "alice", BALLS).await?;
        record_invocation(&db, "alice", ENGREP).await?;

        let balls = top_users(&db, BALLS, LEADERBOARD_SIZE).await?;
        assert_eq!(
            balls,
            vec![LeaderboardEntry {
                user: "alice".to_string(),
                count: 2
            }]
        );
        assert_eq!(top_users(&db, ENGREP, LEADERBOARD_SIZE).await?[0].count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_top_three_with_ties_ordered_by_name() -> Result<()> {
        let db = setup_test_db().await?;
        record_times(&db, "carol", BALLS, 5).await?;
        record_times(&db, "bob", BALLS, 3).await?;
        record_times(&db, "alice", BALLS, 3).await?;
        record_times(&db, "dave", BALLS, 1).await?;
        record_times(&db, "erin", ENGREP, 9).await?;

        let top = top_users(&db, BALLS, LEADERBOARD_SIZE).await?;
        let summary: Vec<(&str, i64)> = top.iter().map(|e| (e.user.as_str(), e.count)).collect();
        assert_eq!(summary, vec![("carol", 5), ("alice", 3), ("bob", 3)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_leaderboard_message() -> Result<()> {
        let db = setup_test_db().await?;
        let top = top_users(&db, BALLS, LEADERBOARD_SIZE).await?;
        assert!(top.is_empty());
        assert_eq!(
            format_leaderboard(&top)?,
            "No one has used the 'balls' command yet."
        );
        Ok(())
    }

    #[test]
    fn test_format_leaderboard() -> Result<()> {
        let entries = vec![
            LeaderboardEntry {
                user: "carol".to_string(),
                count: 5,
            },
            LeaderboardEntry {
                user: "alice".to_string(),
                count: 3,
            },
        ];
        assert_eq!(
            format_leaderboard(&entries)?,
            "# Top 3 ballers \ncarol: 5 times\nalice: 3 times\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_rebuild_matches_incremental_counts() -> Result<()> {
        let log = "\
2024-07-09 21:14:03.512345 - alice: balls
2024-07-09 21:15:03.512345 - bob: balls
2024-07-09 21:16:03.512345 - alice: engrep - invalid hull type
2024-07-09 21:17:03.512345 - alice: balls
2024-07-09 21:18:03.512345 - mallory: not whitelisted
2024-07-09 21:19:03.512345 - ballsy: resize
garbage line
";
        let entries: Vec<CommandLogEntry> = log.lines().filter_map(parse_entry).collect();

        let db = setup_test_db().await?;
        assert_eq!(rebuild_from_log(&db, &entries).await?, 3);

        let top = top_users(&db, BALLS, LEADERBOARD_SIZE).await?;
        let summary: Vec<(&str, i64)> = top.iter().map(|e| (e.user.as_str(), e.count)).collect();
        assert_eq!(summary, vec![("alice", 2), ("bob", 1)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_rebuild_skips_populated_index() -> Result<()> {
        let db = setup_test_db().await?;
        record_invocation(&db, "alice", BALLS).await?;

        let entries: Vec<CommandLogEntry> =
            parse_entry("2024-07-09 21:14:03.512345 - bob: balls").into_iter().collect();
        assert_eq!(rebuild_from_log(&db, &entries).await?, 0);
        assert_eq!(top_users(&db, BALLS, LEADERBOARD_SIZE).await?.len(), 1);
        Ok(())
    }
}

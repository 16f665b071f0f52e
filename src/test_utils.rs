//! Shared test utilities for Jonas.
//!
//! Helpers for setting up an in-memory leaderboard index and seeding it.

use crate::{core::leaderboard, errors::Result};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Records `times` completed invocations of `command` by `user`.
pub async fn record_times(
    db: &DatabaseConnection,
    user: &str,
    command: &str,
    times: usize,
) -> Result<()> {
    for _ in 0..times {
        leaderboard::record_invocation(db, user, command).await?;
    }
    Ok(())
}

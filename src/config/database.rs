//! Database configuration for the leaderboard index.
//!
//! The index lives in a small `SQLite` file managed through `SeaORM`. The table is
//! generated from the entity definition with `Schema::create_table_from_entity`, so
//! the schema always matches the Rust struct, and is created with `IF NOT EXISTS` so
//! startup is idempotent. A unique index keeps one counter per (user, command).

use crate::entities::{CommandCount, CommandCountColumn};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema, sea_query::Index};

/// Fallback database location when `DATABASE_URL` is unset
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/jonas.sqlite?mode=rwc";

/// Gets the database URL from the environment or returns the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the `SQLite` database named by `DATABASE_URL`.
///
/// For file-backed URLs the parent directory is created first, since `SQLite` will
/// create the file but not its directory.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();

    if let Some(parent) = sqlite_file_parent(&database_url) {
        tokio::fs::create_dir_all(parent).await?;
    }

    tracing::debug!("Connecting to {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Name of the unique (user, command) index on `command_counts`
pub const COMMAND_COUNT_UNIQUE_INDEX: &str = "idx_command_counts_user_command";

/// Creates the `command_counts` table and its unique index if they don't exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut command_count_table = schema.create_table_from_entity(CommandCount);
    command_count_table.if_not_exists();

    db.execute(builder.build(&command_count_table)).await?;

    let unique_counter = Index::create()
        .if_not_exists()
        .name(COMMAND_COUNT_UNIQUE_INDEX)
        .table(CommandCount)
        .col(CommandCountColumn::UserName)
        .col(CommandCountColumn::Command)
        .unique()
        .to_owned();
    db.execute(builder.build(&unique_counter)).await?;

    Ok(())
}

fn sqlite_file_parent(url: &str) -> Option<std::path::PathBuf> {
    let path = url.strip_prefix("sqlite://")?;
    let path = path.split('?').next()?;
    if path.is_empty() || path.starts_with(':') {
        return None;
    }
    std::path::Path::new(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(std::path::Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::command_count::Model as CommandCountModel;
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        let _: Vec<CommandCountModel> = CommandCount::find().limit(1).all(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_counter_rows_are_rejected() -> Result<()> {
        use crate::entities::command_count;
        use sea_orm::{ActiveModelTrait, Set};

        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        let counter = |user: &str, command: &str| command_count::ActiveModel {
            user_name: Set(user.to_string()),
            command: Set(command.to_string()),
            invocations: Set(1),
            updated_at: Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        };

        counter("alice", "balls").insert(&db).await?;
        counter("alice", "engrep").insert(&db).await?;
        counter("bob", "balls").insert(&db).await?;
        assert!(counter("alice", "balls").insert(&db).await.is_err());

        assert_eq!(CommandCount::find().all(&db).await?.len(), 3);
        Ok(())
    }

    #[test]
    fn test_sqlite_file_parent() {
        assert_eq!(
            sqlite_file_parent("sqlite://data/jonas.sqlite?mode=rwc"),
            Some(std::path::PathBuf::from("data"))
        );
        assert_eq!(sqlite_file_parent("sqlite://jonas.sqlite"), None);
        assert_eq!(sqlite_file_parent("sqlite::memory:"), None);
    }
}

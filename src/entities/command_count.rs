//! Command count entity - the derived leaderboard index.
//!
//! One row per (user, command) pair, bumped each time that user completes that
//! command. The append-only command log stays the audit trail; this table exists
//! so the leaderboard never has to rescan the log.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Invocation counter for one user and one command
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "command_counts")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// User display string exactly as written to the command log
    pub user_name: String,
    /// Command name (e.g. `"balls"`)
    pub command: String,
    /// Number of completed invocations
    pub invocations: i64,
    /// When this counter last changed
    pub updated_at: DateTime,
}

/// `CommandCount` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Entity module - `SeaORM` entity definitions for the database.

/// Per-user command invocation counters
pub mod command_count;

pub use command_count::{
    Column as CommandCountColumn, Entity as CommandCount, Model as CommandCountModel,
};

//! Core logic - framework-agnostic pieces behind the slash commands.
//!
//! Nothing in here knows about Discord; the bot layer stages attachments, calls these
//! functions, and turns their results into replies.

/// Whitelist gate
pub mod access;
/// Command log (audit trail)
pub mod audit;
/// PNG badge resize/recompress
pub mod badge;
/// Mesh composer and Blender driver
pub mod composer;
/// Ship-to-mesh pipeline
pub mod engrep;
/// Leaderboard index
pub mod leaderboard;
/// Known hulls and components
pub mod reference;
/// Per-invocation scratch directories
pub mod scratch;
/// Ship descriptor reader
pub mod ship;

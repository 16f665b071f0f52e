//! Discord interaction helpers
//!
//! Pieces every gated command runs before and after its own work.

/// Whitelist gate and outcome recording
pub mod gate;

//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Ship-to-mesh conversion
pub mod engrep;

/// Leaderboard and utility commands
pub mod general;

/// Command log export
pub mod log;

/// Badge resize
pub mod resize;

// Export commands
pub use engrep::*;
pub use general::*;
pub use log::*;
pub use resize::*;

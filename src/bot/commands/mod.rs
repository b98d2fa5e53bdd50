//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Balance, earning, and reporting commands
pub mod coins;

/// General utility commands
pub mod general;

/// Reward catalogue, redemption, and maintenance commands
pub mod rewards;

// Export commands
pub use coins::*;
pub use general::*;
pub use rewards::*;

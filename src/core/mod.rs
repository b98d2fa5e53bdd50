//! Core ledger logic - framework-agnostic coin operations.
//!
//! Every function takes the store handle explicitly. Operations that change
//! balances run inside a single database transaction, so a rejected request
//! leaves no coin, transaction or balance change behind.

/// Balance snapshots and balance arithmetic
pub mod balance;
/// Coin grants: creation and oldest-expiry-first consumption
pub mod coin;
/// Earning coins and manual adjustments
pub mod earning;
/// Redeeming coins, refunds and marking rewards as applied
pub mod redemption;
/// Expiration sweep and expiring-soon queries
pub mod expiration;
/// Per-user statistics
pub mod stats;
/// Leaderboard ranking
pub mod leaderboard;
/// Earning and redemption history aggregations
pub mod history;
/// Badge evaluation and unlocks
pub mod badges;
/// Rule catalogue lookups and seeding
pub mod rules;
/// Append-only transaction log
pub mod transaction;
/// Text formatting for ledger data
pub mod report;

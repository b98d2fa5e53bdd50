//! Unified error type for the coin ledger.
//!
//! Ledger rejections (unknown rule, not enough coins, exhausted caps) are
//! struct-style variants so callers can match on the offending values. Store,
//! serialization and framework failures are wrapped transparently.

use thiserror::Error;

/// Every failure the library and the bot can report.
#[derive(Debug, Error)]
pub enum Error {
    /// An earning or redemption rule is missing or inactive
    #[error("Rule not found or inactive: {rule}")]
    RuleNotFound {
        /// Identifier that was looked up
        rule: String,
    },

    /// The user's spendable balance does not cover the request
    #[error("Insufficient coins: have {available}, need {required}")]
    InsufficientCoins {
        /// Active coins the user holds
        available: i64,
        /// Coins the operation needs
        required: i64,
    },

    /// A coin amount or order amount is out of range
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Earning would exceed a per-day or per-user cap of the rule
    #[error("Earning limit of {limit} reached for rule {rule}")]
    EarningLimitReached {
        /// Earning rule identifier
        rule: String,
        /// The cap that would be exceeded
        limit: i64,
    },

    /// A redemption rule has no uses left, globally or for this user
    #[error("Redemption limit reached for rule {rule}")]
    RedemptionLimitReached {
        /// Redemption rule identifier
        rule: String,
    },

    /// A redemption rule is outside its validity window
    #[error("Rule {rule} is not valid at this time")]
    RuleNotValid {
        /// Redemption rule identifier
        rule: String,
    },

    /// No redemption with this id exists
    #[error("Redemption not found: {id}")]
    RedemptionNotFound {
        /// Redemption id
        id: i64,
    },

    /// The redemption cannot move to the requested state
    #[error("Redemption {id} is {status}")]
    InvalidRedemptionState {
        /// Redemption id
        id: i64,
        /// Current status of the redemption
        status: String,
    },

    /// Configuration could not be read or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// Store failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// JSON (de)serialization failure for metadata and rule snapshots
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Integer conversion overflow (limits, counts)
    #[error("Conversion error: {0}")]
    Conversion(#[from] std::num::TryFromIntError),

    /// Discord framework failure
    #[error("Serenity/Poise framework error: {0}")]
    #[allow(clippy::enum_variant_names)]
    FrameworkError(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::FrameworkError(Box::new(value))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

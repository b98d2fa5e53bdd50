/// Database configuration and connection management
pub mod database;

/// Ledger configuration (system settings, rule tables, badges) from config.toml
pub mod coins;

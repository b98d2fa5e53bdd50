//! Coin balance entity - Per-user aggregate snapshot.
//!
//! `total_coins` counts every coin ever granted (net of negative adjustments),
//! so `total_coins == active_coins + used_coins + expired_coins` holds after
//! every ledger operation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Balance snapshot database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coin_balances")]
pub struct Model {
    /// User the snapshot belongs to
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    /// Lifetime coins granted
    pub total_coins: i64,
    /// Spendable coins
    pub active_coins: i64,
    /// Coins lost to expiry
    pub expired_coins: i64,
    /// Coins spent on redemptions
    pub used_coins: i64,
    /// When the snapshot last changed
    pub last_updated: DateTimeUtc,
}

impl Model {
    /// A zeroed balance for a user the ledger has never seen.
    #[must_use]
    pub fn empty(user_id: &str, now: DateTimeUtc) -> Self {
        Self {
            user_id: user_id.to_string(),
            total_coins: 0,
            active_coins: 0,
            expired_coins: 0,
            used_coins: 0,
            last_updated: now,
        }
    }
}

/// Balances have no foreign keys
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

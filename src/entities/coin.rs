//! Coin entity - A single grant of coins to a user.
//!
//! Grants are created by earning, refunds, bonuses and positive adjustments.
//! `remaining` drops as redemptions consume the grant; the status moves from
//! `active` to `used`, `expired` or `cancelled` once nothing spendable is left.

use super::enums::CoinStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Coin grant database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coins")]
pub struct Model {
    /// Unique identifier for the grant
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User the coins belong to
    pub user_id: String,
    /// Coins granted
    pub amount: i64,
    /// Coins of this grant not yet used, expired or cancelled
    pub remaining: i64,
    /// Current lifecycle state
    pub status: CoinStatus,
    /// When the grant was made
    pub earned_at: DateTimeUtc,
    /// When unspent coins of the grant expire
    pub expires_at: Option<DateTimeUtc>,
    /// When the grant was fully consumed
    pub used_at: Option<DateTimeUtc>,
    /// Earning rule identifier (or `refund`, `badge`, `adjustment`)
    pub source: String,
    /// Caller reference such as an order or review id
    pub source_id: Option<String>,
    /// Human-readable description
    pub description: String,
    /// Free-form caller metadata
    pub metadata: Option<Json>,
}

/// Coin grants have no foreign keys
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Enumerated columns shared by the ledger entities.
//!
//! Each enum is stored as its snake_case string value so the tables stay
//! readable from a plain SQLite shell.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a single coin grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum CoinStatus {
    /// Spendable, has `remaining > 0`
    #[sea_orm(string_value = "active")]
    Active,
    /// Passed its expiry with coins left
    #[sea_orm(string_value = "expired")]
    Expired,
    /// Fully consumed by redemptions
    #[sea_orm(string_value = "used")]
    Used,
    /// Withdrawn by a negative adjustment
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Kind of balance-affecting event in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Coins granted by an earning rule
    #[sea_orm(string_value = "earned")]
    Earned,
    /// Coins spent on a redemption
    #[sea_orm(string_value = "redeemed")]
    Redeemed,
    /// Coins lost to expiry
    #[sea_orm(string_value = "expired")]
    Expired,
    /// Coins returned by a cancelled redemption
    #[sea_orm(string_value = "refunded")]
    Refunded,
    /// Coins granted by a badge unlock
    #[sea_orm(string_value = "bonus")]
    Bonus,
    /// Manual correction
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
}

/// Lifecycle of a redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum RedemptionStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "used")]
    Used,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// What a redemption rule gives in exchange for coins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    /// `reward_value` percent off the order, capped by `max_discount`
    #[sea_orm(string_value = "percentage_discount")]
    PercentageDiscount,
    /// `reward_value` off the order
    #[sea_orm(string_value = "fixed_discount")]
    FixedDiscount,
    /// Shipping waived, `reward_value` is the shipping cost covered
    #[sea_orm(string_value = "free_shipping")]
    FreeShipping,
    #[sea_orm(string_value = "free_product")]
    FreeProduct,
    #[sea_orm(string_value = "exclusive_access")]
    ExclusiveAccess,
}

/// User metric a badge condition is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum BadgeMetric {
    /// Lifetime coins granted
    #[sea_orm(string_value = "coins_earned")]
    CoinsEarned,
    /// Grants from the `purchase` rule
    #[sea_orm(string_value = "purchases")]
    Purchases,
    /// Grants from the `review` rule
    #[sea_orm(string_value = "reviews")]
    Reviews,
    /// Redemptions that were not cancelled
    #[sea_orm(string_value = "redemptions")]
    Redemptions,
}

/// Comparison between a metric and a badge threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    #[sea_orm(string_value = "gte")]
    Gte,
    #[sea_orm(string_value = "gt")]
    Gt,
    #[sea_orm(string_value = "eq")]
    Eq,
}

impl Comparison {
    /// Returns whether `value` satisfies the comparison against `threshold`.
    #[must_use]
    pub const fn holds(self, value: i64, threshold: i64) -> bool {
        match self {
            Self::Gte => value >= threshold,
            Self::Gt => value > threshold,
            Self::Eq => value == threshold,
        }
    }
}

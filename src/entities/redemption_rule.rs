//! Redemption rule entity - An offer that consumes coins.

use super::enums::RewardType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Redemption rule database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "redemption_rules")]
pub struct Model {
    /// Rule identifier (e.g. `"discount_10"`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Display name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Coins spent per redemption
    pub coin_cost: i64,
    /// What the user gets
    pub reward_type: RewardType,
    /// Percentage, currency amount or shipping cost depending on `reward_type`
    pub reward_value: f64,
    /// Upper bound on a percentage discount
    pub max_discount: Option<f64>,
    /// Smallest order the offer applies to
    pub min_order_amount: Option<f64>,
    /// Total redemptions allowed across all users
    pub max_uses: Option<i64>,
    /// Redemptions allowed per user
    pub max_uses_per_user: Option<i64>,
    /// Start of the validity window
    pub valid_from: Option<DateTimeUtc>,
    /// End of the validity window
    pub valid_until: Option<DateTimeUtc>,
    /// Inactive rules reject redemption
    pub is_active: bool,
}

impl Model {
    /// Whether `now` falls inside the rule's validity window.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTimeUtc) -> bool {
        self.valid_from.is_none_or(|from| now >= from)
            && self.valid_until.is_none_or(|until| now <= until)
    }
}

/// Defines relationships between redemption rules and redemptions
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One rule has many redemptions
    #[sea_orm(has_many = "super::coin_redemption::Entity")]
    Redemptions,
}

impl Related<super::coin_redemption::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Redemptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

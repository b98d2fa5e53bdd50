//! Coin redemption entity - A user spending coins against a redemption rule.
//!
//! The rule is snapshotted as JSON at redemption time so later edits to the
//! configured rule do not rewrite history.

use super::enums::RedemptionStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Redemption database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coin_redemptions")]
pub struct Model {
    /// Unique identifier for the redemption
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who spent the coins
    pub user_id: String,
    /// Redemption rule identifier
    pub rule_id: String,
    /// The rule as it was when redeemed
    pub rule_snapshot: Json,
    /// Coins spent
    pub coin_cost: i64,
    /// Currency value of the discount granted
    pub discount_amount: f64,
    /// Current lifecycle state
    pub status: RedemptionStatus,
    /// When the redemption was made
    pub created_at: DateTimeUtc,
    /// When the reward was applied to an order
    pub used_at: Option<DateTimeUtc>,
    /// When an unapplied reward lapses
    pub expires_at: Option<DateTimeUtc>,
    /// Order the reward was redeemed for
    pub order_id: Option<String>,
    /// Free-form caller metadata
    pub metadata: Option<Json>,
}

/// Defines relationships between redemptions and rules
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each redemption belongs to one rule
    #[sea_orm(
        belongs_to = "super::redemption_rule::Entity",
        from = "Column::RuleId",
        to = "super::redemption_rule::Column::Id"
    )]
    Rule,
}

impl Related<super::redemption_rule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rule.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

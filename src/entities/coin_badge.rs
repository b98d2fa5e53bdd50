//! Coin badge entity - Achievement definitions.
//!
//! A badge unlocks when `metric <comparison> threshold` holds for a user.

use super::enums::{BadgeMetric, Comparison};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Badge definition database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coin_badges")]
pub struct Model {
    /// Badge identifier (e.g. `"first_purchase"`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Display name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Metric the condition reads
    pub metric: BadgeMetric,
    /// How the metric is compared to the threshold
    pub comparison: Comparison,
    /// Threshold value
    pub threshold: i64,
    /// Bonus coins credited on unlock
    pub reward_coins: i64,
    /// Inactive badges are never awarded
    pub is_active: bool,
}

/// Defines relationships between badges and unlocks
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One badge has many unlocks
    #[sea_orm(has_many = "super::user_coin_badge::Entity")]
    Unlocks,
}

impl Related<super::user_coin_badge::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Unlocks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

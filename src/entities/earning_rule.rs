//! Earning rule entity - How many coins a named action yields.
//!
//! Rules are seeded from configuration at startup and read-only afterwards.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Earning rule database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "earning_rules")]
pub struct Model {
    /// Rule identifier (e.g. `"daily_login"`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub rule: String,
    /// Display name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Coins granted per occurrence
    pub amount: i64,
    /// Cap on coins earned under this rule per user per UTC day
    pub max_coins_per_day: Option<i64>,
    /// Cap on coins earned under this rule per user, lifetime
    pub max_coins_per_user: Option<i64>,
    /// Display order, higher first
    pub priority: i32,
    /// Inactive rules reject earning
    pub is_active: bool,
}

/// Earning rules have no foreign keys
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

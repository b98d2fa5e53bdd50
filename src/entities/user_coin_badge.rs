//! User coin badge entity - A badge unlocked by a user.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Badge unlock database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_coin_badges")]
pub struct Model {
    /// Unique identifier for the unlock
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who unlocked the badge
    pub user_id: String,
    /// Badge identifier
    pub badge_id: String,
    /// When the badge was unlocked
    pub unlocked_at: DateTimeUtc,
}

/// Defines relationships between unlocks and badges
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each unlock belongs to one badge
    #[sea_orm(
        belongs_to = "super::coin_badge::Entity",
        from = "Column::BadgeId",
        to = "super::coin_badge::Column::Id"
    )]
    Badge,
}

impl Related<super::coin_badge::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Badge.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

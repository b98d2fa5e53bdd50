//! Shared test utilities for the coin ledger.
//!
//! This module provides helpers for setting up in-memory test databases and
//! creating ledger records with sensible defaults.

use crate::{
    config::coins::{CoinConfig, SystemConfig},
    core::{
        coin::GrantOutcome,
        earning::{EarnRequest, earn_coins},
        rules::seed_rules,
    },
    entities::{RedemptionRuleModel, RewardType},
    errors::Result,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, IntoActiveModel};

/// Creates an in-memory `SQLite` database with all tables but no rules.
pub async fn setup_empty_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates an in-memory `SQLite` database seeded with the built-in rules and badges.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = setup_empty_db().await?;
    seed_rules(&db, &CoinConfig::default()).await?;
    Ok(db)
}

/// The built-in system settings.
pub fn test_system() -> SystemConfig {
    SystemConfig::default()
}

/// Grants `amount` coins through the uncapped `purchase` rule.
pub async fn earn_test_coins(
    db: &DatabaseConnection,
    user_id: &str,
    amount: i64,
) -> Result<GrantOutcome> {
    earn_coins(
        db,
        &test_system(),
        EarnRequest::new(user_id, "purchase").with_amount(amount),
    )
    .await
}

/// A redemption rule model with a fixed discount of 1.00 and no caps.
pub fn test_redemption_rule(id: &str, coin_cost: i64) -> RedemptionRuleModel {
    RedemptionRuleModel {
        id: id.to_string(),
        name: format!("Test rule {id}"),
        description: String::new(),
        coin_cost,
        reward_type: RewardType::FixedDiscount,
        reward_value: 1.0,
        max_discount: None,
        min_order_amount: None,
        max_uses: None,
        max_uses_per_user: None,
        valid_from: None,
        valid_until: None,
        is_active: true,
    }
}

/// Inserts a redemption rule with a custom cost and global use cap.
pub async fn create_custom_redemption_rule(
    db: &DatabaseConnection,
    id: &str,
    coin_cost: i64,
    max_uses: Option<i64>,
) -> Result<RedemptionRuleModel> {
    let rule = RedemptionRuleModel {
        max_uses,
        ..test_redemption_rule(id, coin_cost)
    };
    Ok(rule.into_active_model().insert(db).await?)
}

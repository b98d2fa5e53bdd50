//! Rule catalogue - earning rules, redemption rules and badge definitions.
//!
//! Rules come from configuration and are inserted by [`seed_rules`] on
//! startup. Rows that already exist are left alone, so edits made directly in
//! the database survive restarts.

use crate::{
    config::coins::CoinConfig,
    core::balance::get_balance,
    entities::{
        CoinBadge, EarningRule, EarningRuleModel, RedemptionRule, RedemptionRuleModel,
        coin_badge, earning_rule, redemption_rule,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{IntoActiveModel, QueryOrder, TransactionTrait, prelude::*};

/// Counts of rows inserted by [`seed_rules`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Earning rules inserted
    pub earning_rules: usize,
    /// Redemption rules inserted
    pub redemption_rules: usize,
    /// Badges inserted
    pub badges: usize,
}

/// Inserts configured rules and badges that are not yet in the database.
pub async fn seed_rules(db: &DatabaseConnection, config: &CoinConfig) -> Result<SeedSummary> {
    let txn = db.begin().await?;
    let mut summary = SeedSummary::default();

    for rule in &config.earning_rules {
        if EarningRule::find_by_id(rule.rule.clone()).one(&txn).await?.is_none() {
            rule.to_model().into_active_model().insert(&txn).await?;
            summary.earning_rules += 1;
        }
    }

    for rule in &config.redemption_rules {
        if RedemptionRule::find_by_id(rule.id.clone()).one(&txn).await?.is_none() {
            rule.to_model().into_active_model().insert(&txn).await?;
            summary.redemption_rules += 1;
        }
    }

    for badge in &config.badges {
        if CoinBadge::find_by_id(badge.id.clone()).one(&txn).await?.is_none() {
            badge.to_model().into_active_model().insert(&txn).await?;
            summary.badges += 1;
        }
    }

    txn.commit().await?;
    tracing::info!(
        earning_rules = summary.earning_rules,
        redemption_rules = summary.redemption_rules,
        badges = summary.badges,
        "Seeded ledger rules"
    );
    Ok(summary)
}

/// Finds an active earning rule by identifier.
///
/// # Errors
/// Returns [`Error::RuleNotFound`] if the rule does not exist or is inactive.
pub async fn get_active_earning_rule<C>(db: &C, rule: &str) -> Result<EarningRuleModel>
where
    C: ConnectionTrait,
{
    EarningRule::find_by_id(rule.to_string())
        .one(db)
        .await?
        .filter(|r| r.is_active)
        .ok_or_else(|| Error::RuleNotFound {
            rule: rule.to_string(),
        })
}

/// Finds an active redemption rule by identifier.
///
/// # Errors
/// Returns [`Error::RuleNotFound`] if the rule does not exist or is inactive.
pub async fn get_active_redemption_rule<C>(db: &C, rule_id: &str) -> Result<RedemptionRuleModel>
where
    C: ConnectionTrait,
{
    RedemptionRule::find_by_id(rule_id.to_string())
        .one(db)
        .await?
        .filter(|r| r.is_active)
        .ok_or_else(|| Error::RuleNotFound {
            rule: rule_id.to_string(),
        })
}

/// Retrieves active earning rules, highest priority first.
pub async fn get_earning_rules<C>(db: &C) -> Result<Vec<EarningRuleModel>>
where
    C: ConnectionTrait,
{
    EarningRule::find()
        .filter(earning_rule::Column::IsActive.eq(true))
        .order_by_desc(earning_rule::Column::Priority)
        .order_by_asc(earning_rule::Column::Rule)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves active redemption rules, cheapest first.
pub async fn get_redemption_rules<C>(db: &C) -> Result<Vec<RedemptionRuleModel>>
where
    C: ConnectionTrait,
{
    RedemptionRule::find()
        .filter(redemption_rule::Column::IsActive.eq(true))
        .order_by_asc(redemption_rule::Column::CoinCost)
        .order_by_asc(redemption_rule::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the redemption rules a user can afford right now.
///
/// Per-use caps are not considered here; [`crate::core::redemption::redeem_coins`]
/// still enforces them.
pub async fn get_available_redemptions<C>(db: &C, user_id: &str) -> Result<Vec<RedemptionRuleModel>>
where
    C: ConnectionTrait,
{
    let balance = get_balance(db, user_id).await?;
    let now = Utc::now();

    Ok(get_redemption_rules(db)
        .await?
        .into_iter()
        .filter(|rule| rule.coin_cost <= balance.active_coins && rule.is_valid_at(now))
        .collect())
}

/// Retrieves active badge definitions ordered by identifier.
pub async fn get_badges<C>(db: &C) -> Result<Vec<crate::entities::CoinBadgeModel>>
where
    C: ConnectionTrait,
{
    CoinBadge::find()
        .filter(coin_badge::Column::IsActive.eq(true))
        .order_by_asc(coin_badge::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

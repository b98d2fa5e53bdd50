//! Badge evaluation.
//!
//! Badges unlock once per user. A badge with `reward_coins` credits a
//! `bonus` grant in the same database transaction as the unlock.

use crate::{
    config::coins::SystemConfig,
    core::{
        balance::{BalanceDelta, get_balance},
        coin::{Grant, grant_coins},
        rules::get_badges,
    },
    entities::{
        BadgeMetric, Coin, CoinBadge, CoinBadgeModel, CoinRedemption, RedemptionStatus,
        TransactionType, UserCoinBadge, UserCoinBadgeModel, coin, coin_redemption,
        user_coin_badge,
    },
    errors::Result,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::HashSet;

/// Source tag of grants credited for badge unlocks.
pub const BADGE_SOURCE: &str = "badge";

/// The user metrics badge conditions read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BadgeMetrics {
    /// Lifetime coins granted
    pub coins_earned: i64,
    /// Grants from the `purchase` rule
    pub purchases: i64,
    /// Grants from the `review` rule
    pub reviews: i64,
    /// Non-cancelled redemptions
    pub redemptions: i64,
}

impl BadgeMetrics {
    /// The value of one metric.
    #[must_use]
    pub const fn value(&self, metric: BadgeMetric) -> i64 {
        match metric {
            BadgeMetric::CoinsEarned => self.coins_earned,
            BadgeMetric::Purchases => self.purchases,
            BadgeMetric::Reviews => self.reviews,
            BadgeMetric::Redemptions => self.redemptions,
        }
    }

    /// Whether a badge's condition holds.
    #[must_use]
    pub const fn satisfies(&self, badge: &CoinBadgeModel) -> bool {
        badge.comparison.holds(self.value(badge.metric), badge.threshold)
    }
}

/// A badge a user has unlocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockedBadge {
    /// The badge definition
    pub badge: CoinBadgeModel,
    /// When it was unlocked
    pub unlocked_at: DateTime<Utc>,
}

/// Reads the metrics badge conditions are evaluated against.
pub async fn get_badge_metrics<C>(db: &C, user_id: &str) -> Result<BadgeMetrics>
where
    C: ConnectionTrait,
{
    let balance = get_balance(db, user_id).await?;
    let grants_from = |source: &'static str| {
        Coin::find()
            .filter(coin::Column::UserId.eq(user_id))
            .filter(coin::Column::Source.eq(source))
    };
    let purchases = grants_from("purchase").count(db).await?;
    let reviews = grants_from("review").count(db).await?;
    let redemptions = CoinRedemption::find()
        .filter(coin_redemption::Column::UserId.eq(user_id))
        .filter(coin_redemption::Column::Status.ne(RedemptionStatus::Cancelled))
        .count(db)
        .await?;

    Ok(BadgeMetrics {
        coins_earned: balance.total_coins,
        purchases: i64::try_from(purchases)?,
        reviews: i64::try_from(reviews)?,
        redemptions: i64::try_from(redemptions)?,
    })
}

/// Unlocks every active badge whose condition the user now meets.
///
/// Returns only the badges unlocked by this call; calling it again without
/// new activity unlocks nothing.
pub async fn check_badges(
    db: &DatabaseConnection,
    system: &SystemConfig,
    user_id: &str,
) -> Result<Vec<CoinBadgeModel>> {
    let now = Utc::now();
    let txn = db.begin().await?;

    let unlocked: HashSet<String> = UserCoinBadge::find()
        .filter(user_coin_badge::Column::UserId.eq(user_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|u| u.badge_id)
        .collect();
    let metrics = get_badge_metrics(&txn, user_id).await?;

    let mut newly_unlocked = Vec::new();
    for badge in get_badges(&txn).await? {
        if unlocked.contains(&badge.id) || !metrics.satisfies(&badge) {
            continue;
        }

        user_coin_badge::ActiveModel {
            user_id: Set(user_id.to_string()),
            badge_id: Set(badge.id.clone()),
            unlocked_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        if badge.reward_coins > 0 {
            grant_coins(
                &txn,
                Grant {
                    user_id: user_id.to_string(),
                    amount: badge.reward_coins,
                    source: BADGE_SOURCE.to_string(),
                    source_id: Some(badge.id.clone()),
                    description: format!("Badge unlocked: {}", badge.name),
                    metadata: None,
                    expires_at: Some(now + Duration::days(system.default_expiration_days)),
                    transaction_type: TransactionType::Bonus,
                    rule: None,
                    delta: BalanceDelta::grant(badge.reward_coins),
                },
                now,
            )
            .await?;
        }

        tracing::info!(user_id, badge = %badge.id, reward = badge.reward_coins, "Badge unlocked");
        newly_unlocked.push(badge);
    }

    txn.commit().await?;
    Ok(newly_unlocked)
}

/// Retrieves the badges a user has unlocked, oldest first.
pub async fn get_user_badges<C>(db: &C, user_id: &str) -> Result<Vec<UnlockedBadge>>
where
    C: ConnectionTrait,
{
    let rows: Vec<(UserCoinBadgeModel, Option<CoinBadgeModel>)> = UserCoinBadge::find()
        .filter(user_coin_badge::Column::UserId.eq(user_id))
        .order_by_asc(user_coin_badge::Column::UnlockedAt)
        .order_by_asc(user_coin_badge::Column::Id)
        .find_also_related(CoinBadge)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(unlock, badge)| {
            badge.map(|badge| UnlockedBadge {
                badge,
                unlocked_at: unlock.unlocked_at,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::earning::{EarnRequest, earn_coins};
    use crate::core::transaction::get_transactions;
    use crate::entities::Comparison;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_first_purchase_badge_unlocks_once_with_bonus() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();

        assert!(check_badges(&db, &system, "u1").await?.is_empty());

        earn_coins(&db, &system, EarnRequest::new("u1", "purchase")).await?;
        let unlocked = check_badges(&db, &system, "u1").await?;
        let ids: Vec<&str> = unlocked.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["first_purchase"]);

        // Bonus credited
        let balance = get_balance(&db, "u1").await?;
        assert_eq!(balance.active_coins, 60);
        let latest = &get_transactions(&db, "u1", Some(1)).await?[0];
        assert_eq!(latest.transaction_type, TransactionType::Bonus);
        assert_eq!(latest.amount, 10);

        // Idempotent
        assert!(check_badges(&db, &system, "u1").await?.is_empty());
        let badges = get_user_badges(&db, "u1").await?;
        assert_eq!(badges.len(), 1);
        assert_eq!(badges[0].badge.id, "first_purchase");
        Ok(())
    }

    #[tokio::test]
    async fn test_coin_collector_threshold() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();

        earn_coins(&db, &system, EarnRequest::new("u1", "referral").with_amount(999)).await?;
        assert!(check_badges(&db, &system, "u1").await?.is_empty());

        earn_coins(&db, &system, EarnRequest::new("u1", "daily_login").with_amount(1)).await?;
        let unlocked = check_badges(&db, &system, "u1").await?;
        assert!(unlocked.iter().any(|b| b.id == "coin_collector"));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_badge_metrics() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();

        earn_coins(&db, &system, EarnRequest::new("u1", "purchase")).await?;
        earn_coins(&db, &system, EarnRequest::new("u1", "purchase")).await?;
        earn_coins(&db, &system, EarnRequest::new("u1", "review")).await?;

        let metrics = get_badge_metrics(&db, "u1").await?;
        assert_eq!(
            metrics,
            BadgeMetrics {
                coins_earned: 120,
                purchases: 2,
                reviews: 1,
                redemptions: 0,
            }
        );
        Ok(())
    }

    #[test]
    fn test_metrics_satisfies_comparisons() {
        let metrics = BadgeMetrics {
            coins_earned: 100,
            ..Default::default()
        };
        let mut badge = CoinBadgeModel {
            id: "b".to_string(),
            name: "B".to_string(),
            description: String::new(),
            metric: BadgeMetric::CoinsEarned,
            comparison: Comparison::Gte,
            threshold: 100,
            reward_coins: 0,
            is_active: true,
        };
        assert!(metrics.satisfies(&badge));

        badge.comparison = Comparison::Gt;
        assert!(!metrics.satisfies(&badge));

        badge.comparison = Comparison::Eq;
        assert!(metrics.satisfies(&badge));

        badge.metric = BadgeMetric::Reviews;
        assert!(!metrics.satisfies(&badge));
    }

    #[tokio::test]
    async fn test_get_user_badges_empty() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(get_user_badges(&db, "u1").await?.is_empty());
        Ok(())
    }
}

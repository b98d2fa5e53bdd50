//! Redemption business logic - spending coins on rewards.
//!
//! Redemption validates the rule (active, inside its window, usage caps,
//! minimum order) and the user's spendable balance before it writes anything.
//! A redemption starts `active`; it becomes `used` when the reward is applied
//! to an order or `cancelled` when refunded.

use crate::{
    config::coins::SystemConfig,
    core::{
        balance::{BalanceDelta, apply_balance_delta, get_balance},
        coin::{Grant, GrantOutcome, consume_coins, grant_coins},
        expiration::expire_due_coins,
        rules::get_active_redemption_rule,
        transaction::{NewTransaction, append_transaction},
    },
    entities::{
        CoinBalanceModel, CoinRedemption, CoinRedemptionModel, CoinStatus, CoinTransactionModel,
        RedemptionRuleModel, RedemptionStatus, RewardType, TransactionType, coin_redemption,
    },
    errors::{Error, Result},
};
use chrono::{Duration, Utc};
use sea_orm::{ActiveEnum, QueryOrder, Set, TransactionTrait, prelude::*};

/// Source tag of grants that return refunded coins.
pub const REFUND_SOURCE: &str = "refund";

/// A request to spend coins on a redemption rule.
#[derive(Debug, Clone, Default)]
pub struct RedeemRequest {
    /// Spending user
    pub user_id: String,
    /// Redemption rule identifier
    pub rule_id: String,
    /// Order the reward is for
    pub order_id: Option<String>,
    /// Order value, needed for percentage discounts and minimum-order rules
    pub order_amount: Option<f64>,
    /// Free-form caller metadata stored on the redemption
    pub metadata: Option<Json>,
}

impl RedeemRequest {
    /// A request without order details.
    #[must_use]
    pub fn new(user_id: impl Into<String>, rule_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            rule_id: rule_id.into(),
            ..Default::default()
        }
    }

    /// Attaches the order the reward is for.
    #[must_use]
    pub fn with_order(mut self, order_id: impl Into<String>, order_amount: f64) -> Self {
        self.order_id = Some(order_id.into());
        self.order_amount = Some(order_amount);
        self
    }
}

/// The records written by a successful redemption.
#[derive(Debug, Clone)]
pub struct RedeemOutcome {
    /// The new redemption
    pub redemption: CoinRedemptionModel,
    /// The ledger entry
    pub transaction: CoinTransactionModel,
    /// The user's balance afterwards
    pub balance: CoinBalanceModel,
}

/// The records written by a successful refund.
#[derive(Debug, Clone)]
pub struct RefundOutcome {
    /// The redemption, now cancelled
    pub redemption: CoinRedemptionModel,
    /// The grant that returned the coins
    pub grant: GrantOutcome,
}

/// Currency value of the discount a rule grants on an order.
///
/// Percentage discounts need an order amount and are capped by
/// `max_discount`; fixed discounts never exceed the order amount when one is
/// given. Non-monetary rewards are worth nothing here.
#[must_use]
pub fn calculate_discount(rule: &RedemptionRuleModel, order_amount: Option<f64>) -> f64 {
    let discount = match rule.reward_type {
        RewardType::PercentageDiscount => {
            let raw = order_amount.unwrap_or(0.0) * rule.reward_value / 100.0;
            rule.max_discount.map_or(raw, |cap| raw.min(cap))
        }
        RewardType::FixedDiscount => order_amount.map_or(rule.reward_value, |order| rule.reward_value.min(order)),
        RewardType::FreeShipping => rule.reward_value,
        RewardType::FreeProduct | RewardType::ExclusiveAccess => 0.0,
    };
    (discount * 100.0).round() / 100.0
}

/// Spends coins on a redemption rule.
///
/// # Errors
/// - [`Error::RuleNotFound`] if the rule is missing or inactive
/// - [`Error::RuleNotValid`] outside the rule's validity window
/// - [`Error::InvalidAmount`] for a negative or non-finite order amount, or
///   one below `min_order_amount`
/// - [`Error::RedemptionLimitReached`] if `max_uses` or `max_uses_per_user`
///   is exhausted
/// - [`Error::InsufficientCoins`] if the spendable balance is below the cost
pub async fn redeem_coins(
    db: &DatabaseConnection,
    system: &SystemConfig,
    request: RedeemRequest,
) -> Result<RedeemOutcome> {
    let now = Utc::now();
    let txn = db.begin().await?;

    let rule = get_active_redemption_rule(&txn, &request.rule_id).await?;
    if !rule.is_valid_at(now) {
        return Err(Error::RuleNotValid { rule: rule.id });
    }

    if let Some(order_amount) = request.order_amount {
        if !order_amount.is_finite() || order_amount < 0.0 {
            return Err(Error::InvalidAmount { amount: order_amount });
        }
    }
    if let Some(minimum) = rule.min_order_amount {
        let order_amount = request.order_amount.unwrap_or(0.0);
        if order_amount < minimum {
            return Err(Error::InvalidAmount { amount: order_amount });
        }
    }

    if let Some(max_uses) = rule.max_uses {
        let uses = count_redemptions(&txn, &rule.id, None).await?;
        if uses >= max_uses {
            return Err(Error::RedemptionLimitReached { rule: rule.id });
        }
    }
    if let Some(max_uses_per_user) = rule.max_uses_per_user {
        let uses = count_redemptions(&txn, &rule.id, Some(&request.user_id)).await?;
        if uses >= max_uses_per_user {
            return Err(Error::RedemptionLimitReached { rule: rule.id });
        }
    }

    expire_due_coins(&txn, Some(&request.user_id), now).await?;
    let balance = get_balance(&txn, &request.user_id).await?;
    if balance.active_coins < rule.coin_cost {
        tracing::warn!(
            user_id = %request.user_id,
            rule = %rule.id,
            available = balance.active_coins,
            required = rule.coin_cost,
            "Insufficient coins for redemption"
        );
        return Err(Error::InsufficientCoins {
            available: balance.active_coins,
            required: rule.coin_cost,
        });
    }

    let discount_amount = calculate_discount(&rule, request.order_amount);
    let redemption = coin_redemption::ActiveModel {
        user_id: Set(request.user_id.clone()),
        rule_id: Set(rule.id.clone()),
        rule_snapshot: Set(serde_json::to_value(&rule)?),
        coin_cost: Set(rule.coin_cost),
        discount_amount: Set(discount_amount),
        status: Set(RedemptionStatus::Active),
        created_at: Set(now),
        used_at: Set(None),
        expires_at: Set(Some(now + Duration::days(system.redemption_expiration_days))),
        order_id: Set(request.order_id),
        metadata: Set(request.metadata),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    consume_coins(&txn, &request.user_id, rule.coin_cost, CoinStatus::Used, now).await?;
    let (before, balance) =
        apply_balance_delta(&txn, &request.user_id, BalanceDelta::redeem(rule.coin_cost), now).await?;
    let transaction = append_transaction(
        &txn,
        NewTransaction {
            user_id: request.user_id,
            transaction_type: TransactionType::Redeemed,
            amount: -rule.coin_cost,
            balance_before: before.active_coins,
            description: rule.name,
            source_id: Some(redemption.id.to_string()),
            rule: Some(rule.id),
        },
        now,
    )
    .await?;

    txn.commit().await?;
    tracing::info!(
        user_id = %redemption.user_id,
        rule = %redemption.rule_id,
        cost = redemption.coin_cost,
        discount = redemption.discount_amount,
        "Redeemed coins"
    );
    Ok(RedeemOutcome {
        redemption,
        transaction,
        balance,
    })
}

/// Cancels an active redemption and returns its coins as a fresh grant.
///
/// # Errors
/// - [`Error::RedemptionNotFound`] for an unknown id
/// - [`Error::InvalidRedemptionState`] unless the redemption is active
pub async fn refund_redemption(
    db: &DatabaseConnection,
    system: &SystemConfig,
    redemption_id: i64,
) -> Result<RefundOutcome> {
    let now = Utc::now();
    let txn = db.begin().await?;

    let redemption = find_active_redemption(&txn, redemption_id).await?;
    let cost = redemption.coin_cost;
    let user_id = redemption.user_id.clone();
    let rule_id = redemption.rule_id.clone();

    let mut active_model: coin_redemption::ActiveModel = redemption.into();
    active_model.status = Set(RedemptionStatus::Cancelled);
    let redemption = active_model.update(&txn).await?;

    let grant = grant_coins(
        &txn,
        Grant {
            user_id,
            amount: cost,
            source: REFUND_SOURCE.to_string(),
            source_id: Some(redemption_id.to_string()),
            description: format!("Refund of redemption {redemption_id}"),
            metadata: None,
            expires_at: Some(now + Duration::days(system.default_expiration_days)),
            transaction_type: TransactionType::Refunded,
            rule: Some(rule_id),
            delta: BalanceDelta::refund(cost),
        },
        now,
    )
    .await?;

    txn.commit().await?;
    tracing::info!(redemption_id, user_id = %redemption.user_id, cost, "Refunded redemption");
    Ok(RefundOutcome { redemption, grant })
}

/// Marks an active redemption as applied to an order.
///
/// # Errors
/// - [`Error::RedemptionNotFound`] for an unknown id
/// - [`Error::InvalidRedemptionState`] unless the redemption is active
pub async fn mark_redemption_used(
    db: &DatabaseConnection,
    redemption_id: i64,
    order_id: Option<String>,
) -> Result<CoinRedemptionModel> {
    let txn = db.begin().await?;
    let redemption = find_active_redemption(&txn, redemption_id).await?;

    let mut active_model: coin_redemption::ActiveModel = redemption.into();
    active_model.status = Set(RedemptionStatus::Used);
    active_model.used_at = Set(Some(Utc::now()));
    if order_id.is_some() {
        active_model.order_id = Set(order_id);
    }
    let updated = active_model.update(&txn).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Retrieves a redemption by id.
pub async fn get_redemption_by_id<C>(db: &C, redemption_id: i64) -> Result<Option<CoinRedemptionModel>>
where
    C: ConnectionTrait,
{
    CoinRedemption::find_by_id(redemption_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a user's redemptions, newest first.
pub async fn get_redemptions_for_user<C>(db: &C, user_id: &str) -> Result<Vec<CoinRedemptionModel>>
where
    C: ConnectionTrait,
{
    CoinRedemption::find()
        .filter(coin_redemption::Column::UserId.eq(user_id))
        .order_by_desc(coin_redemption::Column::CreatedAt)
        .order_by_desc(coin_redemption::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn find_active_redemption<C>(db: &C, redemption_id: i64) -> Result<CoinRedemptionModel>
where
    C: ConnectionTrait,
{
    let redemption = get_redemption_by_id(db, redemption_id)
        .await?
        .ok_or(Error::RedemptionNotFound { id: redemption_id })?;

    if redemption.status != RedemptionStatus::Active {
        return Err(Error::InvalidRedemptionState {
            id: redemption_id,
            status: redemption.status.to_value(),
        });
    }
    Ok(redemption)
}

/// Non-cancelled redemptions of a rule, optionally for one user.
async fn count_redemptions<C>(db: &C, rule_id: &str, user_id: Option<&str>) -> Result<i64>
where
    C: ConnectionTrait,
{
    let mut query = CoinRedemption::find()
        .filter(coin_redemption::Column::RuleId.eq(rule_id))
        .filter(coin_redemption::Column::Status.ne(RedemptionStatus::Cancelled));
    if let Some(user_id) = user_id {
        query = query.filter(coin_redemption::Column::UserId.eq(user_id));
    }
    Ok(i64::try_from(query.count(db).await?)?)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::balance::is_consistent;
    use crate::core::coin::get_active_coins;
    use crate::core::transaction::get_transactions;
    use crate::entities::{RedemptionRule, redemption_rule};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_redeem_coins_success() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();
        earn_test_coins(&db, "u1", 300).await?;

        let request = RedeemRequest::new("u1", "discount_10").with_order("order-1", 120.0);
        let outcome = redeem_coins(&db, &system, request).await?;

        assert_eq!(outcome.redemption.status, RedemptionStatus::Active);
        assert_eq!(outcome.redemption.coin_cost, 200);
        assert_eq!(outcome.redemption.discount_amount, 12.0);
        assert_eq!(outcome.redemption.order_id.as_deref(), Some("order-1"));
        assert_eq!(outcome.redemption.rule_snapshot["name"], "10% discount");

        assert_eq!(outcome.balance.active_coins, 100);
        assert_eq!(outcome.balance.used_coins, 200);
        assert_eq!(outcome.balance.total_coins, 300);
        assert!(is_consistent(&outcome.balance));

        assert_eq!(outcome.transaction.transaction_type, TransactionType::Redeemed);
        assert_eq!(outcome.transaction.amount, -200);
        assert_eq!(outcome.transaction.balance_before, 300);
        assert_eq!(outcome.transaction.balance_after, 100);
        assert_eq!(outcome.transaction.source_id, Some(outcome.redemption.id.to_string()));

        // Grants were drained by the cost
        let remaining: i64 = get_active_coins(&db, "u1", Utc::now()).await?.iter().map(|c| c.remaining).sum();
        assert_eq!(remaining, 100);
        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_insufficient_coins_changes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();
        earn_test_coins(&db, "u1", 50).await?;

        let result = redeem_coins(&db, &system, RedeemRequest::new("u1", "discount_5")).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientCoins {
                available: 50,
                required: 100
            })
        ));

        let balance = get_balance(&db, "u1").await?;
        assert_eq!(balance.active_coins, 50);
        assert_eq!(balance.used_coins, 0);
        assert_eq!(get_transactions(&db, "u1", None).await?.len(), 1);
        assert!(get_redemptions_for_user(&db, "u1").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_unknown_rule() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();
        earn_test_coins(&db, "u1", 500).await?;

        let result = redeem_coins(&db, &system, RedeemRequest::new("u1", "free_car")).await;
        assert!(matches!(result, Err(Error::RuleNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_outside_validity_window() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();
        earn_test_coins(&db, "u1", 500).await?;

        let rule = RedemptionRule::find_by_id("free_shipping".to_string()).one(&db).await?.unwrap();
        let mut active_model: redemption_rule::ActiveModel = rule.into();
        active_model.valid_from = Set(Some(Utc::now() + Duration::days(7)));
        active_model.update(&db).await?;

        let result = redeem_coins(&db, &system, RedeemRequest::new("u1", "free_shipping")).await;
        assert!(matches!(result, Err(Error::RuleNotValid { .. })));
        assert_eq!(get_balance(&db, "u1").await?.active_coins, 500);
        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_min_order_amount() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();
        earn_test_coins(&db, "u1", 600).await?;

        // fixed_5 requires an order of at least 20.00
        let small = RedeemRequest::new("u1", "fixed_5").with_order("o1", 10.0);
        assert!(matches!(
            redeem_coins(&db, &system, small).await,
            Err(Error::InvalidAmount { .. })
        ));

        let large = RedeemRequest::new("u1", "fixed_5").with_order("o2", 25.0);
        let outcome = redeem_coins(&db, &system, large).await?;
        assert_eq!(outcome.redemption.discount_amount, 5.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_per_user_limit_and_refund_frees_it() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();
        earn_test_coins(&db, "u1", 1000).await?;

        // exclusive_access allows one use per user
        let first = redeem_coins(&db, &system, RedeemRequest::new("u1", "exclusive_access")).await?;
        let second = redeem_coins(&db, &system, RedeemRequest::new("u1", "exclusive_access")).await;
        assert!(matches!(second, Err(Error::RedemptionLimitReached { .. })));

        refund_redemption(&db, &system, first.redemption.id).await?;
        redeem_coins(&db, &system, RedeemRequest::new("u1", "exclusive_access")).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_global_limit() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();
        create_custom_redemption_rule(&db, "flash_sale", 10, Some(1)).await?;
        earn_test_coins(&db, "u1", 100).await?;
        earn_test_coins(&db, "u2", 100).await?;

        redeem_coins(&db, &system, RedeemRequest::new("u1", "flash_sale")).await?;
        let result = redeem_coins(&db, &system, RedeemRequest::new("u2", "flash_sale")).await;
        assert!(matches!(result, Err(Error::RedemptionLimitReached { rule }) if rule == "flash_sale"));
        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_rejects_bad_order_amount() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();
        earn_test_coins(&db, "u1", 500).await?;

        for amount in [f64::NAN, f64::INFINITY, -1.0] {
            let request = RedeemRequest::new("u1", "discount_5").with_order("o", amount);
            assert!(matches!(
                redeem_coins(&db, &system, request).await,
                Err(Error::InvalidAmount { .. })
            ));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_refund_restores_active_coins() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();
        earn_test_coins(&db, "u1", 250).await?;

        let redeemed = redeem_coins(&db, &system, RedeemRequest::new("u1", "free_shipping")).await?;
        let refund = refund_redemption(&db, &system, redeemed.redemption.id).await?;

        assert_eq!(refund.redemption.status, RedemptionStatus::Cancelled);
        assert_eq!(refund.grant.coin.source, REFUND_SOURCE);
        assert_eq!(refund.grant.transaction.transaction_type, TransactionType::Refunded);
        assert_eq!(refund.grant.transaction.amount, 150);

        let balance = refund.grant.balance;
        assert_eq!(balance.active_coins, 250);
        assert_eq!(balance.used_coins, 0);
        assert_eq!(balance.total_coins, 250);
        assert!(is_consistent(&balance));
        Ok(())
    }

    #[tokio::test]
    async fn test_refund_rejections() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();
        earn_test_coins(&db, "u1", 250).await?;

        assert!(matches!(
            refund_redemption(&db, &system, 999).await,
            Err(Error::RedemptionNotFound { id: 999 })
        ));

        let redeemed = redeem_coins(&db, &system, RedeemRequest::new("u1", "discount_5")).await?;
        refund_redemption(&db, &system, redeemed.redemption.id).await?;
        let again = refund_redemption(&db, &system, redeemed.redemption.id).await;
        assert!(matches!(
            again,
            Err(Error::InvalidRedemptionState { status, .. }) if status == "cancelled"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_mark_redemption_used() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();
        earn_test_coins(&db, "u1", 250).await?;

        let redeemed = redeem_coins(&db, &system, RedeemRequest::new("u1", "discount_5")).await?;
        let used = mark_redemption_used(&db, redeemed.redemption.id, Some("order-9".to_string())).await?;
        assert_eq!(used.status, RedemptionStatus::Used);
        assert!(used.used_at.is_some());
        assert_eq!(used.order_id.as_deref(), Some("order-9"));

        // A used reward can no longer be refunded
        assert!(matches!(
            refund_redemption(&db, &system, used.id).await,
            Err(Error::InvalidRedemptionState { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_calculate_discount() {
        let mut rule = test_redemption_rule("r", 100);

        rule.reward_type = RewardType::PercentageDiscount;
        rule.reward_value = 10.0;
        assert_eq!(calculate_discount(&rule, Some(80.0)), 8.0);
        assert_eq!(calculate_discount(&rule, None), 0.0);
        rule.max_discount = Some(5.0);
        assert_eq!(calculate_discount(&rule, Some(80.0)), 5.0);

        rule.reward_type = RewardType::FixedDiscount;
        rule.reward_value = 15.0;
        assert_eq!(calculate_discount(&rule, None), 15.0);
        assert_eq!(calculate_discount(&rule, Some(12.0)), 12.0);

        rule.reward_type = RewardType::FreeShipping;
        rule.reward_value = 5.99;
        assert_eq!(calculate_discount(&rule, Some(100.0)), 5.99);

        rule.reward_type = RewardType::ExclusiveAccess;
        assert_eq!(calculate_discount(&rule, Some(100.0)), 0.0);
    }

    #[tokio::test]
    async fn test_redeem_does_not_spend_coins_past_expiry() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();

        // A grant whose expiry passed without a sweep
        grant_coins(
            &db,
            Grant {
                user_id: "u1".to_string(),
                amount: 200,
                source: "purchase".to_string(),
                source_id: None,
                description: "Old purchase".to_string(),
                metadata: None,
                expires_at: Some(Utc::now() - Duration::days(1)),
                transaction_type: TransactionType::Earned,
                rule: Some("purchase".to_string()),
                delta: BalanceDelta::grant(200),
            },
            Utc::now(),
        )
        .await?;

        let result = redeem_coins(&db, &system, RedeemRequest::new("u1", "discount_10")).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientCoins {
                available: 0,
                required: 200
            })
        ));

        // With fresh coins the redemption goes through and the old grant is expired
        earn_test_coins(&db, "u1", 250).await?;
        let outcome = redeem_coins(&db, &system, RedeemRequest::new("u1", "discount_10")).await?;
        assert_eq!(outcome.balance.active_coins, 50);
        assert_eq!(outcome.balance.expired_coins, 200);
        assert_eq!(outcome.balance.used_coins, 200);
        assert!(is_consistent(&outcome.balance));
        Ok(())
    }
}

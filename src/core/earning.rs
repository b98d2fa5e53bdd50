//! Earning coins.
//!
//! [`earn_coins`] grants coins for a named action according to its earning
//! rule and enforces the rule's daily and lifetime caps. [`adjust_balance`]
//! is the manual correction path used by operators.

use crate::{
    config::coins::SystemConfig,
    core::{
        balance::{BalanceDelta, apply_balance_delta, get_balance},
        coin::{Grant, GrantOutcome, consume_coins, grant_coins, invalid_amount},
        expiration::expire_due_coins,
        rules::get_active_earning_rule,
        transaction::{NewTransaction, append_transaction},
    },
    entities::{Coin, CoinStatus, CoinTransactionModel, TransactionType, coin},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use sea_orm::{TransactionTrait, prelude::*};

/// Source tag of grants made by [`adjust_balance`].
pub const ADJUSTMENT_SOURCE: &str = "adjustment";

/// A request to grant coins for an action.
#[derive(Debug, Clone, Default)]
pub struct EarnRequest {
    /// Receiving user
    pub user_id: String,
    /// Earning rule identifier
    pub rule: String,
    /// Caller reference such as an order id
    pub source_id: Option<String>,
    /// Overrides the rule's configured amount
    pub amount: Option<i64>,
    /// Free-form caller metadata stored on the grant
    pub metadata: Option<Json>,
}

impl EarnRequest {
    /// A request for the rule's configured amount.
    #[must_use]
    pub fn new(user_id: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            rule: rule.into(),
            ..Default::default()
        }
    }

    /// Overrides the amount granted.
    #[must_use]
    pub const fn with_amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Attaches a caller reference.
    #[must_use]
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Attaches caller metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Json) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Grants coins to a user for an action covered by an earning rule.
///
/// The grant expires `default_expiration_days` after now.
///
/// # Errors
/// - [`Error::RuleNotFound`] if the rule is missing or inactive
/// - [`Error::InvalidAmount`] if the amount is not positive or exceeds
///   `max_coins_per_transaction`
/// - [`Error::EarningLimitReached`] if a daily or lifetime cap of the rule
///   would be exceeded
pub async fn earn_coins(
    db: &DatabaseConnection,
    system: &SystemConfig,
    request: EarnRequest,
) -> Result<GrantOutcome> {
    let now = Utc::now();
    let txn = db.begin().await?;

    let rule = get_active_earning_rule(&txn, &request.rule).await?;
    let amount = request.amount.unwrap_or(rule.amount);
    if amount <= 0 || amount > system.max_coins_per_transaction {
        tracing::warn!(user_id = %request.user_id, rule = %rule.rule, amount, "Rejected earning amount");
        return Err(invalid_amount(amount));
    }

    if let Some(limit) = rule.max_coins_per_day {
        let earned_today =
            earned_under_rule(&txn, &request.user_id, &rule.rule, Some(start_of_day(now))).await?;
        if earned_today + amount > limit {
            tracing::warn!(user_id = %request.user_id, rule = %rule.rule, limit, "Daily earning cap reached");
            return Err(Error::EarningLimitReached {
                rule: rule.rule,
                limit,
            });
        }
    }

    if let Some(limit) = rule.max_coins_per_user {
        let earned_ever = earned_under_rule(&txn, &request.user_id, &rule.rule, None).await?;
        if earned_ever + amount > limit {
            tracing::warn!(user_id = %request.user_id, rule = %rule.rule, limit, "Lifetime earning cap reached");
            return Err(Error::EarningLimitReached {
                rule: rule.rule,
                limit,
            });
        }
    }

    let outcome = grant_coins(
        &txn,
        Grant {
            user_id: request.user_id,
            amount,
            source: rule.rule.clone(),
            source_id: request.source_id,
            description: rule.name,
            metadata: request.metadata,
            expires_at: Some(now + Duration::days(system.default_expiration_days)),
            transaction_type: TransactionType::Earned,
            rule: Some(rule.rule),
            delta: BalanceDelta::grant(amount),
        },
        now,
    )
    .await?;

    txn.commit().await?;
    tracing::info!(
        user_id = %outcome.coin.user_id,
        rule = %outcome.coin.source,
        amount,
        balance = outcome.balance.active_coins,
        "Earned coins"
    );
    Ok(outcome)
}

/// Applies a signed manual correction to a user's balance.
///
/// Positive amounts become a regular grant with source `adjustment`. Negative
/// amounts drain active grants oldest-expiry-first, mark them `cancelled` and
/// reduce both the lifetime and spendable totals.
///
/// # Errors
/// - [`Error::InvalidAmount`] for zero or an amount beyond `max_coins_per_transaction`
/// - [`Error::InsufficientCoins`] if a withdrawal exceeds the spendable balance
pub async fn adjust_balance(
    db: &DatabaseConnection,
    system: &SystemConfig,
    user_id: &str,
    amount: i64,
    reason: &str,
) -> Result<CoinTransactionModel> {
    if amount
        .checked_abs()
        .is_none_or(|magnitude| magnitude == 0 || magnitude > system.max_coins_per_transaction)
    {
        return Err(invalid_amount(amount));
    }

    let now = Utc::now();
    let txn = db.begin().await?;

    let transaction = if amount > 0 {
        grant_coins(
            &txn,
            Grant {
                user_id: user_id.to_string(),
                amount,
                source: ADJUSTMENT_SOURCE.to_string(),
                source_id: None,
                description: reason.to_string(),
                metadata: None,
                expires_at: Some(now + Duration::days(system.default_expiration_days)),
                transaction_type: TransactionType::Adjustment,
                rule: None,
                delta: BalanceDelta::grant(amount),
            },
            now,
        )
        .await?
        .transaction
    } else {
        let withdrawal = -amount;
        expire_due_coins(&txn, Some(user_id), now).await?;
        let balance = get_balance(&txn, user_id).await?;
        if balance.active_coins < withdrawal {
            return Err(Error::InsufficientCoins {
                available: balance.active_coins,
                required: withdrawal,
            });
        }

        consume_coins(&txn, user_id, withdrawal, CoinStatus::Cancelled, now).await?;
        let (before, _) =
            apply_balance_delta(&txn, user_id, BalanceDelta::withdraw(withdrawal), now).await?;
        append_transaction(
            &txn,
            NewTransaction {
                user_id: user_id.to_string(),
                transaction_type: TransactionType::Adjustment,
                amount,
                balance_before: before.active_coins,
                description: reason.to_string(),
                source_id: None,
                rule: None,
            },
            now,
        )
        .await?
    };

    txn.commit().await?;
    tracing::info!(user_id, amount, reason, "Adjusted balance");
    Ok(transaction)
}

/// Coins a user has been granted under `rule`, optionally only since `since`.
async fn earned_under_rule<C>(
    db: &C,
    user_id: &str,
    rule: &str,
    since: Option<DateTime<Utc>>,
) -> Result<i64>
where
    C: ConnectionTrait,
{
    let mut query = Coin::find()
        .filter(coin::Column::UserId.eq(user_id))
        .filter(coin::Column::Source.eq(rule));
    if let Some(since) = since {
        query = query.filter(coin::Column::EarnedAt.gte(since));
    }

    Ok(query.all(db).await?.iter().map(|c| c.amount).sum())
}

/// Midnight UTC of the day containing `now`.
fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

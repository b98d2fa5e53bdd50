//! Coin grants.
//!
//! Every coin that enters the ledger does so through [`grant_coins`], which
//! writes the grant, the balance change and the ledger entry together.
//! Spending and withdrawals go through [`consume_coins`], which drains active
//! grants oldest-expiry-first.

use crate::{
    core::{
        balance::{BalanceDelta, apply_balance_delta},
        transaction::{NewTransaction, append_transaction},
    },
    entities::{
        Coin, CoinBalanceModel, CoinModel, CoinStatus, CoinTransactionModel, TransactionType,
        coin,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Condition, QueryOrder, Set, prelude::*};

/// Everything needed to put new coins into a user's account.
#[derive(Debug, Clone)]
pub struct Grant {
    /// Receiving user
    pub user_id: String,
    /// Coins granted, always positive
    pub amount: i64,
    /// Earning rule identifier or other origin tag
    pub source: String,
    /// Caller reference
    pub source_id: Option<String>,
    /// Human-readable description
    pub description: String,
    /// Free-form caller metadata
    pub metadata: Option<Json>,
    /// When the grant expires
    pub expires_at: Option<DateTime<Utc>>,
    /// Ledger entry type
    pub transaction_type: TransactionType,
    /// Rule recorded on the ledger entry
    pub rule: Option<String>,
    /// Balance change; [`BalanceDelta::grant`] unless coins move between buckets
    pub delta: BalanceDelta,
}

/// The records written by a successful grant.
#[derive(Debug, Clone)]
pub struct GrantOutcome {
    /// The new coin grant
    pub coin: CoinModel,
    /// The ledger entry
    pub transaction: CoinTransactionModel,
    /// The user's balance afterwards
    pub balance: CoinBalanceModel,
}

/// Writes a grant, its balance change and its ledger entry.
///
/// Meant to run inside the caller's database transaction.
pub async fn grant_coins<C>(db: &C, grant: Grant, now: DateTime<Utc>) -> Result<GrantOutcome>
where
    C: ConnectionTrait,
{
    if grant.amount <= 0 {
        return Err(invalid_amount(grant.amount));
    }

    let coin = coin::ActiveModel {
        user_id: Set(grant.user_id.clone()),
        amount: Set(grant.amount),
        remaining: Set(grant.amount),
        status: Set(CoinStatus::Active),
        earned_at: Set(now),
        expires_at: Set(grant.expires_at),
        used_at: Set(None),
        source: Set(grant.source),
        source_id: Set(grant.source_id.clone()),
        description: Set(grant.description.clone()),
        metadata: Set(grant.metadata),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let (before, balance) = apply_balance_delta(db, &grant.user_id, grant.delta, now).await?;

    let transaction = append_transaction(
        db,
        NewTransaction {
            user_id: grant.user_id,
            transaction_type: grant.transaction_type,
            amount: grant.amount,
            balance_before: before.active_coins,
            description: grant.description,
            source_id: grant.source_id,
            rule: grant.rule,
        },
        now,
    )
    .await?;

    Ok(GrantOutcome {
        coin,
        transaction,
        balance,
    })
}

/// Takes `amount` coins out of a user's active grants, oldest expiry first.
///
/// Grants drained to zero move to `exhausted`; `used_at` is stamped when that
/// status is [`CoinStatus::Used`]. Meant to run inside the caller's database
/// transaction, after the balance check.
///
/// # Errors
/// Returns [`Error::InsufficientCoins`] if the active grants hold fewer than
/// `amount` coins.
pub async fn consume_coins<C>(
    db: &C,
    user_id: &str,
    amount: i64,
    exhausted: CoinStatus,
    now: DateTime<Utc>,
) -> Result<Vec<CoinModel>>
where
    C: ConnectionTrait,
{
    let grants = get_active_coins(db, user_id, now).await?;
    let available: i64 = grants.iter().map(|c| c.remaining).sum();
    if available < amount {
        return Err(Error::InsufficientCoins {
            available,
            required: amount,
        });
    }

    let mut left = amount;
    let mut touched = Vec::new();
    for grant in grants {
        if left == 0 {
            break;
        }
        let take = grant.remaining.min(left);
        left -= take;

        let remaining = grant.remaining - take;
        let mut active_model: coin::ActiveModel = grant.into();
        active_model.remaining = Set(remaining);
        if remaining == 0 {
            active_model.status = Set(exhausted);
            if exhausted == CoinStatus::Used {
                active_model.used_at = Set(Some(now));
            }
        }
        touched.push(active_model.update(db).await?);
    }

    Ok(touched)
}

/// Retrieves a user's grants spendable at `now`, in consumption order.
///
/// Grants past their expiry are left out even before a sweep has marked them.
pub async fn get_active_coins<C>(db: &C, user_id: &str, now: DateTime<Utc>) -> Result<Vec<CoinModel>>
where
    C: ConnectionTrait,
{
    Coin::find()
        .filter(coin::Column::UserId.eq(user_id))
        .filter(coin::Column::Status.eq(CoinStatus::Active))
        .filter(coin::Column::Remaining.gt(0))
        .filter(
            Condition::any()
                .add(coin::Column::ExpiresAt.is_null())
                .add(coin::Column::ExpiresAt.gt(now)),
        )
        .order_by_asc(coin::Column::ExpiresAt)
        .order_by_asc(coin::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all of a user's grants, newest first.
pub async fn get_coins_for_user<C>(db: &C, user_id: &str) -> Result<Vec<CoinModel>>
where
    C: ConnectionTrait,
{
    Coin::find()
        .filter(coin::Column::UserId.eq(user_id))
        .order_by_desc(coin::Column::EarnedAt)
        .order_by_desc(coin::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn invalid_amount(amount: i64) -> Error {
    Error::InvalidAmount {
        amount: amount as f64,
    }
}

//! Balance snapshots.
//!
//! A user's `coin_balances` row is created on their first grant. Reads for a
//! user without a row return a zeroed snapshot that is not persisted.

use crate::{
    entities::{CoinBalance, CoinBalanceModel, coin_balance},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, prelude::*};

/// Signed changes to each column of a balance snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceDelta {
    /// Change to lifetime coins granted
    pub total: i64,
    /// Change to spendable coins
    pub active: i64,
    /// Change to coins spent on redemptions
    pub used: i64,
    /// Change to coins lost to expiry
    pub expired: i64,
}

impl BalanceDelta {
    /// New coins entering the ledger.
    #[must_use]
    pub const fn grant(amount: i64) -> Self {
        Self {
            total: amount,
            active: amount,
            used: 0,
            expired: 0,
        }
    }

    /// Spendable coins spent on a redemption.
    #[must_use]
    pub const fn redeem(amount: i64) -> Self {
        Self {
            total: 0,
            active: -amount,
            used: amount,
            expired: 0,
        }
    }

    /// Spent coins returned by a cancelled redemption.
    #[must_use]
    pub const fn refund(amount: i64) -> Self {
        Self {
            total: 0,
            active: amount,
            used: -amount,
            expired: 0,
        }
    }

    /// Spendable coins lost to expiry.
    #[must_use]
    pub const fn expire(amount: i64) -> Self {
        Self {
            total: 0,
            active: -amount,
            used: 0,
            expired: amount,
        }
    }

    /// Spendable coins withdrawn from the ledger.
    #[must_use]
    pub const fn withdraw(amount: i64) -> Self {
        Self {
            total: -amount,
            active: -amount,
            used: 0,
            expired: 0,
        }
    }
}

/// Returns the stored balance for a user, or a zeroed one if the user has none.
pub async fn get_balance<C>(db: &C, user_id: &str) -> Result<CoinBalanceModel>
where
    C: ConnectionTrait,
{
    let stored = CoinBalance::find_by_id(user_id.to_string()).one(db).await?;
    Ok(stored.unwrap_or_else(|| CoinBalanceModel::empty(user_id, Utc::now())))
}

/// Returns every stored balance ordered by user id.
pub async fn get_all_balances<C>(db: &C) -> Result<Vec<CoinBalanceModel>>
where
    C: ConnectionTrait,
{
    use sea_orm::QueryOrder;

    CoinBalance::find()
        .order_by_asc(coin_balance::Column::UserId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Whether `total == active + used + expired` and no column is negative.
#[must_use]
pub const fn is_consistent(balance: &CoinBalanceModel) -> bool {
    balance.active_coins >= 0
        && balance.used_coins >= 0
        && balance.expired_coins >= 0
        && balance.total_coins
            == balance.active_coins + balance.used_coins + balance.expired_coins
}

/// Applies `delta` to a user's balance, creating the row if needed.
///
/// Meant to run inside the caller's database transaction. Returns the balance
/// before and after the change.
///
/// # Errors
/// Returns [`Error::InsufficientCoins`] if the change would make the spendable
/// balance negative, and [`Error::Config`] if any other column would go negative.
pub async fn apply_balance_delta<C>(
    db: &C,
    user_id: &str,
    delta: BalanceDelta,
    now: DateTime<Utc>,
) -> Result<(CoinBalanceModel, CoinBalanceModel)>
where
    C: ConnectionTrait,
{
    let stored = CoinBalance::find_by_id(user_id.to_string()).one(db).await?;
    let before = stored
        .clone()
        .unwrap_or_else(|| CoinBalanceModel::empty(user_id, now));

    let after = CoinBalanceModel {
        user_id: user_id.to_string(),
        total_coins: before.total_coins + delta.total,
        active_coins: before.active_coins + delta.active,
        expired_coins: before.expired_coins + delta.expired,
        used_coins: before.used_coins + delta.used,
        last_updated: now,
    };

    if after.active_coins < 0 {
        return Err(Error::InsufficientCoins {
            available: before.active_coins,
            required: -delta.active,
        });
    }
    if !is_consistent(&after) {
        return Err(Error::Config {
            message: format!("balance change {delta:?} would corrupt the balance of {user_id}"),
        });
    }

    let saved = match stored {
        Some(existing) => {
            let mut active_model: coin_balance::ActiveModel = existing.into();
            active_model.total_coins = Set(after.total_coins);
            active_model.active_coins = Set(after.active_coins);
            active_model.expired_coins = Set(after.expired_coins);
            active_model.used_coins = Set(after.used_coins);
            active_model.last_updated = Set(now);
            active_model.update(db).await?
        }
        None => {
            let active_model = coin_balance::ActiveModel {
                user_id: Set(after.user_id.clone()),
                total_coins: Set(after.total_coins),
                active_coins: Set(after.active_coins),
                expired_coins: Set(after.expired_coins),
                used_coins: Set(after.used_coins),
                last_updated: Set(now),
            };
            active_model.insert(db).await?
        }
    };

    Ok((before, saved))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_get_balance_unknown_user_is_zeroed() -> Result<()> {
        let db = setup_test_db().await?;

        let balance = get_balance(&db, "nobody").await?;
        assert_eq!(balance.user_id, "nobody");
        assert_eq!(balance.total_coins, 0);
        assert_eq!(balance.active_coins, 0);
        assert_eq!(balance.used_coins, 0);
        assert_eq!(balance.expired_coins, 0);

        // Reading does not create a row
        assert!(get_all_balances(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_balance_delta_creates_row() -> Result<()> {
        let db = setup_test_db().await?;

        let (before, after) = apply_balance_delta(&db, "u1", BalanceDelta::grant(40), Utc::now()).await?;
        assert_eq!(before.active_coins, 0);
        assert_eq!(after.total_coins, 40);
        assert_eq!(after.active_coins, 40);

        let stored = get_balance(&db, "u1").await?;
        assert_eq!(stored, after);
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_balance_delta_updates_existing_row() -> Result<()> {
        let db = setup_test_db().await?;

        apply_balance_delta(&db, "u1", BalanceDelta::grant(100), Utc::now()).await?;
        let (before, after) = apply_balance_delta(&db, "u1", BalanceDelta::redeem(30), Utc::now()).await?;

        assert_eq!(before.active_coins, 100);
        assert_eq!(after.total_coins, 100);
        assert_eq!(after.active_coins, 70);
        assert_eq!(after.used_coins, 30);
        assert!(is_consistent(&after));
        assert_eq!(get_all_balances(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_balance_delta_rejects_negative_active() -> Result<()> {
        let db = setup_test_db().await?;

        apply_balance_delta(&db, "u1", BalanceDelta::grant(10), Utc::now()).await?;
        let result = apply_balance_delta(&db, "u1", BalanceDelta::redeem(20), Utc::now()).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientCoins {
                available: 10,
                required: 20
            })
        ));

        // Unchanged
        assert_eq!(get_balance(&db, "u1").await?.active_coins, 10);
        Ok(())
    }

    #[test]
    fn test_is_consistent() {
        let mut balance = CoinBalanceModel::empty("u1", Utc::now());
        balance.total_coins = 100;
        balance.active_coins = 60;
        balance.used_coins = 30;
        balance.expired_coins = 10;
        assert!(is_consistent(&balance));

        balance.used_coins = 40;
        assert!(!is_consistent(&balance));
    }
}

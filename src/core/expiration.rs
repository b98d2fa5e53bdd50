//! Coin expiration
//!
//! Every coin grant carries an expiry. The sweep moves the unspent remainder of
//! each grant past its expiry from the spendable bucket to the expired bucket
//! and logs one `expired` ledger entry per grant. The date of the last sweep is
//! kept in the `system_state` table so the bot runs it at most once a day.

use crate::{
    config::coins::SystemConfig,
    core::{
        balance::{BalanceDelta, apply_balance_delta},
        transaction::{NewTransaction, append_transaction},
    },
    entities::{
        Coin, CoinModel, CoinStatus, SystemState, TransactionType, coin, system_state,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};

const LAST_EXPIRATION_SWEEP_KEY: &str = "last_expiration_sweep";

/// A grant whose remainder expired in a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredGrant {
    /// The expired grant
    pub coin_id: i64,
    /// Owner of the grant
    pub user_id: String,
    /// Coins that were still unspent
    pub amount: i64,
}

/// Result of one expiration sweep.
#[derive(Debug, Clone)]
pub struct ExpirationSweepResult {
    /// Grants expired in this sweep
    pub expired_grants: Vec<ExpiredGrant>,
    /// Number of distinct users who lost coins
    pub users_affected: usize,
    /// Coins expired across all users
    pub total_expired: i64,
    /// Date the sweep ran for
    pub sweep_date: NaiveDate,
}

/// Returns true if no sweep has run yet today (UTC).
pub async fn is_expiration_sweep_needed(db: &DatabaseConnection) -> Result<bool> {
    let last_sweep = get_last_expiration_sweep_date(db).await?;
    let today = Utc::now().date_naive();
    Ok(last_sweep.is_none_or(|last| last < today))
}

/// Retrieves the date of the last sweep from the `system_state` table.
pub async fn get_last_expiration_sweep_date(db: &DatabaseConnection) -> Result<Option<NaiveDate>> {
    let state = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_EXPIRATION_SWEEP_KEY))
        .one(db)
        .await?;

    match state {
        Some(s) => NaiveDate::parse_from_str(&s.value, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| Error::Config {
                message: format!("Failed to parse last expiration sweep date: {e}"),
            }),
        None => Ok(None),
    }
}

async fn set_last_expiration_sweep_date<C>(db: &C, date: NaiveDate) -> Result<()>
where
    C: ConnectionTrait,
{
    let date_str = date.format("%Y-%m-%d").to_string();
    let now = Utc::now().naive_utc();

    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_EXPIRATION_SWEEP_KEY))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(date_str);
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        system_state::ActiveModel {
            key: Set(LAST_EXPIRATION_SWEEP_KEY.to_string()),
            value: Set(date_str),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

/// Expires every active grant whose expiry is at or before `as_of`.
///
/// All changes are applied in one database transaction, together with the
/// sweep date.
pub async fn expire_coins(
    db: &DatabaseConnection,
    as_of: DateTime<Utc>,
) -> Result<ExpirationSweepResult> {
    let txn = db.begin().await?;

    let expired_grants = expire_due_coins(&txn, None, as_of).await?;
    let sweep_date = as_of.date_naive();
    set_last_expiration_sweep_date(&txn, sweep_date).await?;
    txn.commit().await?;

    let mut users: Vec<&str> = expired_grants.iter().map(|g| g.user_id.as_str()).collect();
    users.dedup();
    let users_affected = users.len();
    let total_expired = expired_grants.iter().map(|g| g.amount).sum();

    tracing::info!(
        grants = expired_grants.len(),
        users_affected,
        total_expired,
        "Expiration sweep complete"
    );
    Ok(ExpirationSweepResult {
        expired_grants,
        users_affected,
        total_expired,
        sweep_date,
    })
}

/// Expires the due grants of one user, or of everyone when `user_id` is `None`.
///
/// Meant to run inside the caller's database transaction. Spending paths call
/// it first so coins past their expiry are never spent between sweeps.
pub async fn expire_due_coins<C>(
    db: &C,
    user_id: Option<&str>,
    as_of: DateTime<Utc>,
) -> Result<Vec<ExpiredGrant>>
where
    C: ConnectionTrait,
{
    let mut query = Coin::find()
        .filter(coin::Column::Status.eq(CoinStatus::Active))
        .filter(coin::Column::Remaining.gt(0))
        .filter(coin::Column::ExpiresAt.lte(as_of));
    if let Some(user_id) = user_id {
        query = query.filter(coin::Column::UserId.eq(user_id));
    }
    let due = query
        .order_by_asc(coin::Column::UserId)
        .order_by_asc(coin::Column::ExpiresAt)
        .order_by_asc(coin::Column::Id)
        .all(db)
        .await?;

    let mut expired_grants = Vec::with_capacity(due.len());
    for grant in due {
        let amount = grant.remaining;
        let coin_id = grant.id;
        let user_id = grant.user_id.clone();
        let source = grant.source.clone();

        let mut active_model: coin::ActiveModel = grant.into();
        active_model.remaining = Set(0);
        active_model.status = Set(CoinStatus::Expired);
        active_model.update(db).await?;

        let (before, _) = apply_balance_delta(db, &user_id, BalanceDelta::expire(amount), as_of).await?;
        append_transaction(
            db,
            NewTransaction {
                user_id: user_id.clone(),
                transaction_type: TransactionType::Expired,
                amount: -amount,
                balance_before: before.active_coins,
                description: format!("{amount} coins expired"),
                source_id: Some(coin_id.to_string()),
                rule: Some(source),
            },
            as_of,
        )
        .await?;

        expired_grants.push(ExpiredGrant {
            coin_id,
            user_id,
            amount,
        });
    }

    Ok(expired_grants)
}

/// Retrieves a user's active grants that expire within the warning window.
pub async fn get_expiring_coins<C>(
    db: &C,
    system: &SystemConfig,
    user_id: &str,
) -> Result<Vec<CoinModel>>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let horizon = now + Duration::days(system.expiration_warning_days);

    Coin::find()
        .filter(coin::Column::UserId.eq(user_id))
        .filter(coin::Column::Status.eq(CoinStatus::Active))
        .filter(coin::Column::Remaining.gt(0))
        .filter(coin::Column::ExpiresAt.gt(now))
        .filter(coin::Column::ExpiresAt.lte(horizon))
        .order_by_asc(coin::Column::ExpiresAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Formats a sweep result into a human-readable summary.
///
/// At most `max_grants` grant lines are listed; the rest are counted.
#[must_use]
pub fn format_expiration_summary(result: &ExpirationSweepResult, max_grants: usize) -> String {
    let mut summary = format!(
        "Expiration sweep - {} - {} grants, {} coins, {} users\n",
        result.sweep_date.format("%Y-%m-%d"),
        result.expired_grants.len(),
        result.total_expired,
        result.users_affected
    );

    for grant in result.expired_grants.iter().take(max_grants) {
        summary.push_str(&format!(
            "  {} - grant #{} | {} coins\n",
            grant.user_id, grant.coin_id, grant.amount
        ));
    }
    let hidden = result.expired_grants.len().saturating_sub(max_grants);
    if hidden > 0 {
        summary.push_str(&format!("  ...and {hidden} more grants\n"));
    }

    summary
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::balance::{get_balance, is_consistent};
    use crate::core::coin::get_coins_for_user;
    use crate::core::earning::{EarnRequest, earn_coins};
    use crate::core::redemption::{RedeemRequest, redeem_coins};
    use crate::core::transaction::get_transactions;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_is_expiration_sweep_needed_no_previous_sweep() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(is_expiration_sweep_needed(&db).await?);
        assert!(get_last_expiration_sweep_date(&db).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_sweep_records_date() -> Result<()> {
        let db = setup_test_db().await?;

        expire_coins(&db, Utc::now()).await?;
        assert!(!is_expiration_sweep_needed(&db).await?);
        assert_eq!(
            get_last_expiration_sweep_date(&db).await?,
            Some(Utc::now().date_naive())
        );

        // A second sweep updates the same row
        expire_coins(&db, Utc::now()).await?;
        let count = SystemState::find()
            .filter(system_state::Column::Key.eq(LAST_EXPIRATION_SWEEP_KEY))
            .count(&db)
            .await?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_expire_coins_moves_remaining_to_expired() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();

        earn_test_coins(&db, "u1", 300).await?;
        redeem_coins(&db, &system, RedeemRequest::new("u1", "discount_5")).await?;

        // Nothing expires before the expiry date
        let early = expire_coins(&db, Utc::now()).await?;
        assert!(early.expired_grants.is_empty());

        let later = Utc::now() + Duration::days(system.default_expiration_days + 1);
        let result = expire_coins(&db, later).await?;
        assert_eq!(result.expired_grants.len(), 1);
        assert_eq!(result.total_expired, 200);
        assert_eq!(result.users_affected, 1);

        let balance = get_balance(&db, "u1").await?;
        assert_eq!(balance.active_coins, 0);
        assert_eq!(balance.used_coins, 100);
        assert_eq!(balance.expired_coins, 200);
        assert_eq!(balance.total_coins, 300);
        assert!(is_consistent(&balance));

        let coins = get_coins_for_user(&db, "u1").await?;
        assert_eq!(coins[0].status, CoinStatus::Expired);
        assert_eq!(coins[0].remaining, 0);

        let latest = &get_transactions(&db, "u1", Some(1)).await?[0];
        assert_eq!(latest.transaction_type, TransactionType::Expired);
        assert_eq!(latest.amount, -200);
        assert_eq!(latest.balance_after, 0);

        // Expired grants are not swept twice
        assert!(expire_coins(&db, later).await?.expired_grants.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_expire_coins_counts_users() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();

        earn_test_coins(&db, "u1", 10).await?;
        earn_test_coins(&db, "u1", 20).await?;
        earn_coins(&db, &system, EarnRequest::new("u2", "daily_login")).await?;

        let later = Utc::now() + Duration::days(system.default_expiration_days + 1);
        let result = expire_coins(&db, later).await?;
        assert_eq!(result.expired_grants.len(), 3);
        assert_eq!(result.users_affected, 2);
        assert_eq!(result.total_expired, 40);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_expiring_coins() -> Result<()> {
        let db = setup_test_db().await?;
        let mut system = test_system();

        earn_test_coins(&db, "u1", 10).await?;
        assert!(get_expiring_coins(&db, &system, "u1").await?.is_empty());

        system.expiration_warning_days = system.default_expiration_days + 1;
        let expiring = get_expiring_coins(&db, &system, "u1").await?;
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].remaining, 10);
        Ok(())
    }

    #[test]
    fn test_format_expiration_summary() {
        let result = ExpirationSweepResult {
            expired_grants: vec![ExpiredGrant {
                coin_id: 7,
                user_id: "u1".to_string(),
                amount: 25,
            }],
            users_affected: 1,
            total_expired: 25,
            sweep_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        };

        let summary = format_expiration_summary(&result, 10);
        assert!(summary.starts_with("Expiration sweep - 2024-06-01 - 1 grants, 25 coins, 1 users"));
        assert!(summary.contains("u1 - grant #7 | 25 coins"));
        assert!(!summary.contains("more grants"));
    }

    #[test]
    fn test_format_expiration_summary_limits_grant_lines() {
        let expired_grants: Vec<ExpiredGrant> = (0..500)
            .map(|i| ExpiredGrant {
                coin_id: i,
                user_id: format!("user-{i}"),
                amount: 10,
            })
            .collect();
        let result = ExpirationSweepResult {
            users_affected: expired_grants.len(),
            total_expired: 5000,
            expired_grants,
            sweep_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        };

        let summary = format_expiration_summary(&result, 20);
        assert_eq!(summary.lines().filter(|l| l.contains("grant #")).count(), 20);
        assert!(summary.contains("...and 480 more grants"));
        assert!(summary.chars().count() < crate::core::report::MESSAGE_LIMIT);
    }

    #[tokio::test]
    async fn test_expire_due_coins_for_one_user() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();

        earn_test_coins(&db, "u1", 10).await?;
        earn_test_coins(&db, "u2", 20).await?;

        let later = Utc::now() + Duration::days(system.default_expiration_days + 1);
        let expired = expire_due_coins(&db, Some("u1"), later).await?;
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].user_id, "u1");

        assert_eq!(get_balance(&db, "u1").await?.expired_coins, 10);
        assert_eq!(get_balance(&db, "u2").await?.active_coins, 20);
        // A per-user expiry is not a sweep
        assert!(is_expiration_sweep_needed(&db).await?);
        Ok(())
    }
}

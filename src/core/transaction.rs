//! Append-only transaction log.
//!
//! Entries are only ever inserted. `balance_after` is derived from
//! `balance_before + amount` at insert time, never passed in by callers.

use crate::{
    entities::{CoinTransaction, CoinTransactionModel, TransactionType, coin_transaction},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};

/// Fields of a ledger entry supplied by the operation that causes it.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// User whose balance changed
    pub user_id: String,
    /// Kind of event
    pub transaction_type: TransactionType,
    /// Signed change to the spendable balance
    pub amount: i64,
    /// Spendable balance before the change
    pub balance_before: i64,
    /// Human-readable description
    pub description: String,
    /// Caller reference
    pub source_id: Option<String>,
    /// Rule that caused the event
    pub rule: Option<String>,
}

/// Appends an entry to the log.
pub async fn append_transaction<C>(
    db: &C,
    entry: NewTransaction,
    now: DateTime<Utc>,
) -> Result<CoinTransactionModel>
where
    C: ConnectionTrait,
{
    let active_model = coin_transaction::ActiveModel {
        user_id: Set(entry.user_id),
        transaction_type: Set(entry.transaction_type),
        amount: Set(entry.amount),
        balance_before: Set(entry.balance_before),
        balance_after: Set(entry.balance_before + entry.amount),
        description: Set(entry.description),
        source_id: Set(entry.source_id),
        rule: Set(entry.rule),
        created_at: Set(now),
        ..Default::default()
    };

    let saved = active_model.insert(db).await?;
    tracing::debug!(
        user_id = %saved.user_id,
        amount = saved.amount,
        "Appended {:?} transaction {}",
        saved.transaction_type,
        saved.id
    );
    Ok(saved)
}

/// Retrieves a user's transactions, newest first, optionally limited.
pub async fn get_transactions<C>(
    db: &C,
    user_id: &str,
    limit: Option<u64>,
) -> Result<Vec<CoinTransactionModel>>
where
    C: ConnectionTrait,
{
    let mut query = CoinTransaction::find()
        .filter(coin_transaction::Column::UserId.eq(user_id))
        .order_by_desc(coin_transaction::Column::CreatedAt)
        .order_by_desc(coin_transaction::Column::Id);
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    query.all(db).await.map_err(Into::into)
}

/// Retrieves a user's transactions in the order they were appended.
pub async fn get_transactions_chronological<C>(
    db: &C,
    user_id: &str,
) -> Result<Vec<CoinTransactionModel>>
where
    C: ConnectionTrait,
{
    CoinTransaction::find()
        .filter(coin_transaction::Column::UserId.eq(user_id))
        .order_by_asc(coin_transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a specific transaction by its id.
pub async fn get_transaction_by_id<C>(
    db: &C,
    transaction_id: i64,
) -> Result<Option<CoinTransactionModel>>
where
    C: ConnectionTrait,
{
    CoinTransaction::find_by_id(transaction_id)
        .one(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn entry(user_id: &str, amount: i64, balance_before: i64) -> NewTransaction {
        NewTransaction {
            user_id: user_id.to_string(),
            transaction_type: TransactionType::Earned,
            amount,
            balance_before,
            description: "Test transaction".to_string(),
            source_id: None,
            rule: Some("purchase".to_string()),
        }
    }

    #[tokio::test]
    async fn test_append_transaction_derives_balance_after() -> Result<()> {
        let db = setup_test_db().await?;

        let saved = append_transaction(&db, entry("u1", -15, 40), Utc::now()).await?;
        assert_eq!(saved.balance_before, 40);
        assert_eq!(saved.balance_after, 25);

        let found = get_transaction_by_id(&db, saved.id).await?.unwrap();
        assert_eq!(found, saved);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_transactions_newest_first_and_limited() -> Result<()> {
        let db = setup_test_db().await?;

        let first = append_transaction(&db, entry("u1", 10, 0), Utc::now()).await?;
        let second = append_transaction(&db, entry("u1", 20, 10), Utc::now()).await?;
        let third = append_transaction(&db, entry("u1", 30, 30), Utc::now()).await?;
        append_transaction(&db, entry("u2", 99, 0), Utc::now()).await?;

        let all = get_transactions(&db, "u1", None).await?;
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], third);
        assert_eq!(all[2], first);

        let limited = get_transactions(&db, "u1", Some(2)).await?;
        assert_eq!(limited, vec![third, second]);

        let chronological = get_transactions_chronological(&db, "u1").await?;
        assert_eq!(chronological[0], first);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_transaction_by_id_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(get_transaction_by_id(&db, 999).await?.is_none());
        Ok(())
    }
}

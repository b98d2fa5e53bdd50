//! Leaderboard ranking by lifetime coins.

use crate::{
    config::coins::SystemConfig,
    core::balance::get_all_balances,
    entities::{CoinBalanceModel, CoinTransaction, TransactionType, coin_transaction},
    errors::Result,
};
use chrono::{Duration, Utc};
use sea_orm::prelude::*;
use std::collections::HashMap;

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// Position, starting at 1
    pub rank: usize,
    /// Ranked user
    pub user_id: String,
    /// Lifetime coins granted
    pub total_coins: i64,
    /// Spendable coins
    pub active_coins: i64,
    /// Coins earned within the trailing window
    pub recent_earned: i64,
}

/// Ranks users by `total_coins`, highest first.
///
/// `limit` defaults to `leaderboard_default_limit`. `recent_earned` sums
/// `earned` and `bonus` entries over the trailing `leaderboard_window_days`.
pub async fn get_leaderboard<C>(
    db: &C,
    system: &SystemConfig,
    limit: Option<u64>,
) -> Result<Vec<LeaderboardEntry>>
where
    C: ConnectionTrait,
{
    let balances = get_all_balances(db).await?;
    let since = Utc::now() - Duration::days(system.leaderboard_window_days);

    let recent = CoinTransaction::find()
        .filter(coin_transaction::Column::CreatedAt.gte(since))
        .filter(
            coin_transaction::Column::TransactionType
                .is_in([TransactionType::Earned, TransactionType::Bonus]),
        )
        .all(db)
        .await?;

    let mut recent_earned: HashMap<String, i64> = HashMap::new();
    for tx in recent {
        *recent_earned.entry(tx.user_id).or_default() += tx.amount;
    }

    let limit = usize::try_from(limit.unwrap_or(system.leaderboard_default_limit))?;
    Ok(rank_balances(balances, &recent_earned, limit))
}

/// Sorts balances by `total_coins` descending and assigns ranks `1..=limit`.
///
/// The sort is stable, so ties keep the order of `balances`.
#[must_use]
pub fn rank_balances(
    mut balances: Vec<CoinBalanceModel>,
    recent_earned: &HashMap<String, i64>,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    balances.sort_by(|a, b| b.total_coins.cmp(&a.total_coins));
    balances
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, balance)| LeaderboardEntry {
            rank: index + 1,
            recent_earned: recent_earned.get(&balance.user_id).copied().unwrap_or(0),
            user_id: balance.user_id,
            total_coins: balance.total_coins,
            active_coins: balance.active_coins,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::earning::{EarnRequest, earn_coins};
    use crate::test_utils::*;

    fn balance(user_id: &str, total: i64) -> CoinBalanceModel {
        let mut balance = CoinBalanceModel::empty(user_id, Utc::now());
        balance.total_coins = total;
        balance.active_coins = total;
        balance
    }

    #[test]
    fn test_rank_balances_order_and_ranks() {
        let balances = vec![balance("a", 10), balance("b", 30), balance("c", 20)];
        let entries = rank_balances(balances, &HashMap::new(), 10);

        let users: Vec<&str> = entries.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(users, vec!["b", "c", "a"]);
        let ranks: Vec<usize> = entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_rank_balances_ties_keep_input_order() {
        let balances = vec![balance("a", 10), balance("b", 10), balance("c", 10)];
        let entries = rank_balances(balances, &HashMap::new(), 10);
        let users: Vec<&str> = entries.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(users, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_rank_balances_limit() {
        let balances = vec![balance("a", 1), balance("b", 2), balance("c", 3)];
        let entries = rank_balances(balances, &HashMap::new(), 2);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].rank, 2);

        assert!(rank_balances(vec![balance("a", 1)], &HashMap::new(), 0).is_empty());
    }

    #[tokio::test]
    async fn test_get_leaderboard_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let system = test_system();

        earn_test_coins(&db, "alice", 300).await?;
        earn_test_coins(&db, "bob", 500).await?;
        earn_test_coins(&db, "carol", 100).await?;
        earn_coins(&db, &system, EarnRequest::new("carol", "daily_login")).await?;

        let board = get_leaderboard(&db, &system, Some(2)).await?;
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].user_id, "bob");
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].recent_earned, 500);
        assert_eq!(board[1].user_id, "alice");
        assert_eq!(board[1].rank, 2);

        let full = get_leaderboard(&db, &system, None).await?;
        assert_eq!(full.len(), 3);
        assert_eq!(full[2].user_id, "carol");
        assert_eq!(full[2].recent_earned, 110);
        assert!(full.windows(2).all(|w| w[0].total_coins >= w[1].total_coins));

        // Unchanged state gives the same board
        assert_eq!(get_leaderboard(&db, &system, None).await?, full);
        Ok(())
    }
}

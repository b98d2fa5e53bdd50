//! Per-user statistics computed from the transaction log.
//!
//! Nothing here is cached; every call re-reads the user's ledger.

use crate::{
    core::{balance::get_balance, transaction::get_transactions_chronological},
    entities::{CoinTransactionModel, TransactionType},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::ConnectionTrait;
use std::collections::BTreeMap;

/// Aggregate view of one user's ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct CoinStats {
    /// User the stats describe
    pub user_id: String,
    /// Coins earned, including bonuses and positive adjustments
    pub total_earned: i64,
    /// Coins spent on redemptions
    pub total_redeemed: i64,
    /// Coins returned by refunds
    pub total_refunded: i64,
    /// Coins lost to expiry
    pub total_expired: i64,
    /// Spendable coins now
    pub current_balance: i64,
    /// Earned coins per day since the first transaction
    pub average_earned_per_day: f64,
    /// Earning rule with the most `earned` entries
    pub favorite_earning_rule: Option<String>,
    /// Number of ledger entries
    pub transaction_count: usize,
    /// Number of redemptions made
    pub redemption_count: usize,
    /// Time of the first ledger entry
    pub first_transaction_at: Option<DateTime<Utc>>,
    /// Time of the latest ledger entry
    pub last_transaction_at: Option<DateTime<Utc>>,
}

/// Computes a user's statistics.
pub async fn get_stats<C>(db: &C, user_id: &str) -> Result<CoinStats>
where
    C: ConnectionTrait,
{
    let transactions = get_transactions_chronological(db, user_id).await?;
    let balance = get_balance(db, user_id).await?;
    Ok(compute_stats(
        user_id,
        &transactions,
        balance.active_coins,
        Utc::now(),
    ))
}

/// Builds [`CoinStats`] from a chronological slice of ledger entries.
///
/// The average divides by whole days elapsed since the first entry, never
/// fewer than one. The favourite rule breaks ties alphabetically.
#[must_use]
pub fn compute_stats(
    user_id: &str,
    transactions: &[CoinTransactionModel],
    current_balance: i64,
    now: DateTime<Utc>,
) -> CoinStats {
    let mut total_earned = 0;
    let mut total_redeemed = 0;
    let mut total_refunded = 0;
    let mut total_expired = 0;
    let mut redemption_count = 0;
    let mut rule_counts: BTreeMap<&str, usize> = BTreeMap::new();

    for tx in transactions {
        match tx.transaction_type {
            TransactionType::Earned => {
                total_earned += tx.amount;
                if let Some(rule) = tx.rule.as_deref() {
                    *rule_counts.entry(rule).or_default() += 1;
                }
            }
            TransactionType::Bonus => total_earned += tx.amount,
            TransactionType::Adjustment if tx.amount > 0 => total_earned += tx.amount,
            TransactionType::Adjustment => {}
            TransactionType::Redeemed => {
                total_redeemed += -tx.amount;
                redemption_count += 1;
            }
            TransactionType::Refunded => total_refunded += tx.amount,
            TransactionType::Expired => total_expired += -tx.amount,
        }
    }

    let mut favorite_earning_rule: Option<(&str, usize)> = None;
    for (rule, count) in rule_counts {
        if favorite_earning_rule.is_none_or(|(_, best)| count > best) {
            favorite_earning_rule = Some((rule, count));
        }
    }

    let first_transaction_at = transactions.first().map(|tx| tx.created_at);
    let last_transaction_at = transactions.last().map(|tx| tx.created_at);
    let days = first_transaction_at.map_or(1, |first| (now - first).num_days().max(1));

    #[allow(clippy::cast_precision_loss)]
    let average_earned_per_day = total_earned as f64 / days as f64;

    CoinStats {
        user_id: user_id.to_string(),
        total_earned,
        total_redeemed,
        total_refunded,
        total_expired,
        current_balance,
        average_earned_per_day,
        favorite_earning_rule: favorite_earning_rule.map(|(rule, _)| rule.to_string()),
        transaction_count: transactions.len(),
        redemption_count,
        first_transaction_at,
        last_transaction_at,
    }
}

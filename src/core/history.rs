//! Earning and redemption history grouped by rule.

use crate::{
    core::{coin::get_coins_for_user, redemption::get_redemptions_for_user},
    entities::{CoinModel, CoinRedemptionModel, RedemptionStatus},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::ConnectionTrait;
use std::collections::BTreeMap;

/// Grants from one source.
#[derive(Debug, Clone, PartialEq)]
pub struct EarningHistoryEntry {
    /// Earning rule identifier or origin tag
    pub source: String,
    /// Number of grants
    pub count: usize,
    /// Coins granted
    pub total_amount: i64,
    /// Coins per grant
    pub average_amount: f64,
    /// Most recent grant
    pub last_earned_at: DateTime<Utc>,
}

/// Redemptions of one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RedemptionHistoryEntry {
    /// Redemption rule identifier
    pub rule_id: String,
    /// Rule name from the most recent snapshot
    pub rule_name: String,
    /// Number of redemptions
    pub count: usize,
    /// Coins spent
    pub total_coins: i64,
    /// Discount value granted
    pub total_discount: f64,
    /// Coins per redemption
    pub average_coins: f64,
    /// Most recent redemption
    pub last_redeemed_at: DateTime<Utc>,
}

/// Groups a user's grants by source, largest total first.
pub async fn get_earning_history<C>(db: &C, user_id: &str) -> Result<Vec<EarningHistoryEntry>>
where
    C: ConnectionTrait,
{
    let coins = get_coins_for_user(db, user_id).await?;
    Ok(group_earnings(&coins))
}

/// Groups a user's non-cancelled redemptions by rule, most coins first.
pub async fn get_redemption_history<C>(
    db: &C,
    user_id: &str,
) -> Result<Vec<RedemptionHistoryEntry>>
where
    C: ConnectionTrait,
{
    let redemptions = get_redemptions_for_user(db, user_id).await?;
    Ok(group_redemptions(&redemptions))
}

/// Aggregates grants per source.
#[must_use]
pub fn group_earnings(coins: &[CoinModel]) -> Vec<EarningHistoryEntry> {
    let mut groups: BTreeMap<&str, EarningHistoryEntry> = BTreeMap::new();

    for coin in coins {
        let entry = groups
            .entry(coin.source.as_str())
            .or_insert_with(|| EarningHistoryEntry {
                source: coin.source.clone(),
                count: 0,
                total_amount: 0,
                average_amount: 0.0,
                last_earned_at: coin.earned_at,
            });
        entry.count += 1;
        entry.total_amount += coin.amount;
        entry.last_earned_at = entry.last_earned_at.max(coin.earned_at);
    }

    let mut entries: Vec<EarningHistoryEntry> = groups
        .into_values()
        .map(|mut entry| {
            entry.average_amount = average(entry.total_amount, entry.count);
            entry
        })
        .collect();
    // Stable sort over the alphabetical BTreeMap order
    entries.sort_by(|a, b| b.total_amount.cmp(&a.total_amount));
    entries
}

/// Aggregates non-cancelled redemptions per rule.
#[must_use]
pub fn group_redemptions(redemptions: &[CoinRedemptionModel]) -> Vec<RedemptionHistoryEntry> {
    let mut groups: BTreeMap<&str, RedemptionHistoryEntry> = BTreeMap::new();

    for redemption in redemptions
        .iter()
        .filter(|r| r.status != RedemptionStatus::Cancelled)
    {
        let snapshot_name = redemption
            .rule_snapshot
            .get("name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(&redemption.rule_id);

        let entry = groups
            .entry(redemption.rule_id.as_str())
            .or_insert_with(|| RedemptionHistoryEntry {
                rule_id: redemption.rule_id.clone(),
                rule_name: snapshot_name.to_string(),
                count: 0,
                total_coins: 0,
                total_discount: 0.0,
                average_coins: 0.0,
                last_redeemed_at: redemption.created_at,
            });
        entry.count += 1;
        entry.total_coins += redemption.coin_cost;
        entry.total_discount += redemption.discount_amount;
        if redemption.created_at >= entry.last_redeemed_at {
            entry.last_redeemed_at = redemption.created_at;
            entry.rule_name = snapshot_name.to_string();
        }
    }

    let mut entries: Vec<RedemptionHistoryEntry> = groups
        .into_values()
        .map(|mut entry| {
            entry.average_coins = average(entry.total_coins, entry.count);
            entry
        })
        .collect();
    entries.sort_by(|a, b| b.total_coins.cmp(&a.total_coins));
    entries
}

#[allow(clippy::cast_precision_loss)]
fn average(total: i64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    total as f64 / count as f64
}

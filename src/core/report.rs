//! Report formatting.
//!
//! Turns ledger data into plain text for the bot layer. All functions are
//! pure and framework-agnostic.

use crate::{
    core::{
        history::{EarningHistoryEntry, RedemptionHistoryEntry},
        leaderboard::LeaderboardEntry,
        stats::CoinStats,
    },
    entities::{CoinBalanceModel, CoinTransactionModel, TransactionType},
};

/// Formats a signed coin amount, e.g. `+10 Coins` or `-100 Coins`.
#[must_use]
pub fn format_coin_amount(amount: i64, currency: &str) -> String {
    if amount >= 0 {
        format!("+{amount} {currency}")
    } else {
        format!("-{} {currency}", amount.unsigned_abs())
    }
}

/// Lower-case label of a transaction type.
#[must_use]
pub const fn transaction_type_label(transaction_type: TransactionType) -> &'static str {
    match transaction_type {
        TransactionType::Earned => "earned",
        TransactionType::Redeemed => "redeemed",
        TransactionType::Expired => "expired",
        TransactionType::Refunded => "refunded",
        TransactionType::Bonus => "bonus",
        TransactionType::Adjustment => "adjustment",
    }
}

/// One-line summary of a ledger entry.
#[must_use]
pub fn format_transaction_summary(transaction: &CoinTransactionModel, currency: &str) -> String {
    format!(
        "{} | {} | {} (balance {})",
        format_coin_amount(transaction.amount, currency),
        transaction_type_label(transaction.transaction_type),
        transaction.description,
        transaction.balance_after
    )
}

/// Multi-line balance breakdown.
#[must_use]
pub fn format_balance(balance: &CoinBalanceModel, currency: &str) -> String {
    format!(
        "**{} {currency}** available\nLifetime: {} | Used: {} | Expired: {}",
        balance.active_coins, balance.total_coins, balance.used_coins, balance.expired_coins
    )
}

/// Discord's limit for an embed field value.
pub const EMBED_FIELD_LIMIT: usize = 1024;
/// Discord's limit for a plain message.
pub const MESSAGE_LIMIT: usize = 2000;

/// Joins lines with newlines, keeping as many as fit in `max_chars`.
///
/// Dropped lines are replaced by a final `...and N more` line, which is
/// itself counted against the limit.
#[must_use]
pub fn fit_lines(lines: &[String], max_chars: usize) -> String {
    let mut out = String::new();
    for (index, line) in lines.iter().enumerate() {
        let left = lines.len() - index - 1;
        let reserve = if left > 0 {
            format!("...and {left} more").chars().count() + 1
        } else {
            0
        };
        let needed = out.chars().count() + line.chars().count() + 1;
        if needed + reserve > max_chars {
            out.push_str(&format!("...and {} more", lines.len() - index));
            return out;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Leaderboard as numbered lines.
#[must_use]
pub fn format_leaderboard(entries: &[LeaderboardEntry], currency: &str) -> String {
    if entries.is_empty() {
        return "No one has earned any coins yet.".to_string();
    }

    entries
        .iter()
        .map(|entry| {
            format!(
                "{}. <@{}> - {} {currency} ({} this period)\n",
                entry.rank,
                entry.user_id,
                entry.total_coins,
                format_coin_amount(entry.recent_earned, currency)
            )
        })
        .collect()
}

/// Multi-line stats summary.
#[must_use]
pub fn format_stats(stats: &CoinStats, currency: &str) -> String {
    format!(
        "Balance: {} {currency}\n\
         Earned: {} | Redeemed: {} | Refunded: {} | Expired: {}\n\
         Average per day: {:.1}\n\
         Favourite way to earn: {}\n\
         Transactions: {} | Redemptions: {}",
        stats.current_balance,
        stats.total_earned,
        stats.total_redeemed,
        stats.total_refunded,
        stats.total_expired,
        stats.average_earned_per_day,
        stats.favorite_earning_rule.as_deref().unwrap_or("none yet"),
        stats.transaction_count,
        stats.redemption_count
    )
}

/// Earning history as one line per source.
#[must_use]
pub fn earning_history_lines(entries: &[EarningHistoryEntry], currency: &str) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{} - {}x, {} {currency} (avg {:.1}, last {})",
                entry.source,
                entry.count,
                entry.total_amount,
                entry.average_amount,
                entry.last_earned_at.format("%Y-%m-%d")
            )
        })
        .collect()
}

/// Earning history as text.
#[must_use]
pub fn format_earning_history(entries: &[EarningHistoryEntry], currency: &str) -> String {
    earning_history_lines(entries, currency)
        .into_iter()
        .map(|line| line + "\n")
        .collect()
}

/// Redemption history as one line per rule.
#[must_use]
pub fn redemption_history_lines(entries: &[RedemptionHistoryEntry], currency: &str) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{} - {}x, {} {currency}, saved ${:.2} (last {})",
                entry.rule_name,
                entry.count,
                entry.total_coins,
                entry.total_discount,
                entry.last_redeemed_at.format("%Y-%m-%d")
            )
        })
        .collect()
}

/// Redemption history as text.
#[must_use]
pub fn format_redemption_history(entries: &[RedemptionHistoryEntry], currency: &str) -> String {
    redemption_history_lines(entries, currency)
        .into_iter()
        .map(|line| line + "\n")
        .collect()
}

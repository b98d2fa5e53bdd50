//! Coin Discord commands - balance, earning, statistics, history, and rankings.
//!
//! Each command calls into the core ledger functions and formats the result
//! with the helpers in [`crate::core::report`].

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::autocomplete},
        core::{badges, balance, earning, expiration, history, leaderboard, report, stats, transaction},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;

    const COLOR: u32 = 0x00F1_C40F;
    const MAX_HISTORY: u64 = 25;
    const MAX_LEADERBOARD: u64 = 25;
    const EMBED_DESCRIPTION_LIMIT: usize = 4096;

    /// Shows a user's available and lifetime coins.
    #[poise::command(slash_command, prefix_command)]
    pub async fn balance(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User to look up (defaults to you)"] user: Option<serenity::User>,
    ) -> Result<()> {
        let data = ctx.data();
        let target = user.as_ref().unwrap_or_else(|| ctx.author());
        let user_id = target.id.to_string();

        let balance = balance::get_balance(&data.database, &user_id).await?;
        let expiring = expiration::get_expiring_coins(&data.database, &data.config.system, &user_id).await?;

        let mut description = report::format_balance(&balance, data.currency());
        if !expiring.is_empty() {
            let soon: i64 = expiring.iter().map(|c| c.remaining).sum();
            description.push_str(&format!(
                "\n⏳ {soon} {} expire within {} days",
                data.currency(),
                data.config.system.expiration_warning_days
            ));
        }

        let embed = serenity::CreateEmbed::default()
            .title(format!("{}'s {}", target.name, data.currency()))
            .color(COLOR)
            .description(description);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Grants coins to a user under an earning rule, then checks their badges.
    #[poise::command(slash_command, prefix_command, default_member_permissions = "MANAGE_GUILD")]
    pub async fn earn(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User who earned the coins"] user: serenity::User,
        #[description = "Earning rule"]
        #[autocomplete = "autocomplete::autocomplete_earning_rule"]
        rule: String,
        #[description = "Override the rule's amount"] amount: Option<i64>,
        #[description = "Reference such as an order or review id"] source_id: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let user_id = user.id.to_string();

        let mut request = earning::EarnRequest::new(&user_id, &rule);
        if let Some(amount) = amount {
            request = request.with_amount(amount);
        }
        if let Some(source_id) = source_id {
            request = request.with_source_id(source_id);
        }

        let outcome = earning::earn_coins(&data.database, &data.config.system, request).await?;
        let unlocked = badges::check_badges(&data.database, &data.config.system, &user_id).await?;

        let mut message = format!(
            "✅ <@{user_id}> earned {} for `{rule}` (balance {})",
            report::format_coin_amount(outcome.coin.amount, data.currency()),
            outcome.balance.active_coins
        );
        for badge in unlocked {
            message.push_str(&format!("\n🏅 Unlocked **{}**", badge.name));
            if badge.reward_coins > 0 {
                message.push_str(&format!(
                    " ({})",
                    report::format_coin_amount(badge.reward_coins, data.currency())
                ));
            }
        }
        ctx.say(message).await?;
        Ok(())
    }

    /// Applies a manual signed correction to a user's coins.
    #[poise::command(slash_command, prefix_command, default_member_permissions = "MANAGE_GUILD")]
    pub async fn adjust(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User to adjust"] user: serenity::User,
        #[description = "Coins to add (positive) or remove (negative)"] amount: i64,
        #[description = "Reason for the adjustment"] reason: String,
    ) -> Result<()> {
        let data = ctx.data();
        let user_id = user.id.to_string();
        let entry =
            earning::adjust_balance(&data.database, &data.config.system, &user_id, amount, &reason)
                .await?;
        ctx.say(format!(
            "✅ Adjusted <@{user_id}>: {}",
            report::format_transaction_summary(&entry, data.currency())
        ))
        .await?;
        Ok(())
    }

    /// Shows earning and redemption statistics for a user.
    #[poise::command(slash_command, prefix_command)]
    pub async fn stats(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User to look up (defaults to you)"] user: Option<serenity::User>,
    ) -> Result<()> {
        let data = ctx.data();
        let target = user.as_ref().unwrap_or_else(|| ctx.author());
        let stats = stats::get_stats(&data.database, &target.id.to_string()).await?;

        let embed = serenity::CreateEmbed::default()
            .title(format!("📈 Stats for {}", target.name))
            .color(COLOR)
            .description(report::format_stats(&stats, data.currency()));
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows recent transactions plus earning and redemption breakdowns.
    #[poise::command(slash_command, prefix_command)]
    pub async fn history(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User to look up (defaults to you)"] user: Option<serenity::User>,
        #[description = "Number of transactions to show (max 25)"] limit: Option<u64>,
    ) -> Result<()> {
        let data = ctx.data();
        let db = &data.database;
        let currency = data.currency();
        let target = user.as_ref().unwrap_or_else(|| ctx.author());
        let user_id = target.id.to_string();
        let limit = limit.unwrap_or(10).clamp(1, MAX_HISTORY);

        let transactions = transaction::get_transactions(db, &user_id, Some(limit)).await?;
        if transactions.is_empty() {
            ctx.say(format!("{} has no {currency} activity yet.", target.name))
                .await?;
            return Ok(());
        }

        let recent: Vec<String> = transactions
            .iter()
            .map(|t| report::format_transaction_summary(t, currency))
            .collect();
        let earnings = history::get_earning_history(db, &user_id).await?;
        let redemptions = history::get_redemption_history(db, &user_id).await?;

        let mut embed = serenity::CreateEmbed::default()
            .title(format!("📜 History for {}", target.name))
            .color(COLOR)
            .field(
                "Recent",
                report::fit_lines(&recent, report::EMBED_FIELD_LIMIT),
                false,
            );
        if !earnings.is_empty() {
            embed = embed.field(
                "Earned by source",
                report::fit_lines(
                    &report::earning_history_lines(&earnings, currency),
                    report::EMBED_FIELD_LIMIT,
                ),
                false,
            );
        }
        if !redemptions.is_empty() {
            embed = embed.field(
                "Redeemed by offer",
                report::fit_lines(
                    &report::redemption_history_lines(&redemptions, currency),
                    report::EMBED_FIELD_LIMIT,
                ),
                false,
            );
        }
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Ranks users by lifetime coins.
    #[poise::command(slash_command, prefix_command)]
    pub async fn leaderboard(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Number of users to show"] limit: Option<u64>,
    ) -> Result<()> {
        let data = ctx.data();
        let limit = limit.map(|l| l.clamp(1, MAX_LEADERBOARD));
        let entries =
            leaderboard::get_leaderboard(&data.database, &data.config.system, limit).await?;

        let embed = serenity::CreateEmbed::default()
            .title("🏆 Leaderboard")
            .color(COLOR)
            .description(report::format_leaderboard(&entries, data.currency()))
            .footer(serenity::CreateEmbedFooter::new(format!(
                "Recent earnings over the last {} days",
                data.config.system.leaderboard_window_days
            )));
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows the badges a user has unlocked.
    #[poise::command(slash_command, prefix_command)]
    pub async fn badges(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User to look up (defaults to you)"] user: Option<serenity::User>,
    ) -> Result<()> {
        let data = ctx.data();
        let target = user.as_ref().unwrap_or_else(|| ctx.author());
        let unlocked = badges::get_user_badges(&data.database, &target.id.to_string()).await?;

        if unlocked.is_empty() {
            ctx.say(format!("{} has not unlocked any badges yet.", target.name))
                .await?;
            return Ok(());
        }

        let lines: Vec<String> = unlocked
            .iter()
            .map(|entry| {
                format!(
                    "🏅 **{}** - {} ({})",
                    entry.badge.name,
                    entry.badge.description,
                    entry.unlocked_at.format("%Y-%m-%d")
                )
            })
            .collect();
        let description = report::fit_lines(&lines, EMBED_DESCRIPTION_LIMIT);
        let embed = serenity::CreateEmbed::default()
            .title(format!("Badges for {}", target.name))
            .color(COLOR)
            .description(description);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

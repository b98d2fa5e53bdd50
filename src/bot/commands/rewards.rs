//! Reward Discord commands - rule catalogue, redemption, refunds, and the expiration sweep.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::autocomplete},
        core::{expiration, redemption, report, rules},
        entities::RewardType,
        errors::{Error, Result},
    };
    use chrono::Utc;
    use poise::serenity_prelude as serenity;
    use tracing::info;

    const COLOR: u32 = 0x0058_65F2;
    /// Keeps the `/expire` reply under Discord's message limit.
    const MAX_LISTED_GRANTS: usize = 20;

    fn describe_reward(reward_type: RewardType, value: f64) -> String {
        match reward_type {
            RewardType::PercentageDiscount => format!("{value}% off"),
            RewardType::FixedDiscount => format!("${value:.2} off"),
            RewardType::FreeShipping => format!("free shipping (${value:.2})"),
            RewardType::FreeProduct => "free product".to_string(),
            RewardType::ExclusiveAccess => "exclusive access".to_string(),
        }
    }

    /// Lists earning rules and redemption offers.
    #[poise::command(slash_command, prefix_command)]
    pub async fn rules(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let db = &data.database;
        let currency = data.currency();

        let earning_rules = rules::get_earning_rules(db).await?;
        let redemption_rules = rules::get_redemption_rules(db).await?;

        let earn_lines: Vec<String> = earning_rules
            .iter()
            .map(|rule| {
                let mut line = format!("`{}` {} - {} {currency}", rule.rule, rule.name, rule.amount);
                if let Some(cap) = rule.max_coins_per_day {
                    line.push_str(&format!(" (max {cap}/day)"));
                }
                if let Some(cap) = rule.max_coins_per_user {
                    line.push_str(&format!(" (max {cap} total)"));
                }
                line
            })
            .collect();

        let redeem_lines: Vec<String> = redemption_rules
            .iter()
            .map(|rule| {
                format!(
                    "`{}` {} - {} {currency} for {}",
                    rule.id,
                    rule.name,
                    rule.coin_cost,
                    describe_reward(rule.reward_type, rule.reward_value)
                )
            })
            .collect();

        let mut embed = serenity::CreateEmbed::default()
            .title(format!("{currency} Rules"))
            .color(COLOR);
        if !earn_lines.is_empty() {
            embed = embed.field(
                "Ways to earn",
                report::fit_lines(&earn_lines, report::EMBED_FIELD_LIMIT),
                false,
            );
        }
        if !redeem_lines.is_empty() {
            embed = embed.field(
                "Rewards",
                report::fit_lines(&redeem_lines, report::EMBED_FIELD_LIMIT),
                false,
            );
        }
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Spends coins on a redemption offer.
    #[poise::command(slash_command, prefix_command)]
    pub async fn redeem(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Reward to redeem"]
        #[autocomplete = "autocomplete::autocomplete_redemption_rule"]
        offer: String,
        #[description = "Order to apply the reward to"] order_id: Option<String>,
        #[description = "Order total, used for percentage discounts"] order_amount: Option<f64>,
    ) -> Result<()> {
        let data = ctx.data();
        let user_id = ctx.author().id.to_string();

        let mut request = redemption::RedeemRequest::new(&user_id, &offer);
        request.order_id = order_id;
        request.order_amount = order_amount;

        let outcome =
            redemption::redeem_coins(&data.database, &data.config.system, request).await?;

        let mut message = format!(
            "✅ Redeemed `{offer}` for {} {} (redemption #{})",
            outcome.redemption.coin_cost,
            data.currency(),
            outcome.redemption.id
        );
        if outcome.redemption.discount_amount > 0.0 {
            message.push_str(&format!("\nDiscount: ${:.2}", outcome.redemption.discount_amount));
        }
        if let Some(expires_at) = outcome.redemption.expires_at {
            message.push_str(&format!("\nValid until {}", expires_at.format("%Y-%m-%d")));
        }
        message.push_str(&format!(
            "\nRemaining balance: {} {}",
            outcome.balance.active_coins,
            data.currency()
        ));
        ctx.say(message).await?;
        Ok(())
    }

    /// Cancels an active redemption and returns its coins.
    #[poise::command(slash_command, prefix_command)]
    pub async fn refund(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Redemption number"] redemption_id: i64,
    ) -> Result<()> {
        let data = ctx.data();
        let author_id = ctx.author().id.to_string();

        let Some(existing) =
            redemption::get_redemption_by_id(&data.database, redemption_id).await?
        else {
            return Err(Error::RedemptionNotFound { id: redemption_id });
        };
        if existing.user_id != author_id {
            ctx.say("❌ You can only refund your own redemptions.").await?;
            return Ok(());
        }

        let outcome =
            redemption::refund_redemption(&data.database, &data.config.system, redemption_id)
                .await?;
        ctx.say(format!(
            "↩️ Refunded redemption #{redemption_id}: {} (balance {})",
            report::format_coin_amount(outcome.grant.coin.amount, data.currency()),
            outcome.grant.balance.active_coins
        ))
        .await?;
        Ok(())
    }

    /// Expires every grant that is past its expiry date.
    #[poise::command(slash_command, prefix_command, default_member_permissions = "MANAGE_GUILD")]
    pub async fn expire(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let db = &ctx.data().database;

        ctx.defer().await?;
        let result = expiration::expire_coins(db, Utc::now()).await?;
        info!(
            grants = result.expired_grants.len(),
            coins = result.total_expired,
            "Manual expiration sweep"
        );

        ctx.say(format!(
            "```\n{}```",
            expiration::format_expiration_summary(&result, MAX_LISTED_GRANTS)
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

//! General Discord commands - ping, help, and other utility commands.
//! These commands don't touch the ledger.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let currency = ctx.data().currency();
        let help_text = format!(
            "**CoinBuddy Help**\n\
        Earn {currency} for what you do, spend them on rewards.\n\n\
        **Your Coins**\n\
        • `/balance [user]` - Shows available and lifetime {currency}.\n\
        • `/stats [user]` - Shows earning and redemption statistics.\n\
        • `/history [user] [limit]` - Shows recent transactions and earning sources.\n\
        • `/badges [user]` - Shows unlocked badges.\n\
        • `/leaderboard [limit]` - Ranks users by lifetime {currency}.\n\n\
        **Rewards**\n\
        • `/rules` - Lists earning rules and redemption offers.\n\
        • `/redeem <offer> [order_id] [order_amount]` - Spends {currency} on an offer.\n\
        • `/refund <redemption_id>` - Cancels a redemption and returns its {currency}.\n\n\
        **Admin Commands**\n\
        • `/earn <user> <rule> [amount] [source_id]` - Grants {currency} under an earning rule.\n\
        • `/adjust <user> <amount> <reason>` - Applies a manual correction.\n\
        • `/expire` - Runs the expiration sweep now.\n\n\
        **Utility Commands**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message."
        );

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

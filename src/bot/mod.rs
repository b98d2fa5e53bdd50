//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for the `CoinBuddy` ledger,
//! including all slash commands, autocomplete handlers, and bot context management.

/// Discord command implementations (coins, rewards, general)
pub mod commands;
/// Discord interaction handlers (autocomplete, etc.)
pub mod handlers;

use crate::{
    config::coins::CoinConfig,
    core::expiration,
    errors::{Error, Result},
};
use chrono::Utc;
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};
use tracing::{error, info};

/// How often the background task checks whether today's sweep has run.
const EXPIRATION_CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Shared data available to all bot commands.
/// This structure holds the database connection and the ledger configuration
/// that commands need to access.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Loaded ledger configuration (system settings, seed rules)
    pub config: Arc<CoinConfig>,
}

impl BotData {
    /// Creates a new `BotData` instance with the given database connection and config.
    #[must_use]
    pub const fn new(database: DatabaseConnection, config: Arc<CoinConfig>) -> Self {
        Self { database, config }
    }

    /// Display name of the coin currency.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.config.system.currency_name
    }
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error:?}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {error:?}", ctx.command().name);
            if let Err(e) = ctx.say(format!("❌ {error}")).await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Runs the expiration sweep once per UTC day for as long as the bot is up.
async fn run_expiration_schedule(database: DatabaseConnection) {
    let mut interval = tokio::time::interval(EXPIRATION_CHECK_INTERVAL);
    loop {
        interval.tick().await;
        match expiration::is_expiration_sweep_needed(&database).await {
            Ok(true) => match expiration::expire_coins(&database, Utc::now()).await {
                Ok(result) => info!(
                    grants = result.expired_grants.len(),
                    coins = result.total_expired,
                    "Scheduled expiration sweep"
                ),
                Err(e) => error!("Scheduled expiration sweep failed: {e}"),
            },
            Ok(false) => {}
            Err(e) => error!("Failed to check expiration sweep state: {e}"),
        }
    }
}

/// Every slash command the bot registers.
#[must_use]
pub fn all_commands() -> Vec<poise::Command<BotData, Error>> {
    vec![
        commands::ping(),
        commands::help(),
        commands::balance(),
        commands::earn(),
        commands::stats(),
        commands::history(),
        commands::leaderboard(),
        commands::badges(),
        commands::rules(),
        commands::redeem(),
        commands::refund(),
        commands::adjust(),
        commands::expire(),
    ]
}

/// Builds the poise framework and runs the Discord client until it stops.
pub async fn run_bot(
    token: String,
    database: DatabaseConnection,
    config: Arc<CoinConfig>,
) -> Result<()> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: all_commands(),
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tokio::spawn(run_expiration_schedule(database.clone()));
                Ok(BotData::new(database, config))
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {e:?}"))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {e:?}"))?;
    Ok(())
}

pub use commands::*;
pub use handlers::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_commands_registered() {
        let names: Vec<String> = all_commands().into_iter().map(|c| c.name).collect();
        for expected in [
            "ping",
            "help",
            "balance",
            "earn",
            "stats",
            "history",
            "leaderboard",
            "badges",
            "rules",
            "redeem",
            "refund",
            "adjust",
            "expire",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing /{expected}");
        }
    }
}

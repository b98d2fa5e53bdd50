#![allow(clippy::result_large_err)]

use chrono::Utc;
use coin_buddy::{
    bot,
    config::{coins, database},
    core::{expiration, rules},
    errors::{Error, Result},
};
use dotenvy::dotenv;
use std::{env, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();

    // 3. Load ledger configuration (rules, badges, system settings)
    let config = coins::load_default_config()
        .inspect_err(|e| error!("Failed to load ledger configuration: {e}"))?;
    info!(
        earning_rules = config.earning_rules.len(),
        redemption_rules = config.redemption_rules.len(),
        "Loaded ledger configuration"
    );

    // 4. Connect and create tables
    if env::var("DATABASE_URL").is_err() {
        std::fs::create_dir_all("data")?;
    }
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db).await?;
    info!("Database initialized successfully.");

    // 5. Seed rules and badges missing from the database
    rules::seed_rules(&db, &config).await?;

    // 6. Catch up on coin expiry
    if expiration::is_expiration_sweep_needed(&db).await? {
        let result = expiration::expire_coins(&db, Utc::now()).await?;
        info!("{}", expiration::format_expiration_summary(&result, result.expired_grants.len()));
    }

    // 7. Run the bot
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;

    bot::run_bot(token, db, Arc::new(config)).await
}

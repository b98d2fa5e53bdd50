//! Database configuration module for the coin ledger.
//!
//! This module handles `SQLite` connection setup and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust models.
//! Parent tables (rules, badges) are created before the tables that reference them.

use crate::entities::{
    Coin, CoinBadge, CoinBalance, CoinRedemption, CoinTransaction, EarningRule, RedemptionRule,
    SystemState, UserCoinBadge,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/coin_buddy.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable or the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    tracing::debug!("Connecting to database at {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all ledger tables if they do not already exist.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut statements = vec![
        schema.create_table_from_entity(EarningRule),
        schema.create_table_from_entity(RedemptionRule),
        schema.create_table_from_entity(CoinBadge),
        schema.create_table_from_entity(Coin),
        schema.create_table_from_entity(CoinTransaction),
        schema.create_table_from_entity(CoinBalance),
        schema.create_table_from_entity(CoinRedemption),
        schema.create_table_from_entity(UserCoinBadge),
        schema.create_table_from_entity(SystemState),
    ];

    for statement in &mut statements {
        statement.if_not_exists();
        db.execute(builder.build(&*statement)).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{CoinBalanceModel, CoinModel, CoinTransactionModel, EarningRuleModel};
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<CoinModel> = Coin::find().limit(1).all(&db).await?;
        let _: Vec<CoinTransactionModel> = CoinTransaction::find().limit(1).all(&db).await?;
        let _: Vec<CoinBalanceModel> = CoinBalance::find().limit(1).all(&db).await?;
        let _: Vec<EarningRuleModel> = EarningRule::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_repeatable() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}

//! Coin transaction entity - The append-only ledger.
//!
//! `balance_before` and `balance_after` are the user's spendable coins around
//! the event, so `balance_after == balance_before + amount` for every row.

use super::enums::TransactionType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ledger entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coin_transactions")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User whose balance changed
    pub user_id: String,
    /// Kind of event
    pub transaction_type: TransactionType,
    /// Signed change to the spendable balance
    pub amount: i64,
    /// Spendable coins before the event
    pub balance_before: i64,
    /// Spendable coins after the event
    pub balance_after: i64,
    /// Human-readable description
    pub description: String,
    /// Caller reference (order id, review id, redemption id)
    pub source_id: Option<String>,
    /// Earning or redemption rule identifier that caused the event
    pub rule: Option<String>,
    /// When the entry was appended
    pub created_at: DateTimeUtc,
}

/// Ledger entries have no foreign keys
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Entity module - Contains all SeaORM entity definitions for the ledger.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod coin;
pub mod coin_badge;
pub mod coin_balance;
pub mod coin_redemption;
pub mod coin_transaction;
pub mod earning_rule;
pub mod enums;
pub mod redemption_rule;
pub mod system_state;
pub mod user_coin_badge;

// Re-export specific types to avoid conflicts
pub use coin::{Column as CoinColumn, Entity as Coin, Model as CoinModel};
pub use coin_badge::{Column as CoinBadgeColumn, Entity as CoinBadge, Model as CoinBadgeModel};
pub use coin_balance::{
    Column as CoinBalanceColumn, Entity as CoinBalance, Model as CoinBalanceModel,
};
pub use coin_redemption::{
    Column as CoinRedemptionColumn, Entity as CoinRedemption, Model as CoinRedemptionModel,
};
pub use coin_transaction::{
    Column as CoinTransactionColumn, Entity as CoinTransaction, Model as CoinTransactionModel,
};
pub use earning_rule::{
    Column as EarningRuleColumn, Entity as EarningRule, Model as EarningRuleModel,
};
pub use enums::{
    BadgeMetric, CoinStatus, Comparison, RedemptionStatus, RewardType, TransactionType,
};
pub use redemption_rule::{
    Column as RedemptionRuleColumn, Entity as RedemptionRule, Model as RedemptionRuleModel,
};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
pub use user_coin_badge::{
    Column as UserCoinBadgeColumn, Entity as UserCoinBadge, Model as UserCoinBadgeModel,
};

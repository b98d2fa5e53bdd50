//! Ledger configuration loading from config.toml
//!
//! The file carries the system settings plus the earning rules, redemption
//! rules and badges that are seeded into the database on startup. Every
//! section is optional; missing sections fall back to the built-in tables.

use crate::core::{badges::BADGE_SOURCE, earning::ADJUSTMENT_SOURCE, redemption::REFUND_SOURCE};
use crate::entities::{
    BadgeMetric, CoinBadgeModel, Comparison, EarningRuleModel, RedemptionRuleModel, RewardType,
};
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize)]
pub struct CoinConfig {
    /// System-wide ledger settings
    #[serde(default)]
    pub system: SystemConfig,
    /// Earning rules to seed
    #[serde(default = "default_earning_rules")]
    pub earning_rules: Vec<EarningRuleConfig>,
    /// Redemption rules to seed
    #[serde(default = "default_redemption_rules")]
    pub redemption_rules: Vec<RedemptionRuleConfig>,
    /// Badges to seed
    #[serde(default = "default_badges")]
    pub badges: Vec<BadgeConfig>,
}

impl Default for CoinConfig {
    fn default() -> Self {
        Self {
            system: SystemConfig::default(),
            earning_rules: default_earning_rules(),
            redemption_rules: default_redemption_rules(),
            badges: default_badges(),
        }
    }
}

/// System-wide ledger settings
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SystemConfig {
    /// Display name of the currency
    pub currency_name: String,
    /// Days until a coin grant expires
    pub default_expiration_days: i64,
    /// Grants expiring within this many days are reported as expiring soon
    pub expiration_warning_days: i64,
    /// Days until an unapplied redemption lapses
    pub redemption_expiration_days: i64,
    /// Largest amount a single earning request may grant
    pub max_coins_per_transaction: i64,
    /// Trailing window for the leaderboard's recent-earnings column
    pub leaderboard_window_days: i64,
    /// Leaderboard size when the caller does not ask for one
    pub leaderboard_default_limit: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            currency_name: "Coins".to_string(),
            default_expiration_days: 365,
            expiration_warning_days: 30,
            redemption_expiration_days: 30,
            max_coins_per_transaction: 10_000,
            leaderboard_window_days: 30,
            leaderboard_default_limit: 10,
        }
    }
}

/// Configuration for a single earning rule
#[derive(Debug, Clone, Deserialize)]
pub struct EarningRuleConfig {
    /// Rule identifier used by callers
    pub rule: String,
    /// Display name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Coins granted per occurrence
    pub amount: i64,
    /// Per-user cap per UTC day
    #[serde(default)]
    pub max_coins_per_day: Option<i64>,
    /// Per-user lifetime cap
    #[serde(default)]
    pub max_coins_per_user: Option<i64>,
    /// Display order, higher first
    #[serde(default)]
    pub priority: i32,
    /// Whether the rule accepts earning
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl EarningRuleConfig {
    /// Converts the configuration into a database model.
    #[must_use]
    pub fn to_model(&self) -> EarningRuleModel {
        EarningRuleModel {
            rule: self.rule.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            amount: self.amount,
            max_coins_per_day: self.max_coins_per_day,
            max_coins_per_user: self.max_coins_per_user,
            priority: self.priority,
            is_active: self.is_active,
        }
    }
}

/// Configuration for a single redemption rule
#[derive(Debug, Clone, Deserialize)]
pub struct RedemptionRuleConfig {
    /// Rule identifier used by callers
    pub id: String,
    /// Display name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Coins spent per redemption
    pub coin_cost: i64,
    /// What the user gets
    pub reward_type: RewardType,
    /// Percentage, currency amount or shipping cost
    #[serde(default)]
    pub reward_value: f64,
    /// Upper bound on a percentage discount
    #[serde(default)]
    pub max_discount: Option<f64>,
    /// Smallest order the offer applies to
    #[serde(default)]
    pub min_order_amount: Option<f64>,
    /// Total redemptions allowed
    #[serde(default)]
    pub max_uses: Option<i64>,
    /// Redemptions allowed per user
    #[serde(default)]
    pub max_uses_per_user: Option<i64>,
    /// Start of the validity window
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    /// End of the validity window
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    /// Whether the rule accepts redemption
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl RedemptionRuleConfig {
    /// Converts the configuration into a database model.
    #[must_use]
    pub fn to_model(&self) -> RedemptionRuleModel {
        RedemptionRuleModel {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            coin_cost: self.coin_cost,
            reward_type: self.reward_type,
            reward_value: self.reward_value,
            max_discount: self.max_discount,
            min_order_amount: self.min_order_amount,
            max_uses: self.max_uses,
            max_uses_per_user: self.max_uses_per_user,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            is_active: self.is_active,
        }
    }
}

/// Configuration for a single badge
#[derive(Debug, Clone, Deserialize)]
pub struct BadgeConfig {
    /// Badge identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Metric the condition reads
    pub metric: BadgeMetric,
    /// Comparison against the threshold
    #[serde(default = "default_comparison")]
    pub comparison: Comparison,
    /// Threshold value
    pub threshold: i64,
    /// Bonus coins credited on unlock
    #[serde(default)]
    pub reward_coins: i64,
    /// Whether the badge can be awarded
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl BadgeConfig {
    /// Converts the configuration into a database model.
    #[must_use]
    pub fn to_model(&self) -> CoinBadgeModel {
        CoinBadgeModel {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            metric: self.metric,
            comparison: self.comparison,
            threshold: self.threshold,
            reward_coins: self.reward_coins,
            is_active: self.is_active,
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_comparison() -> Comparison {
    Comparison::Gte
}

fn earning(
    rule: &str,
    name: &str,
    description: &str,
    amount: i64,
    max_coins_per_day: Option<i64>,
    max_coins_per_user: Option<i64>,
    priority: i32,
) -> EarningRuleConfig {
    EarningRuleConfig {
        rule: rule.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        amount,
        max_coins_per_day,
        max_coins_per_user,
        priority,
        is_active: true,
    }
}

/// Built-in earning rules used when config.toml has none
#[must_use]
pub fn default_earning_rules() -> Vec<EarningRuleConfig> {
    vec![
        earning("purchase", "Purchase", "Coins for every completed purchase", 50, None, None, 100),
        earning("first_purchase", "First purchase", "One-time welcome bonus", 200, None, Some(200), 90),
        earning("review", "Product review", "Coins for reviewing a product", 20, Some(100), None, 80),
        earning("referral", "Referral", "Coins for inviting a friend", 100, None, Some(1000), 70),
        earning("daily_login", "Daily login", "Coins for signing in each day", 10, Some(10), None, 60),
        earning("profile_complete", "Complete profile", "One-time profile bonus", 50, None, Some(50), 50),
        earning("social_share", "Social share", "Coins for sharing a product", 5, Some(25), None, 40),
        earning("birthday", "Birthday", "Yearly birthday gift", 100, Some(100), None, 30),
    ]
}

/// Built-in redemption rules used when config.toml has none
#[must_use]
pub fn default_redemption_rules() -> Vec<RedemptionRuleConfig> {
    let rule = |id: &str, name: &str, coin_cost: i64, reward_type: RewardType, reward_value: f64| {
        RedemptionRuleConfig {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            coin_cost,
            reward_type,
            reward_value,
            max_discount: None,
            min_order_amount: None,
            max_uses: None,
            max_uses_per_user: None,
            valid_from: None,
            valid_until: None,
            is_active: true,
        }
    };

    vec![
        RedemptionRuleConfig {
            description: "5% off your order, up to 10.00".to_string(),
            max_discount: Some(10.0),
            ..rule("discount_5", "5% discount", 100, RewardType::PercentageDiscount, 5.0)
        },
        RedemptionRuleConfig {
            description: "10% off your order, up to 25.00".to_string(),
            max_discount: Some(25.0),
            ..rule("discount_10", "10% discount", 200, RewardType::PercentageDiscount, 10.0)
        },
        RedemptionRuleConfig {
            description: "5.00 off orders of 20.00 or more".to_string(),
            min_order_amount: Some(20.0),
            ..rule("fixed_5", "5.00 off", 250, RewardType::FixedDiscount, 5.0)
        },
        RedemptionRuleConfig {
            description: "Free standard shipping".to_string(),
            ..rule("free_shipping", "Free shipping", 150, RewardType::FreeShipping, 5.99)
        },
        RedemptionRuleConfig {
            description: "Early access to member-only drops".to_string(),
            max_uses_per_user: Some(1),
            ..rule("exclusive_access", "Exclusive access", 500, RewardType::ExclusiveAccess, 0.0)
        },
    ]
}

/// Built-in badges used when config.toml has none
#[must_use]
pub fn default_badges() -> Vec<BadgeConfig> {
    let badge = |id: &str, name: &str, description: &str, metric, threshold, reward_coins| {
        BadgeConfig {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            metric,
            comparison: Comparison::Gte,
            threshold,
            reward_coins,
            is_active: true,
        }
    };

    vec![
        badge("first_purchase", "First Purchase", "Complete your first purchase", BadgeMetric::Purchases, 1, 10),
        badge("coin_collector", "Coin Collector", "Earn 1000 coins", BadgeMetric::CoinsEarned, 1000, 50),
        badge("critic", "Critic", "Write 10 reviews", BadgeMetric::Reviews, 10, 25),
        badge("smart_shopper", "Smart Shopper", "Redeem 5 rewards", BadgeMetric::Redemptions, 5, 25),
    ]
}

impl CoinConfig {
    /// Checks amounts and identifiers that TOML types alone cannot express.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for non-positive amounts, costs or windows,
    /// for duplicate identifiers within a table, and for earning rule ids
    /// that collide with the ledger's own source tags.
    pub fn validate(&self) -> Result<()> {
        let system = &self.system;
        if system.default_expiration_days <= 0 || system.max_coins_per_transaction <= 0 {
            return Err(config_error(
                "default_expiration_days and max_coins_per_transaction must be positive",
            ));
        }
        if system.leaderboard_window_days <= 0 || system.redemption_expiration_days <= 0 {
            return Err(config_error(
                "leaderboard_window_days and redemption_expiration_days must be positive",
            ));
        }

        let mut seen = HashSet::new();
        for rule in &self.earning_rules {
            if rule.amount <= 0 {
                return Err(config_error(&format!("earning rule {} has a non-positive amount", rule.rule)));
            }
            if RESERVED_SOURCES.contains(&rule.rule.as_str()) {
                return Err(config_error(&format!("earning rule id {} is reserved", rule.rule)));
            }
            if !seen.insert(rule.rule.as_str()) {
                return Err(config_error(&format!("duplicate earning rule {}", rule.rule)));
            }
        }

        seen.clear();
        for rule in &self.redemption_rules {
            if rule.coin_cost <= 0 {
                return Err(config_error(&format!("redemption rule {} has a non-positive cost", rule.id)));
            }
            if !seen.insert(rule.id.as_str()) {
                return Err(config_error(&format!("duplicate redemption rule {}", rule.id)));
            }
        }

        seen.clear();
        for badge in &self.badges {
            if !seen.insert(badge.id.as_str()) {
                return Err(config_error(&format!("duplicate badge {}", badge.id)));
            }
        }

        Ok(())
    }
}

/// Source tags written by refunds, badge rewards and admin adjustments.
const RESERVED_SOURCES: [&str; 3] = [REFUND_SOURCE, BADGE_SOURCE, ADJUSTMENT_SOURCE];

fn config_error(message: &str) -> Error {
    Error::Config {
        message: message.to_string(),
    }
}

/// Loads and validates ledger configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A rule or badge fails [`CoinConfig::validate`]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CoinConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading ledger configuration from {}", path_ref.display());
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    let config: CoinConfig = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from ./config.toml, falling back to the built-in
/// defaults when the file does not exist.
pub fn load_default_config() -> Result<CoinConfig> {
    let path = Path::new("config.toml");
    if path.exists() {
        load_config(path)
    } else {
        tracing::warn!("config.toml not found, using built-in ledger configuration");
        Ok(CoinConfig::default())
    }
}

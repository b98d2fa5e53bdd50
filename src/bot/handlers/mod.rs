//! Discord interaction handlers
//!
//! This module provides handlers for Discord interactions such as autocomplete.

/// Autocomplete handlers for earning rule and redemption offer identifiers
pub mod autocomplete;

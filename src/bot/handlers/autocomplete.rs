//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggests rule identifiers as the user types so commands receive ids that
//! exist in the rule tables.

use crate::{
    bot::BotData,
    core::rules,
    errors::Error,
};

/// Discord caps autocomplete lists at 25 entries.
const MAX_SUGGESTIONS: usize = 25;

/// Keeps identifiers whose id or display name contains `partial`, sorted.
fn filter_suggestions<'a>(
    candidates: impl IntoIterator<Item = (&'a str, &'a str)>,
    partial: &str,
) -> Vec<String> {
    let partial_lower = partial.to_lowercase();
    let mut matching: Vec<String> = candidates
        .into_iter()
        .filter(|(id, name)| {
            id.to_lowercase().contains(&partial_lower)
                || name.to_lowercase().contains(&partial_lower)
        })
        .map(|(id, _)| id.to_string())
        .take(MAX_SUGGESTIONS)
        .collect();
    matching.sort();
    matching
}

/// Provides autocomplete suggestions for active earning rule identifiers.
pub async fn autocomplete_earning_rule(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let db = &ctx.data().database;
    let Ok(rules) = rules::get_earning_rules(db).await else {
        return Vec::new();
    };
    filter_suggestions(
        rules.iter().map(|r| (r.rule.as_str(), r.name.as_str())),
        partial,
    )
}

/// Provides autocomplete suggestions for redemption offers the caller can use now.
pub async fn autocomplete_redemption_rule(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let db = &ctx.data().database;
    let user_id = ctx.author().id.to_string();
    let Ok(rules) = rules::get_available_redemptions(db, &user_id).await else {
        return Vec::new();
    };
    filter_suggestions(
        rules.iter().map(|r| (r.id.as_str(), r.name.as_str())),
        partial,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches_id_or_name() {
        let candidates = [
            ("discount_10", "10% discount"),
            ("free_shipping", "Free shipping"),
            ("discount_5", "5% discount"),
        ];
        assert_eq!(
            filter_suggestions(candidates, "DISC"),
            vec!["discount_10".to_string(), "discount_5".to_string()]
        );
        assert_eq!(
            filter_suggestions(candidates, "free"),
            vec!["free_shipping".to_string()]
        );
        assert_eq!(filter_suggestions(candidates, "").len(), 3);
    }

    #[test]
    fn test_filter_caps_suggestions() {
        let ids: Vec<String> = (0..40).map(|i| format!("rule_{i}")).collect();
        let result = filter_suggestions(ids.iter().map(|s| (s.as_str(), s.as_str())), "rule");
        assert_eq!(result.len(), MAX_SUGGESTIONS);
    }
}

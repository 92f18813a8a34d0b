//! The trivial default `ToxicityPredicate`: no classifier ships with this
//! crate (`spec.md` §1 Non-goals exclude content moderation models), so
//! composition is wired to a banned-word heuristic in the same spirit as
//! the spam-cost multiplier in §4.1.

use ember_post::compose::ToxicityPredicate;
use std::sync::Arc;

const BANNED_SUBSTRINGS: &[&str] = &["viagra", "free money", "click here now"];

pub fn default_toxicity_predicate() -> ToxicityPredicate {
    Arc::new(|content: &str| {
        let lower = content.to_ascii_lowercase();
        BANNED_SUBSTRINGS.iter().any(|needle| lower.contains(needle))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_known_banned_phrases_case_insensitively() {
        let predicate = default_toxicity_predicate();
        assert!(predicate("Buy VIAGRA now"));
        assert!(!predicate("hello, nice weather today"));
    }
}

//! Calibration-based iteration estimation and adaptive post difficulty:
//! `spec.md` §4.1 "estimate_iterations_for_ms" and "Adaptive difficulty for
//! posts".

use ember_types::Calibration;

const BANNED_WORDS: &[&str] = &["viagra", "casino", "free-money", "click-here"];

/// `spec.md` §4.1: "uses the caller's calibration... falls back to
/// `max(2000, 3*target_ms)` when absent".
pub fn estimate_iterations_for_ms(target_ms: u64, calibration: Option<&Calibration>) -> u64 {
    match calibration {
        Some(cal) if cal.iterations_per_ms > 0.0 => {
            (cal.iterations_per_ms * target_ms as f64).round() as u64
        }
        _ => 2000u64.max(3 * target_ms),
    }
}

fn looks_spammy(content: &str) -> bool {
    let repeated_char = {
        let bytes = content.as_bytes();
        bytes.windows(5).any(|w| w.iter().all(|&b| b == w[0]))
    };
    let url_count = content.matches("http://").count() + content.matches("https://").count();
    let banned = BANNED_WORDS
        .iter()
        .any(|w| content.to_lowercase().contains(w));
    repeated_char || url_count >= 2 || banned
}

/// `spec.md` §4.1 adaptive difficulty for posts. `recent_post_count` is the
/// number of posts the author made in the last hour.
pub fn adaptive_target_ms(recent_post_count_last_hour: usize, content: &str, is_reply: bool) -> u64 {
    let mut multiplier: f64 = if recent_post_count_last_hour > 10 {
        8.0
    } else if recent_post_count_last_hour > 5 {
        4.0
    } else if recent_post_count_last_hour > 2 {
        2.0
    } else {
        1.0
    };

    if looks_spammy(content) {
        multiplier *= 3.0;
    }
    if content.chars().count() < 20 {
        multiplier *= 2.0;
    }

    let target_ms = ((1000.0 * multiplier) as u64).min(30_000);
    if is_reply {
        500u64.max(target_ms / 2)
    } else {
        target_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_without_calibration() {
        assert_eq!(estimate_iterations_for_ms(1000, None), 3000);
        assert_eq!(estimate_iterations_for_ms(100, None), 2000);
    }

    #[test]
    fn uses_calibration_when_present() {
        let cal = Calibration {
            iterations_per_ms: 500.0,
            target_iterations: 0,
        };
        assert_eq!(estimate_iterations_for_ms(1000, Some(&cal)), 500_000);
    }

    #[test]
    fn clamps_to_thirty_seconds() {
        let target = adaptive_target_ms(11, "totally fine normal length content here", false);
        assert_eq!(target, 30_000);
    }

    #[test]
    fn reply_halves_and_floors_at_500() {
        let target = adaptive_target_ms(0, "a perfectly normal reply with plenty of length", true);
        assert_eq!(target, 500);
    }

    #[test]
    fn spam_like_content_triples_cost() {
        let base = adaptive_target_ms(0, "a perfectly normal post with plenty of length", false);
        let spam = adaptive_target_ms(0, "check this out http://a.com http://b.com plenty of length", false);
        assert!(spam >= base * 3 || spam == 30_000);
    }
}

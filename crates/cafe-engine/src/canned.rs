//! Canned replies for the offline chat mode.
//!
//! Keyword checks are case-insensitive substring matches, evaluated in a
//! fixed order so a question mentioning both price and shipping gets the
//! price answer.

use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

/// Reply when a price keyword is present.
pub const PRICE_REPLY: &str = "Our single-origin bags start at $14 for 250 g. \
Subscriptions save 10% on every delivery.";

/// Reply when an origin keyword is present.
pub const ORIGIN_REPLY: &str = "We source directly from small farms in Colombia, \
Ethiopia and Guatemala, and every bag lists the farm and altitude.";

/// Reply when a shipping keyword is present.
pub const SHIPPING_REPLY: &str = "We roast on Mondays and ship within 48 hours. \
Shipping is free on orders over $35.";

/// Reply when nothing matched.
pub const DEFAULT_REPLY: &str = "Great question! I can tell you about our prices, \
where our beans come from, or how shipping works.";

struct Rule {
    pattern: Regex,
    reply: &'static str,
}

fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (r"(?i)price|cost|precio|cuesta", PRICE_REPLY),
            (r"(?i)origin|origen|where .*from", ORIGIN_REPLY),
            (r"(?i)shipping|delivery|env[ií]o", SHIPPING_REPLY),
        ]
        .into_iter()
        .filter_map(|(pattern, reply)| {
            // Patterns are literals above; a failure here is a typo caught by tests.
            Regex::new(pattern).ok().map(|pattern| Rule { pattern, reply })
        })
        .collect()
    })
}

/// Pick the canned reply for a question.
pub fn canned_reply(question: &str) -> &'static str {
    rules()
        .iter()
        .find(|rule| rule.pattern.is_match(question))
        .map_or(DEFAULT_REPLY, |rule| rule.reply)
}

/// Draw the artificial "typing" delay from an inclusive range.
pub fn reply_delay((min, max): (Duration, Duration)) -> Duration {
    if max <= min {
        return min;
    }
    #[allow(clippy::cast_possible_truncation)]
    let (lo, hi) = (min.as_millis() as u64, max.as_millis() as u64);
    Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_rules_compile() {
        assert_eq!(rules().len(), 3);
    }

    #[test]
    fn test_keyword_replies() {
        assert_eq!(canned_reply("What's the PRICE of a bag?"), PRICE_REPLY);
        assert_eq!(canned_reply("¿Cuál es el origen del café?"), ORIGIN_REPLY);
        assert_eq!(canned_reply("how long does shipping take"), SHIPPING_REPLY);
        assert_eq!(canned_reply("envío a Madrid?"), SHIPPING_REPLY);
        assert_eq!(canned_reply("hello"), DEFAULT_REPLY);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        assert_eq!(canned_reply("price and shipping?"), PRICE_REPLY);
    }

    #[test]
    fn test_reply_delay_within_range() {
        let range = (Duration::from_millis(1000), Duration::from_millis(2000));
        for _ in 0..50 {
            let delay = reply_delay(range);
            assert!(delay >= range.0 && delay <= range.1);
        }
    }

    #[test]
    fn test_reply_delay_degenerate_range() {
        let fixed = Duration::from_millis(5);
        assert_eq!(reply_delay((fixed, fixed)), fixed);
        assert_eq!(reply_delay((Duration::ZERO, Duration::ZERO)), Duration::ZERO);
    }
}

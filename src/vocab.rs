//! Fixed account and currency vocabularies
//!
//! Canonical account names with case-insensitive alias tables, plus the
//! symbol map used by the regex fallback. The alias matchers are compiled
//! once per process and reused across invocations.

use regex::Regex;
use std::sync::OnceLock;

/// Closed account vocabulary: (canonical name, aliases).
///
/// Definition order is part of the contract — free-text alias scanning
/// returns the FIRST account in this order whose alias matches, so
/// overlapping aliases resolve deterministically.
pub const ACCOUNTS: &[(&str, &[&str])] = &[
    ("cash", &["cash", "tunai"]),
    ("bca", &["bca", "m-bca", "mbca", "debit bca"]),
    ("gopay", &["gopay", "go-pay", "go pay"]),
    ("ovo", &["ovo"]),
    ("flazz emoney", &["flazz emoney", "flazz", "emoney", "e-money"]),
    ("credit card", &["credit card", "cc", "kartu kredit"]),
];

/// Single-character currency symbols recognized by the regex fallback.
/// The model path normalizes currencies by instruction-following instead.
pub const CURRENCY_SYMBOLS: &[(char, &str)] = &[
    ('$', "USD"),
    ('€', "EUR"),
    ('£', "GBP"),
    ('¥', "JPY"),
];

struct AccountMatcher {
    canonical: &'static str,
    pattern: Regex,
}

/// Word-boundary alias matchers, compiled once at first use.
fn alias_index() -> &'static Vec<AccountMatcher> {
    static INDEX: OnceLock<Vec<AccountMatcher>> = OnceLock::new();
    INDEX.get_or_init(|| {
        ACCOUNTS
            .iter()
            .map(|(canonical, aliases)| {
                let alternation = aliases
                    .iter()
                    .map(|alias| regex::escape(alias))
                    .collect::<Vec<_>>()
                    .join("|");
                let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
                    .expect("alias pattern must compile");
                AccountMatcher { canonical, pattern }
            })
            .collect()
    })
}

/// Normalize a raw account label against the vocabulary.
///
/// Case-insensitive exact match against a canonical name or any alias;
/// returns the canonical name, or None when the label is not in the
/// vocabulary.
pub fn normalize_account(raw: &str) -> Option<&'static str> {
    let needle = raw.trim();
    if needle.is_empty() {
        return None;
    }

    for (canonical, aliases) in ACCOUNTS {
        if canonical.eq_ignore_ascii_case(needle) {
            return Some(canonical);
        }
        if aliases.iter().any(|alias| alias.eq_ignore_ascii_case(needle)) {
            return Some(canonical);
        }
    }

    None
}

/// Scan free text for the first account whose alias appears on a word
/// boundary. Accounts are tried in vocabulary definition order.
pub fn find_account_in_text(text: &str) -> Option<&'static str> {
    if text.trim().is_empty() {
        return None;
    }

    alias_index()
        .iter()
        .find(|matcher| matcher.pattern.is_match(text))
        .map(|matcher| matcher.canonical)
}

/// ISO code for a known currency symbol.
pub fn currency_for_symbol(symbol: char) -> Option<&'static str> {
    CURRENCY_SYMBOLS
        .iter()
        .find(|(sym, _)| *sym == symbol)
        .map(|(_, code)| *code)
}

/// Symbol for a known ISO code (reverse lookup, used for reply formatting).
pub fn symbol_for_currency(code: &str) -> Option<char> {
    CURRENCY_SYMBOLS
        .iter()
        .find(|(_, iso)| iso.eq_ignore_ascii_case(code))
        .map(|(sym, _)| *sym)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names_are_unique() {
        let mut names: Vec<&str> = ACCOUNTS.iter().map(|(c, _)| *c).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ACCOUNTS.len());
    }

    #[test]
    fn test_normalize_is_case_insensitive() {
        assert_eq!(normalize_account("GoPay"), Some("gopay"));
        assert_eq!(normalize_account("  BCA "), Some("bca"));
        assert_eq!(normalize_account("E-Money"), Some("flazz emoney"));
        assert_eq!(normalize_account("not-a-real-account"), None);
        assert_eq!(normalize_account(""), None);
    }

    #[test]
    fn test_text_scan_respects_word_boundaries() {
        // "cc" must not match inside "soccer"
        assert_eq!(find_account_in_text("watched soccer highlights"), None);
        assert_eq!(find_account_in_text("paid with cc yesterday"), Some("credit card"));
    }

    #[test]
    fn test_text_scan_first_match_in_definition_order() {
        // Both "bca" and "flazz" appear; bca is defined first.
        assert_eq!(find_account_in_text("paid via bca flazz"), Some("bca"));
        assert_eq!(find_account_in_text("topped up flazz at the station"), Some("flazz emoney"));
    }

    #[test]
    fn test_multiword_alias_matches() {
        assert_eq!(find_account_in_text("used Flazz eMoney card"), Some("flazz emoney"));
        assert_eq!(find_account_in_text("go pay for parking"), Some("gopay"));
    }

    #[test]
    fn test_currency_symbols() {
        assert_eq!(currency_for_symbol('$'), Some("USD"));
        assert_eq!(currency_for_symbol('€'), Some("EUR"));
        assert_eq!(currency_for_symbol('x'), None);
        assert_eq!(symbol_for_currency("usd"), Some('$'));
    }
}

//! Regex fallback extractor
//!
//! Last-resort parse of plain text into an expense record: a leading
//! description, a numeric amount, and an optional currency token. No
//! category or merchant inference happens here, and the account is always
//! left for the resolver.

use crate::error::PipelineError;
use crate::models::{ExpenseRecord, DEFAULT_CATEGORY};
use crate::vocab;
use crate::Result;
use regex::Regex;
use std::sync::OnceLock;

fn expense_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(\p{L}[\p{L} \t]*?)\s+([0-9][0-9.,]*)\s*(?:([A-Za-z]{3})\b|([$€£¥]))?")
            .expect("expense pattern must compile")
    })
}

/// Parse `text` into a minimal expense record.
///
/// Fails with `UnparsableText` when the description+amount shape is not
/// present — there is no further fallback beneath this stage.
pub fn fallback_parse(
    text: &str,
    fallback_date: &str,
    default_currency: &str,
) -> Result<ExpenseRecord> {
    let caps = expense_pattern().captures(text).ok_or_else(|| {
        PipelineError::UnparsableText(format!(
            "no description+amount shape in {:?}",
            truncate(text, 60)
        ))
    })?;

    let description = caps[1].trim().to_string();

    let amount = parse_amount_token(&caps[2]).ok_or_else(|| {
        PipelineError::UnparsableText(format!("amount token {:?} is not a positive number", &caps[2]))
    })?;

    let currency = if let Some(code) = caps.get(3) {
        code.as_str().to_uppercase()
    } else if let Some(symbol) = caps.get(4) {
        let symbol = symbol.as_str().chars().next().unwrap_or('$');
        vocab::currency_for_symbol(symbol)
            .unwrap_or(default_currency)
            .to_string()
    } else {
        default_currency.to_string()
    };

    Ok(ExpenseRecord {
        date: fallback_date.to_string(),
        description,
        category: DEFAULT_CATEGORY.to_string(),
        amount,
        currency,
        merchant: None,
        account: None,
    })
}

/// Interpret a numeric token with mixed separator conventions.
///
/// A comma is the decimal separator only when no `.` is present; when both
/// appear, commas are thousands grouping and are stripped.
fn parse_amount_token(token: &str) -> Option<f64> {
    let normalized = if token.contains('.') {
        token.replace(',', "")
    } else if let Some(last_comma) = token.rfind(',') {
        let mut s = String::with_capacity(token.len());
        for (i, ch) in token.char_indices() {
            if ch == ',' {
                if i == last_comma {
                    s.push('.');
                }
            } else {
                s.push(ch);
            }
        }
        s
    } else {
        token.to_string()
    };

    let amount: f64 = normalized.parse().ok()?;
    if amount.is_finite() && amount > 0.0 {
        Some(amount)
    } else {
        None
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_currency() {
        let record = fallback_parse("Lunch 12.50 USD", "2024-01-01", "USD").unwrap();
        assert_eq!(record.date, "2024-01-01");
        assert_eq!(record.description, "Lunch");
        assert_eq!(record.category, "General");
        assert_eq!(record.amount, 12.5);
        assert_eq!(record.currency, "USD");
        assert!(record.merchant.is_none());
        assert!(record.account.is_none());
    }

    #[test]
    fn test_symbol_currency_and_decimal_comma() {
        let record = fallback_parse("Coffee 3,50 €", "2024-01-01", "USD").unwrap();
        assert_eq!(record.amount, 3.5);
        assert_eq!(record.currency, "EUR");
    }

    #[test]
    fn test_missing_currency_uses_default() {
        let record = fallback_parse("Parkir 5000", "2024-01-01", "IDR").unwrap();
        assert_eq!(record.amount, 5000.0);
        assert_eq!(record.currency, "IDR");
    }

    #[test]
    fn test_thousands_grouping_with_decimal_point() {
        let record = fallback_parse("Flight 1,234.50 USD", "2024-01-01", "USD").unwrap();
        assert_eq!(record.amount, 1234.5);
    }

    #[test]
    fn test_multiword_description() {
        let record = fallback_parse("Grab ride home 35.50", "2024-01-01", "USD").unwrap();
        assert_eq!(record.description, "Grab ride home");
        assert_eq!(record.amount, 35.5);
    }

    #[test]
    fn test_lowercase_code_is_uppercased() {
        let record = fallback_parse("Snacks 4.20 eur", "2024-01-01", "USD").unwrap();
        assert_eq!(record.currency, "EUR");
    }

    #[test]
    fn test_unmatchable_text_fails() {
        let err = fallback_parse("just chatting, no expense here!", "2024-01-01", "USD");
        assert!(matches!(err, Err(PipelineError::UnparsableText(_))));

        let err = fallback_parse("12.50 USD", "2024-01-01", "USD");
        assert!(matches!(err, Err(PipelineError::UnparsableText(_))));
    }

    #[test]
    fn test_zero_amount_fails() {
        let err = fallback_parse("Lunch 0.00 USD", "2024-01-01", "USD");
        assert!(matches!(err, Err(PipelineError::UnparsableText(_))));
    }
}

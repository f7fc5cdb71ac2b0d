//! Environment-driven configuration
//!
//! Read once at startup (binaries load `.env` via dotenv first) and treated
//! as read-only afterwards.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    /// ISO 4217 code used when no currency can be derived
    pub default_currency: String,
    /// IANA name or `(GMT|UTC)[+-]H[:MM]` offset for date resolution
    pub timezone: String,
    /// Gate for confirmation replies back to the chat
    pub confirm_replies: bool,
    pub ledger_csv_path: String,
    /// When set, the ledger is appended to Postgres instead of CSV
    pub database_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
            default_currency: env::var("DEFAULT_CURRENCY").unwrap_or_else(|_| "IDR".to_string()),
            timezone: env::var("BOT_TIMEZONE").unwrap_or_else(|_| "Asia/Jakarta".to_string()),
            confirm_replies: env::var("CONFIRM_REPLIES")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
            ledger_csv_path: env::var("LEDGER_CSV_PATH")
                .unwrap_or_else(|_| "expenses.csv".to_string()),
            database_url: env::var("LEDGER_DATABASE_URL")
                .or_else(|_| env::var("DATABASE_URL"))
                .ok(),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
        assert!(!parse_flag(""));
    }
}

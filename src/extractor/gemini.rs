//! Gemini-powered expense extraction
//!
//! Builds the instruction prompt, invokes the Gemini client (text or image
//! variant), and normalizes the JSON reply into an expense record.

use crate::error::PipelineError;
use crate::gemini::{GeminiClient, Part};
use crate::models::{ExpenseRecord, ImageAttachment, DEFAULT_CATEGORY, DEFAULT_DESCRIPTION};
use crate::vocab;
use crate::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

pub struct GeminiExtractor {
    client: GeminiClient,
    default_currency: String,
}

impl GeminiExtractor {
    pub fn new(api_key: String, default_currency: String) -> Self {
        Self {
            client: GeminiClient::new(api_key),
            default_currency,
        }
    }

    /// Build the fixed instruction prompt.
    fn build_prompt(&self, fallback_date: &str) -> String {
        let accounts = vocab::ACCOUNTS
            .iter()
            .map(|(canonical, _)| format!("\"{}\"", canonical))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            r#"You are an expense extraction engine for a personal ledger.

Read the expense in the message (and the receipt image, when one is attached)
and return exactly ONE JSON object with these fields:
date, description, category, amount, currency, merchant, account

Rules:
- date: ISO format YYYY-MM-DD. If the source states no date, use {fallback_date}.
- description: short human-readable summary, at most 60 characters.
- category: a single word, e.g. Food, Transport, Groceries.
- amount: the total paid, as a number.
- currency: 3-letter ISO 4217 code. If unsure, use {default_currency}.
- merchant: the merchant name, or null.
- account: one of [{accounts}], written in lowercase, or null when the payment account is not stated.
- Return ONLY the bare JSON object. No markdown fencing. No explanation text."#,
            fallback_date = fallback_date,
            default_currency = self.default_currency,
            accounts = accounts,
        )
    }
}

#[async_trait]
impl crate::extractor::ExpenseExtractor for GeminiExtractor {
    async fn parse_text(&self, text: &str, fallback_date: &str) -> Result<ExpenseRecord> {
        let prompt = format!("{}\n\nMessage:\n{}", self.build_prompt(fallback_date), text);

        let response = self.client.generate(vec![Part::text(prompt)]).await?;

        debug!(response_len = response.len(), "Gemini text response received");
        normalize_response(&response, fallback_date, &self.default_currency)
    }

    async fn parse_image(
        &self,
        image: &ImageAttachment,
        accompanying_text: Option<&str>,
        fallback_date: &str,
    ) -> Result<ExpenseRecord> {
        let mut parts = vec![
            Part::text(self.build_prompt(fallback_date)),
            Part::inline_data(image.mime_type.clone(), image.data_base64.clone()),
        ];

        if let Some(note) = accompanying_text.filter(|t| !t.trim().is_empty()) {
            parts.push(Part::text(format!("Note from sender: {}", note.trim())));
        }

        let response = self.client.generate(parts).await?;

        debug!(response_len = response.len(), "Gemini image response received");
        normalize_response(&response, fallback_date, &self.default_currency)
    }
}

/// Normalize a raw model reply into an expense record.
///
/// Applied uniformly to the text and image paths: locate the JSON object,
/// merge it onto the default record, then coerce date, amount, currency,
/// account, description, and category.
pub(crate) fn normalize_response(
    raw: &str,
    fallback_date: &str,
    default_currency: &str,
) -> Result<ExpenseRecord> {
    let start = raw.find('{');
    let end = raw.rfind('}');

    let (start, end) = match (start, end) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            return Err(PipelineError::MalformedModelResponse(
                "no JSON object in model reply".to_string(),
            ))
        }
    };

    let parsed: Value = serde_json::from_str(&raw[start..=end]).map_err(|e| {
        PipelineError::MalformedModelResponse(format!("model reply is not valid JSON: {}", e))
    })?;

    let mut record = ExpenseRecord::defaults(fallback_date, default_currency);

    if let Some(date) = parsed.get("date").and_then(Value::as_str) {
        if !date.trim().is_empty() {
            record.date = rewrite_slash_date(date.trim());
        }
    }

    if let Some(description) = parsed.get("description").and_then(Value::as_str) {
        record.description = description.trim().to_string();
    }

    if let Some(category) = parsed.get("category").and_then(Value::as_str) {
        record.category = category.trim().to_string();
    }

    record.amount = coerce_amount(parsed.get("amount"))?;

    if let Some(currency) = parsed.get("currency").and_then(Value::as_str) {
        let currency = currency.trim().to_uppercase();
        if !currency.is_empty() {
            record.currency = currency;
        }
    }

    record.merchant = parsed
        .get("merchant")
        .and_then(Value::as_str)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());

    record.account = parsed
        .get("account")
        .and_then(Value::as_str)
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());

    if record.description.is_empty() {
        record.description = DEFAULT_DESCRIPTION.to_string();
    }
    if record.category.is_empty() {
        record.category = DEFAULT_CATEGORY.to_string();
    }

    Ok(record)
}

/// Rewrite an `MM/DD/YYYY`-style date (slash or dash separated, 2-digit
/// years padded to `20YY`) to ISO. Anything already in ISO form, or not
/// recognizable, passes through unchanged.
fn rewrite_slash_date(date: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})$").expect("date pattern must compile")
    });

    let Some(caps) = pattern.captures(date) else {
        return date.to_string();
    };

    let month: u32 = caps[1].parse().unwrap_or(1);
    let day: u32 = caps[2].parse().unwrap_or(1);
    let mut year: u32 = caps[3].parse().unwrap_or(2000);
    if caps[3].len() == 2 {
        year += 2000;
    }

    format!("{:04}-{:02}-{:02}", year, month, day)
}

/// Coerce the model's amount field to a finite positive number.
///
/// String amounts keep only digits, `.`, `,`, and `-`, then the first
/// remaining comma becomes the decimal point.
fn coerce_amount(value: Option<&Value>) -> Result<f64> {
    let amount = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let mut filtered: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
                .collect();
            if let Some(pos) = filtered.find(',') {
                filtered.replace_range(pos..pos + 1, ".");
            }
            filtered.parse::<f64>().ok()
        }
        _ => None,
    };

    match amount {
        Some(amount) if amount.is_finite() && amount > 0.0 => Ok(amount),
        Some(amount) => Err(PipelineError::AmountUnresolved(format!(
            "amount {} is not a positive number",
            amount
        ))),
        None => Err(PipelineError::AmountUnresolved(
            "no numeric amount in model reply".to_string(),
        )),
    }
}

//! Inbound message handling
//!
//! The collaborator boundary between the chat transport and the pipeline:
//! strips in-message directives, runs extraction, appends the record to the
//! ledger, and confirms back to the chat when replies are enabled.

use crate::error::PipelineError;
use crate::models::{EntryMetadata, ExpenseRecord, InboundMessage};
use crate::pipeline::{ExtractionPipeline, ExtractionRequest};
use crate::sink::LedgerSink;
use crate::vocab;
use crate::Result;
use async_trait::async_trait;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use tracing::{debug, error, info, warn};

/// Fixed retry-guidance reply for unrecoverable extraction failures.
pub const FAILURE_REPLY: &str =
    "Sorry, I couldn't read an expense from that. Try something like: Lunch 12.50 USD";

/// Trait for sending a text reply back to the originating chat
#[async_trait]
pub trait ReplyChannel: Send + Sync {
    async fn reply(&self, text: &str) -> Result<()>;
}

pub struct MessageHandler {
    pipeline: ExtractionPipeline,
    sink: Box<dyn LedgerSink>,
    reply: Option<Box<dyn ReplyChannel>>,
    confirm_replies: bool,
}

impl MessageHandler {
    pub fn new(pipeline: ExtractionPipeline, sink: Box<dyn LedgerSink>) -> Self {
        Self {
            pipeline,
            sink,
            reply: None,
            confirm_replies: false,
        }
    }

    pub fn with_reply(mut self, reply: Box<dyn ReplyChannel>, enabled: bool) -> Self {
        self.reply = Some(reply);
        self.confirm_replies = enabled;
        self
    }

    /// Process one inbound message end to end.
    ///
    /// On success the record has been appended to the ledger and a
    /// confirmation sent (best-effort, when enabled). On failure the fixed
    /// retry-guidance string is sent instead and the error propagates.
    pub async fn handle(&self, message: &InboundMessage) -> Result<ExpenseRecord> {
        let (account_override, cleaned) = strip_account_directive(&message.body);

        if let Some(image) = &message.image {
            debug!(
                message_id = %message.message_id,
                image_hash = %content_hash(&image.data_base64),
                mime_type = %image.mime_type,
                "Message carries an image"
            );
        }

        let request = ExtractionRequest {
            message_id: message.message_id.clone(),
            text: cleaned,
            raw_text: message.body.clone(),
            image: message.image.clone(),
            timestamp_millis: message.timestamp_secs * 1000,
            account_override: account_override.clone(),
        };

        match self.pipeline.extract(&request).await {
            Ok(record) => {
                let mut metadata = EntryMetadata::from_message(message);
                metadata.note = account_override.map(|a| format!("account directive: {}", a));

                self.sink.append(&record, &metadata).await?;

                info!(
                    message_id = %message.message_id,
                    amount = record.amount,
                    currency = %record.currency,
                    account = record.account.as_deref().unwrap_or("-"),
                    "Expense recorded"
                );

                self.send_reply(&confirmation_text(&record)).await;
                Ok(record)
            }
            Err(e) => {
                error!(message_id = %message.message_id, error = %e, "Message handling failed");
                self.send_reply(FAILURE_REPLY).await;
                Err(e)
            }
        }
    }

    /// Best-effort reply: failures are logged, never retried.
    async fn send_reply(&self, text: &str) {
        if !self.confirm_replies {
            return;
        }
        let Some(reply) = &self.reply else {
            return;
        };

        if let Err(e) = reply.reply(text).await {
            warn!(error = %e, "Reply delivery failed");
        }
    }
}

/// Split an `acc:<name>` directive out of the body text.
///
/// Returns the override label (dashes and underscores read as spaces, so
/// multi-word accounts stay addressable) and the body with the directive
/// removed. Only the first directive is honored.
pub fn strip_account_directive(body: &str) -> (Option<String>, String) {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\bacc(?:ount)?:\s*([A-Za-z0-9_-]+)").expect("directive pattern must compile")
    });

    let Some(caps) = pattern.captures(body) else {
        return (None, body.to_string());
    };

    let label = caps[1].replace(['-', '_'], " ");
    let whole = caps.get(0).expect("capture 0 always present");

    let mut cleaned = String::with_capacity(body.len());
    cleaned.push_str(&body[..whole.start()]);
    cleaned.push_str(&body[whole.end()..]);
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    (Some(label), cleaned)
}

/// Human-readable confirmation for the chat.
pub fn confirmation_text(record: &ExpenseRecord) -> String {
    format!(
        "Recorded: {} – {} on {}. Category: {}.",
        record.description,
        format_amount(&record.currency, record.amount),
        record.date,
        record.category
    )
}

/// Format an amount per its currency: known symbols are prefixed, rupiah
/// gets its `Rp` prefix, anything else trails the ISO code. Zero-decimal
/// currencies are grouped without cents.
pub fn format_amount(currency: &str, amount: f64) -> String {
    let decimals = match currency {
        "IDR" | "JPY" | "KRW" | "VND" => 0,
        _ => 2,
    };
    let grouped = group_thousands(amount, decimals);

    if let Some(symbol) = vocab::symbol_for_currency(currency) {
        format!("{}{}", symbol, grouped)
    } else if currency == "IDR" {
        format!("Rp{}", grouped)
    } else {
        format!("{} {}", grouped, currency)
    }
}

fn group_thousands(amount: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, amount);
    let (integer, fraction) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let (sign, digits) = match integer.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", integer),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(fraction) => format!("{}{}.{}", sign, grouped, fraction),
        None => format!("{}{}", sign, grouped),
    }
}

/// Short stable hash for correlating image payloads across log lines.
fn content_hash(data: &str) -> String {
    let digest = Sha256::digest(data.as_bytes());
    hex::encode(&digest[..6])
}

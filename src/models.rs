//! Core data models for the expense ledger agent

use serde::{Deserialize, Serialize};

/// Placeholder description when none can be recovered
pub const DEFAULT_DESCRIPTION: &str = "Expense";

/// Placeholder category when none can be inferred
pub const DEFAULT_CATEGORY: &str = "General";

//
// ================= Expense Record =================
//

/// The normalized output of one pipeline invocation, ready for the ledger.
///
/// Constructed fresh per message; the account field is the last mutation
/// (applied by the account resolver) before the record is handed to the sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpenseRecord {
    /// Calendar date, always ISO 8601 `YYYY-MM-DD`
    pub date: String,
    /// Human-readable description, non-empty
    pub description: String,
    /// Single-word category
    pub category: String,
    /// Strictly positive, finite
    pub amount: f64,
    /// 3-letter ISO 4217 alpha code, upper-cased
    pub currency: String,
    pub merchant: Option<String>,
    /// Canonical account name from the fixed vocabulary, or None if unresolved
    pub account: Option<String>,
}

impl ExpenseRecord {
    /// Default record the model response is merged onto.
    pub fn defaults(fallback_date: &str, default_currency: &str) -> Self {
        Self {
            date: fallback_date.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            amount: 0.0,
            currency: default_currency.to_string(),
            merchant: None,
            account: None,
        }
    }
}

//
// ================= Inbound Message =================
//

/// Image payload attached to a chat message.
///
/// Data is carried base64-encoded end-to-end: the transport hands it over
/// that way and the model API consumes it that way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub data_base64: String,
    pub mime_type: String,
}

/// One inbound chat event, as delivered by the message source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message_id: String,
    pub chat_id: String,
    pub chat_name: String,
    pub sender_id: String,
    /// UTC Unix epoch seconds
    pub timestamp_secs: i64,
    /// Body text, possibly empty
    pub body: String,
    pub image: Option<ImageAttachment>,
}

//
// ================= Ledger Metadata =================
//

/// Columns the surrounding system supplies alongside the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub source: String,
    pub chat_name: String,
    pub message_id: String,
    pub note: Option<String>,
}

impl EntryMetadata {
    pub fn from_message(msg: &InboundMessage) -> Self {
        Self {
            source: "chat".to_string(),
            chat_name: msg.chat_name.clone(),
            message_id: msg.message_id.clone(),
            note: None,
        }
    }
}

//! Ledger sinks
//!
//! Append-only persistence of finished expense records. At-least-once
//! semantics: the sink never deduplicates, delivery retries are the
//! caller's concern. Backends: CSV file, Postgres, in-memory (tests).

use crate::config::Config;
use crate::models::{EntryMetadata, ExpenseRecord};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub mod file;
pub mod postgres;

pub use file::CsvLedgerSink;
pub use postgres::PostgresLedgerSink;

/// Column order of the persisted ledger.
pub const LEDGER_COLUMNS: &[&str] = &[
    "timestamp",
    "date",
    "category",
    "description",
    "amount",
    "currency",
    "merchant",
    "source",
    "chat_name",
    "message_id",
];

/// One persisted ledger line: the record's seven semantic fields plus the
/// message metadata supplied by the surrounding system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerRow {
    pub timestamp: String,
    pub date: String,
    pub category: String,
    pub description: String,
    pub amount: f64,
    pub currency: String,
    pub merchant: String,
    pub source: String,
    pub chat_name: String,
    pub message_id: String,
}

impl LedgerRow {
    pub fn new(record: &ExpenseRecord, metadata: &EntryMetadata) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            date: record.date.clone(),
            category: record.category.clone(),
            description: record.description.clone(),
            amount: record.amount,
            currency: record.currency.clone(),
            merchant: record.merchant.clone().unwrap_or_default(),
            source: metadata.source.clone(),
            chat_name: metadata.chat_name.clone(),
            message_id: metadata.message_id.clone(),
        }
    }
}

/// Trait for ledger persistence
#[async_trait]
pub trait LedgerSink: Send + Sync {
    async fn append(&self, record: &ExpenseRecord, metadata: &EntryMetadata) -> Result<()>;
}

/// In-memory sink for development & testing
pub struct InMemoryLedger {
    rows: Arc<RwLock<Vec<LedgerRow>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn rows(&self) -> Vec<LedgerRow> {
        self.rows.read().await.clone()
    }

    /// Handle for inspecting rows after the sink is boxed away.
    pub fn rows_handle(&self) -> Arc<RwLock<Vec<LedgerRow>>> {
        self.rows.clone()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerSink for InMemoryLedger {
    async fn append(&self, record: &ExpenseRecord, metadata: &EntryMetadata) -> Result<()> {
        let mut rows = self.rows.write().await;
        rows.push(LedgerRow::new(record, metadata));
        Ok(())
    }
}

/// Pick the ledger backend from configuration: Postgres when a database URL
/// is set and reachable for lazy pooling, CSV otherwise.
pub fn build_default_sink(config: &Config) -> Box<dyn LedgerSink> {
    if let Some(url) = &config.database_url {
        match PostgresLedgerSink::connect_lazy(url) {
            Ok(sink) => {
                info!("Ledger backend: postgres");
                return Box::new(sink);
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres ledger backend, falling back to CSV: {}",
                    error
                );
            }
        }
    }

    info!(path = %config.ledger_csv_path, "Ledger backend: csv");
    Box::new(CsvLedgerSink::new(&config.ledger_csv_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (ExpenseRecord, EntryMetadata) {
        (
            ExpenseRecord {
                date: "2024-03-17".to_string(),
                description: "Lunch".to_string(),
                category: "Food".to_string(),
                amount: 12.5,
                currency: "USD".to_string(),
                merchant: Some("Warung Sari".to_string()),
                account: Some("cash".to_string()),
            },
            EntryMetadata {
                source: "chat".to_string(),
                chat_name: "Expenses".to_string(),
                message_id: "msg-42".to_string(),
                note: None,
            },
        )
    }

    #[tokio::test]
    async fn test_in_memory_append() {
        let sink = InMemoryLedger::new();
        let (record, metadata) = sample();

        sink.append(&record, &metadata).await.unwrap();
        sink.append(&record, &metadata).await.unwrap();

        let rows = sink.rows().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].description, "Lunch");
        assert_eq!(rows[0].merchant, "Warung Sari");
        assert_eq!(rows[0].message_id, "msg-42");
    }
}

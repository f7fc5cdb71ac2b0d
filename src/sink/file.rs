//! CSV-backed ledger
//!
//! Append-only file in the persisted column order; the header is written
//! exactly once, when the file is created empty.

use crate::error::PipelineError;
use crate::models::{EntryMetadata, ExpenseRecord};
use crate::sink::{LedgerRow, LedgerSink, LEDGER_COLUMNS};
use crate::Result;
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvLedgerSink {
    path: PathBuf,
}

impl CsvLedgerSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LedgerSink for CsvLedgerSink {
    async fn append(&self, record: &ExpenseRecord, metadata: &EntryMetadata) -> Result<()> {
        let row = LedgerRow::new(record, metadata);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer
                .write_record(LEDGER_COLUMNS)
                .map_err(|e| PipelineError::SinkError(format!("CSV header write failed: {}", e)))?;
        }

        writer
            .serialize(&row)
            .map_err(|e| PipelineError::SinkError(format!("CSV row write failed: {}", e)))?;
        writer
            .flush()
            .map_err(|e| PipelineError::SinkError(format!("CSV flush failed: {}", e)))?;

        debug!(path = %self.path.display(), message_id = %metadata.message_id, "Ledger row appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample() -> (ExpenseRecord, EntryMetadata) {
        (
            ExpenseRecord {
                date: "2024-03-17".to_string(),
                description: "Lunch".to_string(),
                category: "Food".to_string(),
                amount: 12.5,
                currency: "USD".to_string(),
                merchant: None,
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
    async fn test_header_written_once() {
        let path = std::env::temp_dir().join(format!("ledger-test-{}.csv", Uuid::new_v4()));
        let sink = CsvLedgerSink::new(&path);
        let (record, metadata) = sample();

        sink.append(&record, &metadata).await.unwrap();
        sink.append(&record, &metadata).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,date,category"));
        assert!(lines[1].contains("Lunch"));
        assert!(lines[2].contains("msg-42"));

        std::fs::remove_file(&path).ok();
    }
}

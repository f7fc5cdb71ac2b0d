//! Postgres-backed ledger
//!
//! Lazy pool, schema created on first append. Rows are append-only; no
//! updates or deletes ever run against the table.

use crate::error::PipelineError;
use crate::models::{EntryMetadata, ExpenseRecord};
use crate::sink::{LedgerRow, LedgerSink};
use crate::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;
use uuid::Uuid;

pub struct PostgresLedgerSink {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PostgresLedgerSink {
    pub fn connect_lazy(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(url)
            .map_err(|e| PipelineError::SinkError(format!("Postgres pool init failed: {}", e)))?;

        Ok(Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        })
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS ledger_entries (
                      entry_id UUID PRIMARY KEY,
                      ts TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                      date TEXT NOT NULL,
                      category TEXT NOT NULL,
                      description TEXT NOT NULL,
                      amount DOUBLE PRECISION NOT NULL,
                      currency TEXT NOT NULL,
                      merchant TEXT,
                      source TEXT NOT NULL,
                      chat_name TEXT NOT NULL,
                      message_id TEXT NOT NULL
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_ledger_entries_date
                    ON ledger_entries (date);
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                PipelineError::SinkError(format!("Failed to initialize ledger schema: {}", e))
            })?;

        Ok(())
    }
}

#[async_trait]
impl LedgerSink for PostgresLedgerSink {
    async fn append(&self, record: &ExpenseRecord, metadata: &EntryMetadata) -> Result<()> {
        self.ensure_schema().await?;

        let row = LedgerRow::new(record, metadata);
        let entry_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO ledger_entries
              (entry_id, date, category, description, amount, currency, merchant, source, chat_name, message_id)
            VALUES
              ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry_id)
        .bind(&row.date)
        .bind(&row.category)
        .bind(&row.description)
        .bind(row.amount)
        .bind(&row.currency)
        .bind(record.merchant.as_deref())
        .bind(&row.source)
        .bind(&row.chat_name)
        .bind(&row.message_id)
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::SinkError(format!("Ledger insert failed: {}", e)))?;

        debug!(%entry_id, message_id = %metadata.message_id, "Ledger row inserted");
        Ok(())
    }
}

//! Expense Ledger Agent
//!
//! A chat-driven expense bookkeeper that:
//! - Ingests messages (free text or receipt photos) from a chat account
//! - Extracts structured expense records via the Gemini API
//! - Falls back to a regex parse when the model cannot deliver
//! - Reconciles the payment account against a fixed vocabulary
//! - Appends every record to an append-only ledger (CSV or Postgres)
//!
//! PIPELINE:
//! MESSAGE → DATE → EXTRACT (model, then regex fallback) → ACCOUNT → LEDGER

pub mod accounts;
pub mod api;
pub mod config;
pub mod dates;
pub mod error;
pub mod extractor;
pub mod fallback;
pub mod gemini;
pub mod handler;
pub mod models;
pub mod pipeline;
pub mod session;
pub mod sink;
pub mod vocab;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use pipeline::{ExtractionPipeline, ExtractionRequest};

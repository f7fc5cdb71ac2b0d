//! Extractor trait and implementations
//!
//! The model-backed extractor turns a message (or receipt image) into a
//! normalized expense record. The orchestrator owns the fallback policy;
//! extractors never call each other.

use crate::models::{ExpenseRecord, ImageAttachment};
use crate::Result;
use async_trait::async_trait;

pub mod gemini;
pub use gemini::GeminiExtractor;

/// Trait for model-backed expense extraction (LLM controlled)
#[async_trait]
pub trait ExpenseExtractor: Send + Sync {
    /// Extract an expense record from free-form message text.
    async fn parse_text(&self, text: &str, fallback_date: &str) -> Result<ExpenseRecord>;

    /// Extract an expense record from a receipt image, with optional
    /// accompanying free text from the same message.
    async fn parse_image(
        &self,
        image: &ImageAttachment,
        accompanying_text: Option<&str>,
        fallback_date: &str,
    ) -> Result<ExpenseRecord>;
}

/// Mock extractor for development & testing
/// Keeps the pipeline functional without LLM dependency
pub struct MockExtractor;

#[async_trait]
impl ExpenseExtractor for MockExtractor {
    async fn parse_text(&self, text: &str, fallback_date: &str) -> Result<ExpenseRecord> {
        Ok(ExpenseRecord {
            date: fallback_date.to_string(),
            description: if text.trim().is_empty() {
                "Mock expense".to_string()
            } else {
                text.trim().chars().take(60).collect()
            },
            category: "General".to_string(),
            amount: 10.0,
            currency: "USD".to_string(),
            merchant: None,
            account: None,
        })
    }

    async fn parse_image(
        &self,
        _image: &ImageAttachment,
        accompanying_text: Option<&str>,
        fallback_date: &str,
    ) -> Result<ExpenseRecord> {
        self.parse_text(accompanying_text.unwrap_or("Mock receipt"), fallback_date)
            .await
    }
}

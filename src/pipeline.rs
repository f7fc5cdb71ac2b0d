//! Extraction orchestrator
//!
//! Drives the extraction stages in order — model image parse, model text
//! parse, regex fallback — and runs account resolution on whichever record
//! survives. This is the only place the fallback-chain policy lives;
//! individual extractors never call each other.

use crate::accounts::resolve_account;
use crate::dates::resolve_date;
use crate::error::PipelineError;
use crate::extractor::ExpenseExtractor;
use crate::fallback::fallback_parse;
use crate::models::{ExpenseRecord, ImageAttachment};
use crate::Result;
use tracing::{debug, info, warn};

/// One pipeline invocation's input, as assembled by the message handler.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub message_id: String,
    /// Body text with directives stripped, possibly empty
    pub text: String,
    /// Original body text before directive stripping
    pub raw_text: String,
    pub image: Option<ImageAttachment>,
    pub timestamp_millis: i64,
    pub account_override: Option<String>,
}

/// Ordered extraction stages. The attempt list is derived per message and
/// evaluated front to back until one stage yields a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    ModelImage,
    ModelText,
    RegexFallback,
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::ModelImage => "model_image",
            Stage::ModelText => "model_text",
            Stage::RegexFallback => "regex_fallback",
        }
    }
}

/// The pipeline entry point: one invocation per inbound message.
pub struct ExtractionPipeline {
    extractor: Box<dyn ExpenseExtractor>,
    timezone: String,
    default_currency: String,
}

impl ExtractionPipeline {
    pub fn new(
        extractor: Box<dyn ExpenseExtractor>,
        timezone: String,
        default_currency: String,
    ) -> Self {
        Self {
            extractor,
            timezone,
            default_currency,
        }
    }

    /// Produce one normalized expense record, or fail with
    /// `ExtractionFailed` when no stage can.
    pub async fn extract(&self, request: &ExtractionRequest) -> Result<ExpenseRecord> {
        let fallback_date = resolve_date(request.timestamp_millis, &self.timezone);
        let has_text = !request.text.trim().is_empty();

        let stages: &[Stage] = match (&request.image, has_text) {
            (Some(_), true) => &[Stage::ModelImage, Stage::RegexFallback],
            (Some(_), false) => &[Stage::ModelImage],
            (None, _) => &[Stage::ModelText, Stage::RegexFallback],
        };

        debug!(
            message_id = %request.message_id,
            fallback_date = %fallback_date,
            stage_count = stages.len(),
            "Starting extraction"
        );

        let mut last_error: Option<PipelineError> = None;

        for stage in stages {
            match self.run_stage(*stage, request, &fallback_date).await {
                Ok(record) => {
                    info!(
                        message_id = %request.message_id,
                        stage = stage.name(),
                        "Extraction stage succeeded"
                    );
                    return Ok(self.finish(record, request));
                }
                Err(e) if e.is_stage_recoverable() => {
                    warn!(
                        message_id = %request.message_id,
                        stage = stage.name(),
                        error = %e,
                        "Extraction stage failed"
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        let detail = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no extraction stage applicable".to_string());

        Err(PipelineError::ExtractionFailed(detail))
    }

    async fn run_stage(
        &self,
        stage: Stage,
        request: &ExtractionRequest,
        fallback_date: &str,
    ) -> Result<ExpenseRecord> {
        match stage {
            Stage::ModelImage => {
                let image = request.image.as_ref().ok_or_else(|| {
                    PipelineError::ExtractionFailed("image stage without image".to_string())
                })?;
                let note = Some(request.text.as_str()).filter(|t| !t.trim().is_empty());
                self.extractor.parse_image(image, note, fallback_date).await
            }
            Stage::ModelText => self.extractor.parse_text(&request.text, fallback_date).await,
            Stage::RegexFallback => {
                fallback_parse(&request.text, fallback_date, &self.default_currency)
            }
        }
    }

    /// Last mutation before the caller owns the record: account resolution
    /// across the override, the model proposal, and the text candidates.
    fn finish(&self, mut record: ExpenseRecord, request: &ExtractionRequest) -> ExpenseRecord {
        let proposed = record.account.take();
        let merchant = record.merchant.clone().unwrap_or_default();

        let candidates = [
            request.text.as_str(),
            request.raw_text.as_str(),
            record.description.as_str(),
            merchant.as_str(),
        ];

        record.account = resolve_account(
            request.account_override.as_deref(),
            proposed.as_deref(),
            &candidates,
        )
        .map(str::to_string);

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_CATEGORY;
    use async_trait::async_trait;

    struct CannedExtractor {
        record: ExpenseRecord,
    }

    #[async_trait]
    impl ExpenseExtractor for CannedExtractor {
        async fn parse_text(&self, _text: &str, _fallback_date: &str) -> Result<ExpenseRecord> {
            Ok(self.record.clone())
        }

        async fn parse_image(
            &self,
            _image: &ImageAttachment,
            _accompanying_text: Option<&str>,
            _fallback_date: &str,
        ) -> Result<ExpenseRecord> {
            Ok(self.record.clone())
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl ExpenseExtractor for FailingExtractor {
        async fn parse_text(&self, _text: &str, _fallback_date: &str) -> Result<ExpenseRecord> {
            Err(PipelineError::ModelInvocation("quota exhausted".to_string()))
        }

        async fn parse_image(
            &self,
            _image: &ImageAttachment,
            _accompanying_text: Option<&str>,
            _fallback_date: &str,
        ) -> Result<ExpenseRecord> {
            Err(PipelineError::ModelInvocation("quota exhausted".to_string()))
        }
    }

    fn sample_record() -> ExpenseRecord {
        ExpenseRecord {
            date: "2024-03-17".to_string(),
            description: "Lunch at warung".to_string(),
            category: "Food".to_string(),
            amount: 45000.0,
            currency: "IDR".to_string(),
            merchant: None,
            account: Some("cash".to_string()),
        }
    }

    fn request(text: &str) -> ExtractionRequest {
        ExtractionRequest {
            message_id: "msg-1".to_string(),
            text: text.to_string(),
            raw_text: text.to_string(),
            image: None,
            timestamp_millis: 1_710_705_600_000,
            account_override: None,
        }
    }

    fn image() -> ImageAttachment {
        ImageAttachment {
            data_base64: "aGVsbG8=".to_string(),
            mime_type: "image/jpeg".to_string(),
        }
    }

    fn pipeline(extractor: Box<dyn ExpenseExtractor>) -> ExtractionPipeline {
        ExtractionPipeline::new(extractor, "Asia/Jakarta".to_string(), "IDR".to_string())
    }

    #[tokio::test]
    async fn test_text_path_keeps_model_account() {
        let pipeline = pipeline(Box::new(CannedExtractor {
            record: sample_record(),
        }));

        let record = pipeline.extract(&request("makan siang 45000")).await.unwrap();
        assert_eq!(record.account, Some("cash".to_string()));
        assert_eq!(record.amount, 45000.0);
    }

    #[tokio::test]
    async fn test_override_beats_model_account() {
        let pipeline = pipeline(Box::new(CannedExtractor {
            record: sample_record(),
        }));

        let mut req = request("makan siang 45000");
        req.account_override = Some("GoPay".to_string());

        let record = pipeline.extract(&req).await.unwrap();
        assert_eq!(record.account, Some("gopay".to_string()));
    }

    #[tokio::test]
    async fn test_model_failure_falls_back_to_regex() {
        let pipeline = pipeline(Box::new(FailingExtractor));

        let record = pipeline.extract(&request("Lunch 12.50 USD")).await.unwrap();
        assert_eq!(record.description, "Lunch");
        assert_eq!(record.amount, 12.5);
        assert_eq!(record.category, DEFAULT_CATEGORY);
        // fallback date comes from the message timestamp in Asia/Jakarta
        assert_eq!(record.date, "2024-03-18");
    }

    #[tokio::test]
    async fn test_image_without_text_propagates_model_error() {
        let pipeline = pipeline(Box::new(FailingExtractor));

        let mut req = request("");
        req.image = Some(image());

        let err = pipeline.extract(&req).await.unwrap_err();
        match err {
            PipelineError::ExtractionFailed(detail) => {
                assert!(detail.contains("quota exhausted"));
            }
            other => panic!("expected ExtractionFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_image_with_text_falls_back_to_regex() {
        let pipeline = pipeline(Box::new(FailingExtractor));

        let mut req = request("Coffee 3,50 €");
        req.image = Some(image());

        let record = pipeline.extract(&req).await.unwrap();
        assert_eq!(record.amount, 3.5);
        assert_eq!(record.currency, "EUR");
    }

    #[tokio::test]
    async fn test_unparsable_text_is_extraction_failure() {
        let pipeline = pipeline(Box::new(FailingExtractor));

        let err = pipeline.extract(&request("hello there")).await.unwrap_err();
        assert!(matches!(err, PipelineError::ExtractionFailed(_)));
    }

    #[tokio::test]
    async fn test_account_recovered_from_raw_text() {
        let mut record = sample_record();
        record.account = None;

        let pipeline = pipeline(Box::new(CannedExtractor { record }));

        let mut req = request("makan siang 45000");
        req.raw_text = "makan siang 45000 pakai gopay".to_string();

        let resolved = pipeline.extract(&req).await.unwrap();
        assert_eq!(resolved.account, Some("gopay".to_string()));
    }
}

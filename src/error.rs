//! Error types for the expense extraction pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {

    // =============================
    // Extraction Stage Errors
    // =============================

    #[error("Model invocation failed: {0}")]
    ModelInvocation(String),

    #[error("Malformed model response: {0}")]
    MalformedModelResponse(String),

    #[error("Amount could not be resolved: {0}")]
    AmountUnresolved(String),

    #[error("Text did not match expense shape: {0}")]
    UnparsableText(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    // =============================
    // Collaborator Errors
    // =============================

    #[error("Ledger sink error: {0}")]
    SinkError(String),

    #[error("Reply channel error: {0}")]
    ReplyError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PipelineError {
    /// True for errors the orchestrator may recover from by attempting the
    /// next extraction stage.
    pub fn is_stage_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::ModelInvocation(_)
                | PipelineError::MalformedModelResponse(_)
                | PipelineError::AmountUnresolved(_)
                | PipelineError::UnparsableText(_)
        )
    }
}

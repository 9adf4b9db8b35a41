//! Error types for the pipeline.

use hcert_core::{CoreError, ErrorKind};
use hcert_text::TextError;
use thiserror::Error;

/// Errors surfaced by issuance and configuration.
///
/// Decoding never fails at the API level; its failures are recorded in the
/// [`DecodeResult`](crate::DecodeResult) instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Claim, envelope or key error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Compression or text encoding error.
    #[error(transparent)]
    Text(#[from] TextError),

    /// Invalid pipeline configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Malformed certificate identifier.
    #[error("invalid certificate identifier: {0}")]
    Identifier(String),

    /// The QR renderer rejected the token.
    #[error("QR rendering failed: {0}")]
    Render(String),
}

impl PipelineError {
    /// Map onto the stage-level taxonomy.
    ///
    /// Configuration, identifier and rendering problems have no stage of
    /// their own and report as `SchemaViolation`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Core(e) => e.kind(),
            PipelineError::Text(e) => e.kind(),
            PipelineError::Config(_)
            | PipelineError::Identifier(_)
            | PipelineError::Render(_) => ErrorKind::SchemaViolation,
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

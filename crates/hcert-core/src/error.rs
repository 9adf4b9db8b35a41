//! Error types for the hcert core.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stage-level failure taxonomy shared by every crate in the workspace.
///
/// Decode reports these inside a `DecodeResult`; issuance surfaces them
/// through the first failing stage's error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    BadPrefix,
    InvalidAlphabet,
    CorruptStream,
    MalformedEnvelope,
    UnknownKey,
    SignatureInvalid,
    MalformedPayload,
    SchemaViolation,
    Expired,
    NotYetValid,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BadPrefix => "bad prefix",
            Self::InvalidAlphabet => "invalid alphabet",
            Self::CorruptStream => "corrupt stream",
            Self::MalformedEnvelope => "malformed envelope",
            Self::UnknownKey => "unknown key",
            Self::SignatureInvalid => "signature invalid",
            Self::MalformedPayload => "malformed payload",
            Self::SchemaViolation => "schema violation",
            Self::Expired => "expired",
            Self::NotYetValid => "not yet valid",
        };
        f.write_str(name)
    }
}

/// Core errors that can occur while encoding, signing or opening certificates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("schema violation: {0}")]
    SchemaViolation(String),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("unknown key: {0}")]
    UnknownKey(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(i64),

    #[error("encoding error: {0}")]
    EncodingError(String),
}

impl CoreError {
    /// Map onto the stage-level taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::MalformedPayload(_) | CoreError::EncodingError(_) => {
                ErrorKind::MalformedPayload
            }
            CoreError::SchemaViolation(_) => ErrorKind::SchemaViolation,
            CoreError::MalformedEnvelope(_) | CoreError::UnsupportedAlgorithm(_) => {
                ErrorKind::MalformedEnvelope
            }
            CoreError::UnknownKey(_) | CoreError::InvalidKey(_) => ErrorKind::UnknownKey,
            CoreError::InvalidSignature => ErrorKind::SignatureInvalid,
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            CoreError::MalformedPayload("x".into()).kind(),
            ErrorKind::MalformedPayload
        );
        assert_eq!(
            CoreError::SchemaViolation("x".into()).kind(),
            ErrorKind::SchemaViolation
        );
        assert_eq!(CoreError::InvalidSignature.kind(), ErrorKind::SignatureInvalid);
        assert_eq!(
            CoreError::UnsupportedAlgorithm(-35).kind(),
            ErrorKind::MalformedEnvelope
        );
    }

    #[test]
    fn test_kind_serializes_by_name() {
        let json = serde_json::to_string(&ErrorKind::UnknownKey).unwrap();
        assert_eq!(json, "\"UnknownKey\"");
    }
}

//! Pipeline configuration.

use hcert_core::ClaimSchema;
use hcert_text::{compression, TokenPrefix, Zlib};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::identifier;

/// Configuration for the [`Pipeline`](crate::Pipeline).
///
/// Every field has a default, so a partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Token prefix tag (`HC` in `HC1:`).
    pub prefix_tag: String,
    /// Token prefix version digit.
    pub prefix_version: u8,
    /// zlib level, 0 to 9.
    pub compression_level: u32,
    /// Ceiling on inflated envelope size, in bytes.
    pub max_decompressed_len: usize,
    /// Issuer written into claim sets built by `issue_payload`.
    pub issuer: String,
    /// Validity of certificates built by `issue_payload`.
    pub validity_days: i64,
    /// Rules applied to JSON payloads.
    pub schema: ClaimSchema,
    /// Certificate identifier generation; disabled when absent.
    pub identifier: Option<IdentifierConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prefix_tag: "HC".into(),
            prefix_version: 1,
            compression_level: compression::DEFAULT_LEVEL,
            max_decompressed_len: compression::DEFAULT_MAX_DECOMPRESSED,
            issuer: String::new(),
            validity_days: 365,
            schema: ClaimSchema::default(),
            identifier: None,
        }
    }
}

/// Settings for generated certificate identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifierConfig {
    /// Two-letter country code embedded in the identifier.
    pub country: String,
    /// Payload field the identifier is written to.
    pub claim_key: String,
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            country: "XX".into(),
            claim_key: "ci".into(),
        }
    }
}

impl PipelineConfig {
    /// Check the configuration for values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.prefix()?;

        if self.compression_level > 9 {
            return Err(PipelineError::Config(format!(
                "compression level {} is not in 0..=9",
                self.compression_level
            )));
        }
        if self.max_decompressed_len == 0 {
            return Err(PipelineError::Config(
                "decompression ceiling must be positive".into(),
            ));
        }
        if self.validity_days <= 0 {
            return Err(PipelineError::Config(format!(
                "validity of {} days must be positive",
                self.validity_days
            )));
        }
        if let Some(ident) = &self.identifier {
            identifier::check_country(&ident.country)?;
            if ident.claim_key.is_empty() {
                return Err(PipelineError::Config(
                    "identifier claim key must not be empty".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn prefix(&self) -> Result<TokenPrefix> {
        TokenPrefix::new(self.prefix_tag.clone(), self.prefix_version)
            .map_err(|e| PipelineError::Config(e.to_string()))
    }

    pub fn zlib(&self) -> Zlib {
        Zlib::new(self.compression_level, self.max_decompressed_len)
    }

    /// Validity window length in seconds.
    pub fn validity_secs(&self) -> i64 {
        self.validity_days.saturating_mul(86_400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.prefix().unwrap().to_string(), "HC1:");
        assert_eq!(config.validity_secs(), 365 * 86_400);
    }

    #[test]
    fn test_partial_json() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{ "issuer": "DE", "validity_days": 180, "identifier": { "country": "DE" } }"#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.issuer, "DE");
        assert_eq!(config.compression_level, 9);
        assert_eq!(config.identifier.unwrap().claim_key, "ci");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad = [
            PipelineConfig {
                prefix_tag: "hc".into(),
                ..Default::default()
            },
            PipelineConfig {
                compression_level: 10,
                ..Default::default()
            },
            PipelineConfig {
                max_decompressed_len: 0,
                ..Default::default()
            },
            PipelineConfig {
                validity_days: 0,
                ..Default::default()
            },
            PipelineConfig {
                identifier: Some(IdentifierConfig {
                    country: "Germany".into(),
                    ..Default::default()
                }),
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(PipelineError::Config(_))),
                "accepted {config:?}"
            );
        }
    }
}

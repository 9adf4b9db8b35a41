//! The Pipeline: issue tokens from claims, decode tokens into staged results.
//!
//! ```text
//! issue:  ClaimSet -> CBOR -> COSE_Sign1 -> zlib -> Base45 -> "HC1:" token
//! decode: token -> prefix -> Base45 -> inflate -> envelope -> key lookup
//!               -> signature -> claims -> validity window
//! ```
//!
//! The pipeline holds only configuration. Signers and trust stores are
//! passed per call and shared freely across threads.

use hcert_core::{
    encode_claim_set, Algorithm, ClaimSet, ErrorKind, Kid, SignatureEnvelope, Signer, TrustEntry,
    TrustStore, Verification,
};
use hcert_text::{base45, TextCodec, TextError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::identifier;
use crate::result::{DecodeResult, Stage};

/// A freshly issued certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedCertificate {
    /// Certificate identifier, when identifier generation is enabled.
    pub identifier: Option<String>,
    pub token: String,
    pub kid: Kid,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// Public description of a signing key.
///
/// Serializes to the same shape as a trust list entry, so the output can be
/// handed to verifiers unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyInfo {
    pub kid: Kid,
    pub algorithm: Algorithm,
    #[serde(with = "hex")]
    pub key: Vec<u8>,
}

impl PublicKeyInfo {
    /// The trust entry verifiers need for tokens from this key.
    pub fn to_trust_entry(&self) -> hcert_core::error::Result<TrustEntry> {
        TrustEntry::from_key_bytes(self.kid.clone(), self.algorithm, &self.key)
    }
}

impl From<&Signer> for PublicKeyInfo {
    fn from(signer: &Signer) -> Self {
        Self {
            kid: signer.kid().clone(),
            algorithm: signer.algorithm(),
            key: signer.verification_key().to_bytes(),
        }
    }
}

/// Issue and decode health certificate tokens.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    codec: TextCodec,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            config: PipelineConfig::default(),
            codec: TextCodec::default(),
        }
    }
}

impl Pipeline {
    /// Create a pipeline from a validated configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let codec = TextCodec::new(config.prefix()?, config.zlib());
        Ok(Self { config, codec })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Issuance
    // ─────────────────────────────────────────────────────────────────────────

    /// Sign a claim set and encode it as a token.
    ///
    /// The first failing stage aborts issuance.
    pub fn issue(&self, claims: &ClaimSet, signer: &Signer) -> Result<String> {
        let payload = encode_claim_set(claims)?;
        debug!(bytes = payload.len(), "encoded claim set");

        let envelope = SignatureEnvelope::build(&payload, signer)?;
        let limit = self.codec.zlib.max_decompressed();
        if envelope.len() > limit {
            return Err(TextError::TooLarge { limit }.into());
        }

        let token = self.codec.encode(&envelope)?;
        info!(kid = %signer.kid(), chars = token.len(), "issued token");
        Ok(token)
    }

    /// Validate a JSON payload, stamp the validity window and issue.
    pub fn issue_payload(
        &self,
        payload: &serde_json::Value,
        signer: &Signer,
    ) -> Result<IssuedCertificate> {
        self.issue_payload_at(payload, signer, now_secs())
    }

    /// [`Pipeline::issue_payload`] at a fixed time (seconds since the epoch).
    pub fn issue_payload_at(
        &self,
        payload: &serde_json::Value,
        signer: &Signer,
        now: i64,
    ) -> Result<IssuedCertificate> {
        let mut payload = self.config.schema.parse(payload)?;

        let identifier = match &self.config.identifier {
            Some(settings) => match payload.get(&settings.claim_key) {
                Some(existing) => {
                    let id = existing.as_text().ok_or_else(|| {
                        PipelineError::Identifier(format!(
                            "claim {:?} must be text",
                            settings.claim_key
                        ))
                    })?;
                    identifier::validate(id)?;
                    Some(id.to_string())
                }
                None => {
                    let id = identifier::generate(&settings.country)?;
                    payload.insert(settings.claim_key.clone(), id.clone().into());
                    Some(id)
                }
            },
            None => None,
        };

        let expires_at = now.saturating_add(self.config.validity_secs());
        let claims = ClaimSet::new(self.config.issuer.clone(), now, expires_at, payload)?;
        let token = self.issue(&claims, signer)?;

        info!(
            kid = %signer.kid(),
            identifier = identifier.as_deref().unwrap_or("-"),
            expires_at,
            "issued certificate"
        );
        Ok(IssuedCertificate {
            identifier,
            token,
            kid: signer.kid().clone(),
            issued_at: now,
            expires_at,
        })
    }

    /// Describe the signer's public key.
    pub fn public_key_info(&self, signer: &Signer) -> PublicKeyInfo {
        PublicKeyInfo::from(signer)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Decoding
    // ─────────────────────────────────────────────────────────────────────────

    /// Decode a token against the trust store at the current time.
    pub fn decode(&self, token: &str, trust: &TrustStore) -> DecodeResult {
        self.decode_at(token, trust, now_secs())
    }

    /// Decode a token at a fixed time (seconds since the epoch).
    ///
    /// Never fails: every stage outcome is recorded in the result.
    pub fn decode_at(&self, token: &str, trust: &TrustStore, now: i64) -> DecodeResult {
        let mut result = DecodeResult::default();

        let body = match self.codec.prefix.strip(token) {
            Ok(body) => {
                result.pass(Stage::Prefix, body.as_bytes());
                body
            }
            Err(e) => return stop(result, Stage::Prefix, e.kind(), e),
        };

        let compressed = match base45::decode(body) {
            Ok(bytes) => {
                result.pass(Stage::Base45, &bytes);
                bytes
            }
            Err(e) => return stop(result, Stage::Base45, e.kind(), e),
        };

        let envelope_bytes = match self.codec.zlib.decompress(&compressed) {
            Ok(bytes) => {
                result.pass(Stage::Inflate, &bytes);
                bytes
            }
            Err(e) => return stop(result, Stage::Inflate, e.kind(), e),
        };

        let envelope = match SignatureEnvelope::from_bytes(&envelope_bytes) {
            Ok(envelope) => {
                result.pass(Stage::Envelope, envelope.protected_bytes());
                result.set_kid(envelope.kid().cloned());
                envelope
            }
            Err(e) => return stop(result, Stage::Envelope, e.kind(), e),
        };

        match envelope.verify(trust) {
            Verification::Verified { kid, algorithm } => {
                result.pass(Stage::KeyLookup, kid.as_bytes());
                result.set_algorithm(algorithm);
                result.pass(
                    Stage::Signature,
                    &envelope.signed_bytes().unwrap_or_default(),
                );
            }
            Verification::SignatureInvalid { kid, algorithm } => {
                result.pass(Stage::KeyLookup, kid.as_bytes());
                result.set_algorithm(algorithm);
                result.fail(
                    Stage::Signature,
                    ErrorKind::SignatureInvalid,
                    format!("signature does not verify under {algorithm} key {kid}"),
                );
            }
            Verification::UnknownKey { kid } => {
                let detail = match kid {
                    Some(kid) => format!("no trusted key for {kid}"),
                    None => "envelope carries no key identifier".to_string(),
                };
                result.fail(Stage::KeyLookup, ErrorKind::UnknownKey, detail);
            }
        }

        let claims = match envelope.claims() {
            Ok(claims) => {
                result.pass(Stage::Claims, envelope.payload());
                claims
            }
            Err(e) => return stop(result, Stage::Claims, e.kind(), e),
        };

        if result.signature_valid() {
            let expired = claims.is_expired_at(now);
            let premature = claims.is_premature_at(now);
            result.set_window(expired, premature);

            if expired {
                warn!(expires_at = claims.expires_at(), now, "certificate expired");
                result.fail(
                    Stage::Validity,
                    ErrorKind::Expired,
                    format!("expired at {}", claims.expires_at()),
                );
            } else if premature {
                warn!(issued_at = claims.issued_at(), now, "certificate not yet valid");
                result.fail(
                    Stage::Validity,
                    ErrorKind::NotYetValid,
                    format!("not valid before {}", claims.issued_at()),
                );
            } else {
                result.pass(Stage::Validity, &[]);
            }
        }

        result.set_claims(claims);
        debug!(usable = result.is_usable(), "decoded token");
        result
    }
}

fn stop(
    mut result: DecodeResult,
    stage: Stage,
    kind: ErrorKind,
    detail: impl std::fmt::Display,
) -> DecodeResult {
    warn!(%stage, ?kind, %detail, "decode stopped");
    result.fail(stage, kind, detail);
    result
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcert_core::Payload;
    use serde_json::json;

    const T: i64 = 1_700_000_000;

    fn setup() -> (Pipeline, Signer, TrustStore) {
        let signer = Signer::from_seed(Algorithm::Es256, &[0x11; 32]).unwrap();
        let trust = TrustStore::from_entries([TrustEntry::for_signer(&signer)]).unwrap();
        (Pipeline::default(), signer, trust)
    }

    fn claims(issued_at: i64, expires_at: i64) -> ClaimSet {
        let mut payload = Payload::new();
        payload.insert("name".into(), "A".into());
        ClaimSet::new("XY", issued_at, expires_at, payload).unwrap()
    }

    #[test]
    fn test_issue_decode() {
        let (pipeline, signer, trust) = setup();
        let original = claims(T, T + 180 * 86_400);
        let token = pipeline.issue(&original, &signer).unwrap();

        let result = pipeline.decode_at(&token, &trust, T + 1);
        assert!(result.is_usable(), "{:?}", result.failure());
        assert_eq!(result.verified_claims(), Some(&original));
        assert_eq!(result.kid(), Some(signer.kid()));
        assert_eq!(result.algorithm(), Some(Algorithm::Es256));
        assert_eq!(result.stages().len(), 8);
        assert!(result.failure().is_none());
    }

    #[test]
    fn test_stage_bytes_chain() {
        let (pipeline, signer, trust) = setup();
        let original = claims(T, T + 10);
        let token = pipeline.issue(&original, &signer).unwrap();
        let result = pipeline.decode_at(&token, &trust, T);

        let body = result.stage_bytes(Stage::Prefix).unwrap();
        assert_eq!(body, &token.as_bytes()[4..]);
        let compressed = result.stage_bytes(Stage::Base45).unwrap();
        let envelope = result.stage_bytes(Stage::Inflate).unwrap();
        assert_eq!(pipeline.codec.zlib.decompress(compressed).unwrap(), envelope);
        assert_eq!(
            result.stage_bytes(Stage::Claims).unwrap(),
            encode_claim_set(&original).unwrap().as_slice()
        );
    }

    #[test]
    fn test_decode_agrees_with_open() {
        let (pipeline, signer, trust) = setup();
        let original = claims(T, T + 10);
        let token = pipeline.issue(&original, &signer).unwrap();

        let result = pipeline.decode_at(&token, &trust, T);
        let envelope = result.stage_bytes(Stage::Inflate).unwrap();
        let opened = SignatureEnvelope::open(envelope, &trust).unwrap();
        assert_eq!(opened.verified_claims(), result.verified_claims());
        assert_eq!(opened.envelope.kid(), result.kid());

        let stranger = TrustStore::new();
        let result = pipeline.decode_at(&token, &stranger, T);
        let opened = SignatureEnvelope::open(envelope, &stranger).unwrap();
        assert!(!opened.verification.kid_found());
        assert!(!result.kid_found());
        assert_eq!(Some(&opened.claims), result.unverified_claims());
    }

    #[test]
    fn test_premature_token() {
        let (pipeline, signer, trust) = setup();
        let token = pipeline.issue(&claims(T, T + 100), &signer).unwrap();
        let result = pipeline.decode_at(&token, &trust, T - 1);

        assert!(result.signature_valid());
        assert!(result.not_yet_valid());
        assert!(!result.expired());
        assert!(!result.is_usable());
        assert_eq!(result.failure(), Some((Stage::Validity, ErrorKind::NotYetValid)));
    }

    #[test]
    fn test_issue_payload_stamps_window_and_identifier() {
        let config = PipelineConfig {
            issuer: "DE".into(),
            validity_days: 30,
            identifier: Some(Default::default()),
            ..Default::default()
        };
        let pipeline = Pipeline::new(config).unwrap();
        let (_, signer, trust) = setup();

        let issued = pipeline
            .issue_payload_at(&json!({ "nam": { "fn": "Musterfrau" } }), &signer, T)
            .unwrap();
        assert_eq!(issued.issued_at, T);
        assert_eq!(issued.expires_at, T + 30 * 86_400);
        let id = issued.identifier.clone().unwrap();
        identifier::validate(&id).unwrap();

        let result = pipeline.decode_at(&issued.token, &trust, T + 5);
        let claims = result.verified_claims().unwrap();
        assert_eq!(claims.issuer(), "DE");
        assert_eq!(claims.payload()["ci"].as_text(), Some(id.as_str()));
    }

    #[test]
    fn test_issue_payload_keeps_existing_identifier() {
        let config = PipelineConfig {
            identifier: Some(Default::default()),
            ..Default::default()
        };
        let pipeline = Pipeline::new(config).unwrap();
        let (_, signer, _) = setup();

        let id = "URN:UVCI:01:XY:000102030405060708090A0B0C0D0E0F#0";
        let issued = pipeline
            .issue_payload_at(&json!({ "ci": id }), &signer, T)
            .unwrap();
        assert_eq!(issued.identifier.as_deref(), Some(id));
    }

    #[test]
    fn test_issue_payload_rejects_bad_existing_identifier() {
        let config = PipelineConfig {
            identifier: Some(Default::default()),
            ..Default::default()
        };
        let pipeline = Pipeline::new(config).unwrap();
        let (_, signer, _) = setup();

        for payload in [
            json!({ "ci": 42 }),
            json!({ "ci": ["URN:UVCI:01:XY:000102030405060708090A0B0C0D0E0F#0"] }),
            json!({ "ci": "URN:UVCI:01:XX:ABC#1" }),
            json!({ "ci": "URN:UVCI:01:XY:000102030405060708090A0B0C0D0E0F#1" }),
        ] {
            let err = pipeline.issue_payload_at(&payload, &signer, T).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SchemaViolation, "{payload}");
        }
    }

    #[test]
    fn test_issue_payload_schema_violation() {
        let (pipeline, signer, _) = setup();
        let err = pipeline
            .issue_payload_at(&json!({ "dose": 0.5 }), &signer, T)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    }

    #[test]
    fn test_issue_rejects_oversized_envelope() {
        let config = PipelineConfig {
            max_decompressed_len: 64,
            ..Default::default()
        };
        let pipeline = Pipeline::new(config).unwrap();
        let (_, signer, _) = setup();

        let err = pipeline.issue(&claims(T, T + 1), &signer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptStream);
    }

    #[test]
    fn test_public_key_info_is_trust_entry() {
        let (pipeline, signer, _) = setup();
        let info = pipeline.public_key_info(&signer);
        assert_eq!(info.kid, *signer.kid());
        assert_eq!(info.to_trust_entry().unwrap(), TrustEntry::for_signer(&signer));

        let json = serde_json::to_string(&info).unwrap();
        let store = TrustStore::from_json(&format!("[{json}]")).unwrap();
        assert!(store.lookup(signer.kid()).is_some());
    }

    #[test]
    fn test_custom_prefix() {
        let config = PipelineConfig {
            prefix_tag: "VC".into(),
            prefix_version: 2,
            ..Default::default()
        };
        let pipeline = Pipeline::new(config).unwrap();
        let (default_pipeline, signer, trust) = setup();

        let token = pipeline.issue(&claims(T, T + 10), &signer).unwrap();
        assert!(token.starts_with("VC2:"));
        assert!(pipeline.decode_at(&token, &trust, T).is_usable());

        let result = default_pipeline.decode_at(&token, &trust, T);
        assert_eq!(result.failure(), Some((Stage::Prefix, ErrorKind::BadPrefix)));
    }
}

//! Signed envelope: a single-signer COSE_Sign1 structure.
//!
//! ```text
//! 18([ protected: bstr .cbor {1: alg, 4: kid}, unprotected: {}, payload: bstr, signature: bstr ])
//! ```
//!
//! The signature covers `["Signature1", protected, h'', payload]`, always
//! rebuilt from the exact protected and payload bytes carried by the
//! envelope. Nothing decoded is ever re-serialized for verification.

use ciborium::value::Value;
use tracing::{debug, warn};

use crate::canonical::{decode_claim_set, decode_value, encode_canonical, int_value};
use crate::claims::ClaimSet;
use crate::crypto::{Algorithm, Signer};
use crate::error::{CoreError, Result};
use crate::trust::TrustStore;
use crate::types::Kid;

/// CBOR tag identifying a COSE_Sign1 message.
pub const COSE_SIGN1_TAG: u64 = 18;

/// Context string of the Sig_structure for single-signer messages.
pub const SIGNATURE1_CONTEXT: &str = "Signature1";

/// Header labels.
mod labels {
    pub const ALG: i64 = 1;
    pub const KID: i64 = 4;
}

/// The parsed protected header.
///
/// The algorithm here is untrusted and advisory: verification always uses
/// the algorithm bound to the trust entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedHeader {
    /// Raw COSE algorithm id, if present.
    pub alg: Option<i64>,
    /// Key identifier, if present.
    pub kid: Option<Kid>,
}

/// A parsed COSE_Sign1 envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEnvelope {
    protected_bytes: Vec<u8>,
    protected: ProtectedHeader,
    unprotected_kid: Option<Kid>,
    payload: Vec<u8>,
    signature: Vec<u8>,
}

/// Outcome of checking an envelope against a trust store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The KID resolved and the signature is valid under the trusted key.
    Verified { kid: Kid, algorithm: Algorithm },
    /// No KID in the envelope, or the KID is not in the trust store.
    UnknownKey { kid: Option<Kid> },
    /// The KID resolved but the signature does not verify.
    SignatureInvalid { kid: Kid, algorithm: Algorithm },
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified { .. })
    }

    pub fn kid_found(&self) -> bool {
        !matches!(self, Verification::UnknownKey { .. })
    }

    /// The failure this outcome represents, if any.
    pub fn error(&self) -> Option<CoreError> {
        match self {
            Verification::Verified { .. } => None,
            Verification::UnknownKey { kid } => Some(CoreError::UnknownKey(
                kid.as_ref()
                    .map(Kid::to_hex)
                    .unwrap_or_else(|| "no key identifier in envelope".into()),
            )),
            Verification::SignatureInvalid { .. } => Some(CoreError::InvalidSignature),
        }
    }
}

/// A decoded envelope: claims plus the verification outcome.
///
/// A failed verification still carries the claims so callers can tell a
/// forged-but-well-formed token from garbage.
#[derive(Debug, Clone)]
pub struct Opened {
    pub envelope: SignatureEnvelope,
    pub claims: ClaimSet,
    pub verification: Verification,
}

impl Opened {
    /// Claims, only when the signature verified.
    pub fn verified_claims(&self) -> Option<&ClaimSet> {
        self.verification.is_verified().then_some(&self.claims)
    }
}

impl SignatureEnvelope {
    /// Sign `payload` and serialize the envelope.
    pub fn build(payload: &[u8], signer: &Signer) -> Result<Vec<u8>> {
        let protected = Value::Map(vec![
            (int_value(labels::ALG), int_value(signer.algorithm().cose_id())),
            (
                int_value(labels::KID),
                Value::Bytes(signer.kid().as_bytes().to_vec()),
            ),
        ]);
        let protected_bytes = encode_canonical(&protected)?;

        let to_sign = sig_structure(&protected_bytes, payload)?;
        let signature = signer.sign(&to_sign);

        let envelope = Value::Tag(
            COSE_SIGN1_TAG,
            Box::new(Value::Array(vec![
                Value::Bytes(protected_bytes),
                Value::Map(Vec::new()),
                Value::Bytes(payload.to_vec()),
                Value::Bytes(signature),
            ])),
        );

        debug!(kid = %signer.kid(), alg = %signer.algorithm(), "built signed envelope");
        encode_canonical(&envelope)
    }

    /// Parse envelope bytes. Accepts the tagged and untagged forms.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value = decode_value(bytes).map_err(CoreError::MalformedEnvelope)?;

        let value = match value {
            Value::Tag(COSE_SIGN1_TAG, inner) => *inner,
            Value::Tag(tag, _) => {
                return Err(CoreError::MalformedEnvelope(format!(
                    "unexpected CBOR tag {tag}"
                )))
            }
            other => other,
        };

        let items = match value {
            Value::Array(items) if items.len() == 4 => items,
            Value::Array(items) => {
                return Err(CoreError::MalformedEnvelope(format!(
                    "expected 4 elements, got {}",
                    items.len()
                )))
            }
            _ => return Err(CoreError::MalformedEnvelope("top-level item is not an array".into())),
        };

        let mut items = items.into_iter();
        let (protected_bytes, unprotected, payload, signature) =
            match (items.next(), items.next(), items.next(), items.next()) {
                (
                    Some(Value::Bytes(protected)),
                    Some(Value::Map(unprotected)),
                    Some(payload),
                    Some(Value::Bytes(signature)),
                ) => (protected, unprotected, payload, signature),
                _ => {
                    return Err(CoreError::MalformedEnvelope(
                        "envelope elements have the wrong types".into(),
                    ))
                }
            };

        let payload = match payload {
            Value::Bytes(p) => p,
            Value::Null => {
                return Err(CoreError::MalformedEnvelope(
                    "detached payloads are not supported".into(),
                ))
            }
            _ => return Err(CoreError::MalformedEnvelope("payload is not a byte string".into())),
        };

        let protected = if protected_bytes.is_empty() {
            ProtectedHeader::default()
        } else {
            match decode_value(&protected_bytes).map_err(CoreError::MalformedEnvelope)? {
                Value::Map(entries) => parse_header(entries)?,
                _ => {
                    return Err(CoreError::MalformedEnvelope(
                        "protected header is not a map".into(),
                    ))
                }
            }
        };
        let unprotected_kid = parse_header(unprotected)?.kid;

        Ok(Self {
            protected_bytes,
            protected,
            unprotected_kid,
            payload,
            signature,
        })
    }

    /// Parse, resolve the key, verify and decode the claims.
    ///
    /// The entry point for callers holding raw envelope bytes rather than a
    /// text token. Only structural failures are errors; an unknown key or bad
    /// signature is reported through [`Opened::verification`].
    pub fn open(bytes: &[u8], trust: &TrustStore) -> Result<Opened> {
        let envelope = Self::from_bytes(bytes)?;
        let verification = envelope.verify(trust);
        let claims = envelope.claims()?;
        Ok(Opened {
            envelope,
            claims,
            verification,
        })
    }

    /// The KID used for lookup: protected header first, then unprotected.
    pub fn kid(&self) -> Option<&Kid> {
        self.protected.kid.as_ref().or(self.unprotected_kid.as_ref())
    }

    pub fn protected_header(&self) -> &ProtectedHeader {
        &self.protected
    }

    /// The protected header exactly as carried in the envelope.
    pub fn protected_bytes(&self) -> &[u8] {
        &self.protected_bytes
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Decode the payload as a claim set, whether or not it verified.
    pub fn claims(&self) -> Result<ClaimSet> {
        decode_claim_set(&self.payload)
    }

    /// The canonical bytes covered by the signature.
    pub fn signed_bytes(&self) -> Result<Vec<u8>> {
        sig_structure(&self.protected_bytes, &self.payload)
    }

    /// Check the signature against the trust store.
    pub fn verify(&self, trust: &TrustStore) -> Verification {
        let Some(kid) = self.kid() else {
            warn!("envelope carries no key identifier");
            return Verification::UnknownKey { kid: None };
        };

        let Some(entry) = trust.lookup(kid) else {
            warn!(%kid, "key identifier not in trust store");
            return Verification::UnknownKey {
                kid: Some(kid.clone()),
            };
        };

        let algorithm = entry.algorithm();
        if let Some(advertised) = self.protected.alg {
            if advertised != algorithm.cose_id() {
                warn!(
                    %kid,
                    advertised,
                    trusted = %algorithm,
                    "header algorithm disagrees with trust entry; using trust entry"
                );
            }
        }

        let valid = match self.signed_bytes() {
            Ok(message) => entry.key().verify(&message, &self.signature),
            Err(_) => false,
        };

        if valid {
            debug!(%kid, %algorithm, "signature verified");
            Verification::Verified {
                kid: kid.clone(),
                algorithm,
            }
        } else {
            warn!(%kid, %algorithm, "signature verification failed");
            Verification::SignatureInvalid {
                kid: kid.clone(),
                algorithm,
            }
        }
    }
}

/// Build the Sig_structure for a single-signer message.
fn sig_structure(protected_bytes: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    encode_canonical(&Value::Array(vec![
        Value::Text(SIGNATURE1_CONTEXT.to_string()),
        Value::Bytes(protected_bytes.to_vec()),
        Value::Bytes(Vec::new()),
        Value::Bytes(payload.to_vec()),
    ]))
}

fn parse_header(entries: Vec<(Value, Value)>) -> Result<ProtectedHeader> {
    let mut header = ProtectedHeader::default();
    for (label, value) in entries {
        let label = match label {
            Value::Integer(i) => i128::from(i),
            // Text labels are private-use; nothing here depends on them.
            Value::Text(_) => continue,
            _ => return Err(CoreError::MalformedEnvelope("invalid header label".into())),
        };

        if label == labels::ALG as i128 {
            header.alg = match value {
                Value::Integer(i) => Some(i64::try_from(i128::from(i)).map_err(|_| {
                    CoreError::MalformedEnvelope("algorithm id out of range".into())
                })?),
                _ => {
                    return Err(CoreError::MalformedEnvelope(
                        "algorithm header is not an integer".into(),
                    ))
                }
            };
        } else if label == labels::KID as i128 {
            header.kid = match value {
                Value::Bytes(b) => Some(Kid::from_bytes(b)),
                _ => {
                    return Err(CoreError::MalformedEnvelope(
                        "kid header is not a byte string".into(),
                    ))
                }
            };
        }
    }
    Ok(header)
}

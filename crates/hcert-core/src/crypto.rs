//! Cryptographic primitives for hcert.
//!
//! Wraps Ed25519 (ed25519-dalek) and ECDSA P-256 (p256) behind a single
//! [`Signer`] and [`VerificationKey`] pair, keyed by COSE algorithm id.

use std::fmt;

use ed25519_dalek::{Signer as _, Verifier as _};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::Kid;

/// A signature algorithm, identified on the wire by its COSE id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// ECDSA over P-256 with SHA-256 (COSE -7).
    #[serde(rename = "ES256")]
    Es256,
    /// Ed25519 (COSE -8).
    #[serde(rename = "EdDSA")]
    EdDsa,
}

impl Algorithm {
    /// The COSE algorithm identifier.
    pub const fn cose_id(self) -> i64 {
        match self {
            Algorithm::Es256 => -7,
            Algorithm::EdDsa => -8,
        }
    }

    /// Look up an algorithm by COSE id.
    pub fn from_cose_id(id: i64) -> Option<Self> {
        match id {
            -7 => Some(Algorithm::Es256),
            -8 => Some(Algorithm::EdDsa),
            _ => None,
        }
    }

    /// The registered name of the algorithm.
    pub const fn name(self) -> &'static str {
        match self {
            Algorithm::Es256 => "ES256",
            Algorithm::EdDsa => "EdDSA",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A public key bound to exactly one algorithm.
#[derive(Clone, PartialEq, Eq)]
pub enum VerificationKey {
    Es256(p256::ecdsa::VerifyingKey),
    EdDsa(ed25519_dalek::VerifyingKey),
}

impl VerificationKey {
    /// Parse key material for `algorithm`.
    ///
    /// ES256 keys are SEC1 points (compressed or uncompressed); EdDSA keys
    /// are the 32-byte Ed25519 encoding.
    pub fn from_bytes(algorithm: Algorithm, bytes: &[u8]) -> Result<Self> {
        match algorithm {
            Algorithm::Es256 => p256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
                .map(VerificationKey::Es256)
                .map_err(|_| CoreError::InvalidKey("invalid P-256 public key".into())),
            Algorithm::EdDsa => {
                let arr: [u8; 32] = bytes.try_into().map_err(|_| {
                    CoreError::InvalidKey(format!(
                        "Ed25519 public key must be 32 bytes, got {}",
                        bytes.len()
                    ))
                })?;
                ed25519_dalek::VerifyingKey::from_bytes(&arr)
                    .map(VerificationKey::EdDsa)
                    .map_err(|_| CoreError::InvalidKey("invalid Ed25519 public key".into()))
            }
        }
    }

    /// The algorithm this key verifies.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            VerificationKey::Es256(_) => Algorithm::Es256,
            VerificationKey::EdDsa(_) => Algorithm::EdDsa,
        }
    }

    /// Raw key bytes (compressed SEC1 for P-256).
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            VerificationKey::Es256(vk) => vk.to_encoded_point(true).as_bytes().to_vec(),
            VerificationKey::EdDsa(vk) => vk.to_bytes().to_vec(),
        }
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Verify `signature` over `message`. Malformed signatures verify as false.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match self {
            VerificationKey::Es256(vk) => {
                use p256::ecdsa::signature::Verifier as _;
                match p256::ecdsa::Signature::from_slice(signature) {
                    Ok(sig) => vk.verify(message, &sig).is_ok(),
                    Err(_) => false,
                }
            }
            VerificationKey::EdDsa(vk) => match ed25519_dalek::Signature::from_slice(signature) {
                Ok(sig) => vk.verify(message, &sig).is_ok(),
                Err(_) => false,
            },
        }
    }

    /// Derive the default KID for this key.
    ///
    /// First 8 bytes of BLAKE3(alg id as big-endian i16 || key bytes).
    pub fn derive_kid(&self) -> Kid {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.algorithm().cose_id() as i16).to_be_bytes());
        hasher.update(&self.to_bytes());
        Kid::from_bytes(&hasher.finalize().as_bytes()[..Kid::DERIVED_LEN])
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "{}Pub({})", self.algorithm(), &hex[..16.min(hex.len())])
    }
}

#[derive(Clone)]
enum SigningKey {
    Es256(p256::ecdsa::SigningKey),
    EdDsa(ed25519_dalek::SigningKey),
}

/// The active issuing key and its KID.
///
/// Immutable after construction; safe to share across threads.
#[derive(Clone)]
pub struct Signer {
    key: SigningKey,
    kid: Kid,
}

impl Signer {
    /// Generate a new random signer for `algorithm`.
    pub fn generate(algorithm: Algorithm) -> Self {
        let mut rng = rand::thread_rng();
        let key = match algorithm {
            Algorithm::Es256 => SigningKey::Es256(p256::ecdsa::SigningKey::random(&mut rng)),
            Algorithm::EdDsa => SigningKey::EdDsa(ed25519_dalek::SigningKey::generate(&mut rng)),
        };
        Self::with_derived_kid(key)
    }

    /// Create from a 32-byte secret (Ed25519 seed or P-256 scalar).
    pub fn from_seed(algorithm: Algorithm, seed: &[u8; 32]) -> Result<Self> {
        let key = match algorithm {
            Algorithm::Es256 => SigningKey::Es256(
                p256::ecdsa::SigningKey::from_slice(seed)
                    .map_err(|_| CoreError::InvalidKey("invalid P-256 secret scalar".into()))?,
            ),
            Algorithm::EdDsa => SigningKey::EdDsa(ed25519_dalek::SigningKey::from_bytes(seed)),
        };
        Ok(Self::with_derived_kid(key))
    }

    fn with_derived_kid(key: SigningKey) -> Self {
        let mut signer = Self {
            key,
            kid: Kid::from_bytes(Vec::new()),
        };
        signer.kid = signer.verification_key().derive_kid();
        signer
    }

    /// Replace the derived KID with an externally assigned one.
    pub fn with_kid(mut self, kid: Kid) -> Self {
        self.kid = kid;
        self
    }

    pub fn kid(&self) -> &Kid {
        &self.kid
    }

    pub fn algorithm(&self) -> Algorithm {
        match self.key {
            SigningKey::Es256(_) => Algorithm::Es256,
            SigningKey::EdDsa(_) => Algorithm::EdDsa,
        }
    }

    /// The public half of the signing key.
    pub fn verification_key(&self) -> VerificationKey {
        match &self.key {
            SigningKey::Es256(sk) => VerificationKey::Es256(sk.verifying_key().clone()),
            SigningKey::EdDsa(sk) => VerificationKey::EdDsa(sk.verifying_key()),
        }
    }

    /// Sign canonical bytes.
    ///
    /// ES256 yields the 64-byte `r || s` form (RFC 6979 deterministic nonce);
    /// EdDSA yields a 64-byte Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match &self.key {
            SigningKey::Es256(sk) => {
                use p256::ecdsa::signature::Signer as _;
                let sig: p256::ecdsa::Signature = sk.sign(message);
                sig.to_bytes().to_vec()
            }
            SigningKey::EdDsa(sk) => sk.sign(message).to_bytes().to_vec(),
        }
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signer({}, {:?})", self.algorithm(), self.kid)
    }
}

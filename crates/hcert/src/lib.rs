//! # hcert
//!
//! Issue and verify compact, signed health certificate tokens.
//!
//! ## Overview
//!
//! A claim set (issuer, validity window, payload) is encoded as canonical
//! CBOR, signed into a COSE_Sign1 envelope, zlib-compressed, Base45-encoded
//! and prefixed with `HC1:`. Decoding reverses every step and reports the
//! outcome of each one in a [`DecodeResult`].
//!
//! ## Usage
//!
//! ```rust
//! use hcert::{Algorithm, ClaimSet, Payload, Pipeline, Signer, TrustEntry, TrustStore};
//!
//! let signer = Signer::generate(Algorithm::Es256);
//! let trust = TrustStore::from_entries([TrustEntry::for_signer(&signer)]).unwrap();
//! let pipeline = Pipeline::default();
//!
//! let mut payload = Payload::new();
//! payload.insert("name".into(), "A".into());
//! let now = 1_700_000_000;
//! let claims = ClaimSet::new("XY", now, now + 180 * 86_400, payload).unwrap();
//!
//! let token = pipeline.issue(&claims, &signer).unwrap();
//! let result = pipeline.decode_at(&token, &trust, now + 60);
//! assert!(result.is_usable());
//! assert_eq!(result.verified_claims(), Some(&claims));
//! ```
//!
//! ## Re-exports
//!
//! - `hcert::core` - claims, canonical CBOR, envelope, keys, trust store
//! - `hcert::text` - compression, Base45, token prefix

pub mod config;
pub mod error;
pub mod identifier;
pub mod pipeline;
pub mod qr;
pub mod result;

// Re-export component crates
pub use hcert_core as core;
pub use hcert_text as text;

// Re-export main types for convenience
pub use config::{IdentifierConfig, PipelineConfig};
pub use error::{PipelineError, Result};
pub use pipeline::{IssuedCertificate, Pipeline, PublicKeyInfo};
pub use qr::QrRenderer;
pub use result::{DecodeResult, Stage, StageOutcome, StageRecord};

pub use hcert_core::{
    Algorithm, ClaimSchema, ClaimSet, ClaimValue, ErrorKind, Kid, Payload, Signer, TrustEntry,
    TrustStore,
};

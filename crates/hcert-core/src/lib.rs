//! # hcert core
//!
//! Pure primitives for health certificates: the claim model, canonical
//! CBOR, the COSE_Sign1 signed envelope, and the trust store.
//!
//! This crate performs no I/O. Text transport (compression, Base45, the
//! `HC1:` prefix) lives in `hcert-text`; the staged pipeline in `hcert`.
//!
//! ## Key Types
//!
//! - [`ClaimSet`] - Issuer, validity window and payload
//! - [`SignatureEnvelope`] - Signed COSE_Sign1 container
//! - [`Signer`] - The issuing key and its [`Kid`]
//! - [`TrustStore`] - KID to verification key, hot-reloadable
//!
//! ## Canonicalization
//!
//! Claim sets and envelope headers are encoded as deterministic CBOR. See
//! the [`canonical`] module.

pub mod canonical;
pub mod claims;
pub mod crypto;
pub mod diag;
pub mod envelope;
pub mod error;
pub mod trust;
pub mod types;

pub use canonical::{decode_claim_set, encode_canonical, encode_claim_set};
pub use claims::{ClaimSchema, ClaimSet, ClaimValue, Payload};
pub use crypto::{Algorithm, Signer, VerificationKey};
pub use diag::diagnostic;
pub use envelope::{Opened, SignatureEnvelope, Verification};
pub use error::{CoreError, ErrorKind};
pub use trust::{TrustEntry, TrustStore};
pub use types::Kid;

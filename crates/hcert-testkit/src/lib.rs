//! # hcert testkit
//!
//! Testing utilities for hcert.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: canonical claim-set bytes, an Ed25519 envelope and
//!   the RFC 9285 Base45 examples
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs for setting up test scenarios
//!
//! ## Golden Vectors
//!
//! ```rust
//! use hcert_testkit::vectors::verify_all_vectors;
//!
//! for (name, passed, details) in verify_all_vectors() {
//!     assert!(passed, "{name}: {details}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use hcert_testkit::generators::CertificateParams;
//!
//! proptest! {
//!     #[test]
//!     fn issuance_is_deterministic(params: CertificateParams) {
//!         let pipeline = hcert::Pipeline::default();
//!         let t1 = pipeline.issue(&params.claims, &params.signer).unwrap();
//!         let t2 = pipeline.issue(&params.claims, &params.signer).unwrap();
//!         prop_assert_eq!(t1, t2);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use hcert_testkit::fixtures::{TestFixture, REFERENCE_TIME};
//!
//! let fixture = TestFixture::default();
//! let token = fixture.issue(&fixture.claims("A", REFERENCE_TIME, 180));
//! assert!(fixture.decode_at(&token, REFERENCE_TIME).is_usable());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_issuer_fixtures, shared_trust, TestFixture};

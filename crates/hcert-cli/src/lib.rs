//! # hcert-cli
//!
//! Command-line front end for the hcert pipeline.
//!
//! ## Subcommands
//!
//! - `issue` - sign a JSON payload into a token
//! - `decode` - decode a token and print every stage outcome
//! - `dump` - CBOR diagnostic notation for raw bytes or a token's envelope
//! - `public-key` - describe a signing key as a trust list entry
//!
//! Argument parsing lives here; the work is done by the `hcert` crates.

pub mod decode;
pub mod dump;
pub mod issue;
pub mod keys;

//! # hcert text transport
//!
//! Turns signed envelope bytes into QR-friendly text and back:
//!
//! ```text
//! envelope bytes -> zlib -> Base45 -> "HC1:" + text
//! ```
//!
//! Each step is exposed separately so callers can record per-stage results.

pub mod base45;
pub mod compression;
pub mod error;
pub mod prefix;

pub use compression::Zlib;
pub use error::{Result, TextError};
pub use prefix::TokenPrefix;

/// The three text transport steps with fixed settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextCodec {
    pub prefix: TokenPrefix,
    pub zlib: Zlib,
}

impl TextCodec {
    pub fn new(prefix: TokenPrefix, zlib: Zlib) -> Self {
        Self { prefix, zlib }
    }

    /// Compress, Base45-encode and prefix.
    pub fn encode(&self, bytes: &[u8]) -> Result<String> {
        let compressed = self.zlib.compress(bytes)?;
        Ok(self.prefix.attach(&base45::encode(&compressed)))
    }

    /// Reverse [`TextCodec::encode`], stopping at the first failing step.
    pub fn decode(&self, token: &str) -> Result<Vec<u8>> {
        let body = self.prefix.strip(token)?;
        let compressed = base45::decode(body)?;
        self.zlib.decompress(&compressed)
    }
}

//! Strong type definitions for hcert.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A key identifier, carried in the envelope header to select the
/// verification key.
///
/// KIDs are opaque byte strings. Lookup is by exact byte match.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Kid(#[serde(with = "hex")] pub Vec<u8>);

impl Kid {
    /// Length of a derived KID.
    pub const DERIVED_LEN: usize = 8;

    /// Create a KID from raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        Ok(Self(hex::decode(s)?))
    }
}

impl fmt::Debug for Kid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kid({})", self.to_hex())
    }
}

impl fmt::Display for Kid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Kid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Kid {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

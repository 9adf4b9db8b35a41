//! Trust store: KID to verification key.
//!
//! Readers take a snapshot (`Arc` clone) and never block writers for longer
//! than the pointer swap. A reload installs a whole new map at once, so a
//! lookup sees either the old set of keys or the new one, never a mix.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::crypto::{Algorithm, Signer, VerificationKey};
use crate::error::{CoreError, Result};
use crate::types::Kid;

/// A trusted public key, bound to one KID and one algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TrustEntryRecord", into = "TrustEntryRecord")]
pub struct TrustEntry {
    kid: Kid,
    key: VerificationKey,
}

impl TrustEntry {
    pub fn new(kid: Kid, key: VerificationKey) -> Self {
        Self { kid, key }
    }

    /// Entry for a signer's own public key under its KID.
    pub fn for_signer(signer: &Signer) -> Self {
        Self::new(signer.kid().clone(), signer.verification_key())
    }

    /// Parse raw key bytes for `algorithm`.
    pub fn from_key_bytes(kid: Kid, algorithm: Algorithm, key: &[u8]) -> Result<Self> {
        Ok(Self::new(kid, VerificationKey::from_bytes(algorithm, key)?))
    }

    pub fn kid(&self) -> &Kid {
        &self.kid
    }

    /// The algorithm used for verification, regardless of envelope headers.
    pub fn algorithm(&self) -> Algorithm {
        self.key.algorithm()
    }

    pub fn key(&self) -> &VerificationKey {
        &self.key
    }
}

/// Serialized form of a [`TrustEntry`]: hex KID, algorithm name, hex key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustEntryRecord {
    #[serde(with = "hex")]
    pub kid: Vec<u8>,
    pub algorithm: Algorithm,
    #[serde(with = "hex")]
    pub key: Vec<u8>,
}

impl TryFrom<TrustEntryRecord> for TrustEntry {
    type Error = CoreError;

    fn try_from(record: TrustEntryRecord) -> Result<Self> {
        TrustEntry::from_key_bytes(Kid::from_bytes(record.kid), record.algorithm, &record.key)
    }
}

impl From<TrustEntry> for TrustEntryRecord {
    fn from(entry: TrustEntry) -> Self {
        Self {
            kid: entry.kid.0,
            algorithm: entry.key.algorithm(),
            key: entry.key.to_bytes(),
        }
    }
}

type KeyMap = HashMap<Kid, TrustEntry>;

/// Shared, hot-reloadable KID to key mapping.
#[derive(Debug, Default)]
pub struct TrustStore {
    entries: RwLock<Arc<KeyMap>>,
}

impl TrustStore {
    /// Create an empty trust store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from entries. Duplicate KIDs are rejected.
    pub fn from_entries(entries: impl IntoIterator<Item = TrustEntry>) -> Result<Self> {
        Ok(Self {
            entries: RwLock::new(Arc::new(build_map(entries)?)),
        })
    }

    /// Resolve a KID.
    pub fn lookup(&self, kid: &Kid) -> Option<TrustEntry> {
        self.snapshot().get(kid).cloned()
    }

    /// A consistent view of the current entries.
    pub fn snapshot(&self) -> Arc<KeyMap> {
        Arc::clone(&self.entries.read())
    }

    /// Atomically replace every entry.
    ///
    /// On error the current entries stay in place.
    pub fn replace(&self, entries: impl IntoIterator<Item = TrustEntry>) -> Result<()> {
        let map = Arc::new(build_map(entries)?);
        let count = map.len();
        *self.entries.write() = map;
        info!(entries = count, "trust store replaced");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load entries from a JSON array of records.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<TrustEntry> = serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidKey(format!("trust list: {e}")))?;
        Self::from_entries(entries)
    }
}

fn build_map(entries: impl IntoIterator<Item = TrustEntry>) -> Result<KeyMap> {
    let mut map = KeyMap::new();
    for entry in entries {
        if map.contains_key(entry.kid()) {
            return Err(CoreError::InvalidKey(format!(
                "duplicate key identifier {}",
                entry.kid()
            )));
        }
        map.insert(entry.kid().clone(), entry);
    }
    Ok(map)
}

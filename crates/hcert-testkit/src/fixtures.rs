//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use hcert::{DecodeResult, Pipeline};
use hcert_core::{Algorithm, ClaimSet, Payload, Signer, TrustEntry, TrustStore};

/// Fixed reference time for fixtures: 2025-01-01T00:00:00Z.
pub const REFERENCE_TIME: i64 = 1_735_689_600;

/// One issuer: a signer, a trust store that knows it, and a pipeline.
pub struct TestFixture {
    pub signer: Signer,
    pub trust: TrustStore,
    pub pipeline: Pipeline,
}

impl TestFixture {
    /// Create a new test fixture with a random key.
    pub fn new(algorithm: Algorithm) -> Self {
        Self::from_signer(Signer::generate(algorithm))
    }

    /// Create with a deterministic key from seed.
    pub fn with_seed(algorithm: Algorithm, seed: [u8; 32]) -> Self {
        let signer = Signer::from_seed(algorithm, &seed)
            .unwrap_or_else(|e| panic!("fixture seed rejected: {e}"));
        Self::from_signer(signer)
    }

    pub fn from_signer(signer: Signer) -> Self {
        let trust = TrustStore::from_entries([TrustEntry::for_signer(&signer)])
            .unwrap_or_else(|e| panic!("fixture trust store: {e}"));
        Self {
            signer,
            trust,
            pipeline: Pipeline::default(),
        }
    }

    /// A single-field claim set valid from `issued_at` for `days`.
    pub fn claims(&self, name: &str, issued_at: i64, days: i64) -> ClaimSet {
        let mut payload = Payload::new();
        payload.insert("name".into(), name.into());
        ClaimSet::new("XY", issued_at, issued_at + days * 86_400, payload)
            .unwrap_or_else(|e| panic!("fixture claims: {e}"))
    }

    /// Issue a token for `claims` with this fixture's signer.
    pub fn issue(&self, claims: &ClaimSet) -> String {
        self.pipeline
            .issue(claims, &self.signer)
            .unwrap_or_else(|e| panic!("fixture issuance failed: {e}"))
    }

    /// Decode against this fixture's trust store.
    pub fn decode_at(&self, token: &str, now: i64) -> DecodeResult {
        self.pipeline.decode_at(token, &self.trust, now)
    }

    pub fn trust_entry(&self) -> TrustEntry {
        TrustEntry::for_signer(&self.signer)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new(Algorithm::Es256)
    }
}

/// Create multiple issuers, alternating algorithms.
pub fn multi_issuer_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let algorithm = if i % 2 == 0 {
                Algorithm::Es256
            } else {
                Algorithm::EdDsa
            };
            TestFixture::new(algorithm)
        })
        .collect()
}

/// A trust store holding every fixture's key.
pub fn shared_trust(fixtures: &[TestFixture]) -> TrustStore {
    TrustStore::from_entries(fixtures.iter().map(TestFixture::trust_entry))
        .unwrap_or_else(|e| panic!("shared trust store: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_roundtrip() {
        let fixture = TestFixture::default();
        let claims = fixture.claims("A", REFERENCE_TIME, 180);
        let token = fixture.issue(&claims);

        let result = fixture.decode_at(&token, REFERENCE_TIME + 1);
        assert!(result.is_usable());
        assert_eq!(result.verified_claims(), Some(&claims));
    }

    #[test]
    fn test_fixture_seed_is_deterministic() {
        let a = TestFixture::with_seed(Algorithm::EdDsa, [7; 32]);
        let b = TestFixture::with_seed(Algorithm::EdDsa, [7; 32]);
        assert_eq!(a.signer.kid(), b.signer.kid());

        let claims = a.claims("A", REFERENCE_TIME, 1);
        assert_eq!(a.issue(&claims), b.issue(&claims));
    }

    #[test]
    fn test_multi_issuer() {
        let fixtures = multi_issuer_fixtures(4);
        let trust = shared_trust(&fixtures);
        assert_eq!(trust.len(), 4);

        for fixture in &fixtures {
            let token = fixture.issue(&fixture.claims("B", REFERENCE_TIME, 1));
            let result = fixture.pipeline.decode_at(&token, &trust, REFERENCE_TIME);
            assert!(result.is_usable());
            assert_eq!(result.kid(), Some(fixture.signer.kid()));
            assert_eq!(result.algorithm(), Some(fixture.signer.algorithm()));
        }
    }

    #[test]
    fn test_foreign_issuer_unknown() {
        let fixtures = multi_issuer_fixtures(2);
        let token = fixtures[0].issue(&fixtures[0].claims("C", REFERENCE_TIME, 1));
        let result = fixtures[1].decode_at(&token, REFERENCE_TIME);
        assert!(!result.kid_found());
        assert!(result.unverified_claims().is_some());
    }
}

//! Proptest generators for property-based testing.

use proptest::prelude::*;

use hcert_core::{Algorithm, ClaimSet, ClaimValue, Payload, Signer};

/// Generate an algorithm.
pub fn algorithm() -> impl Strategy<Value = Algorithm> {
    prop_oneof![Just(Algorithm::Es256), Just(Algorithm::EdDsa)]
}

/// Generate a signer with a random seed.
///
/// An all-zero seed is not a valid P-256 scalar, so seeds are forced non-zero.
pub fn signer() -> impl Strategy<Value = Signer> {
    (algorithm(), any::<[u8; 32]>()).prop_filter_map("invalid secret", |(alg, mut seed)| {
        seed[0] |= 1;
        Signer::from_seed(alg, &seed).ok()
    })
}

/// Generate a payload field name.
pub fn field_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}".prop_map(String::from)
}

/// Generate a scalar claim value.
pub fn scalar_value() -> impl Strategy<Value = ClaimValue> {
    prop_oneof![
        Just(ClaimValue::Null),
        any::<bool>().prop_map(ClaimValue::Bool),
        any::<i64>().prop_map(ClaimValue::Integer),
        ".{0,24}".prop_map(ClaimValue::Text),
        prop::collection::vec(any::<u8>(), 0..24).prop_map(ClaimValue::Bytes),
    ]
}

/// Generate a claim value nested at most `depth` levels.
pub fn claim_value(depth: u32) -> impl Strategy<Value = ClaimValue> {
    scalar_value().prop_recursive(depth, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(ClaimValue::Array),
            prop::collection::btree_map(field_name(), inner, 0..4).prop_map(ClaimValue::Map),
        ]
    })
}

/// Generate a payload map.
pub fn payload() -> impl Strategy<Value = Payload> {
    prop::collection::btree_map(field_name(), claim_value(3), 0..6)
}

/// Generate a plausible issuance timestamp (1970 to 2100).
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=4_102_444_800
}

/// Generate an issuer country code.
pub fn issuer() -> impl Strategy<Value = String> {
    "[A-Z]{2}".prop_map(String::from)
}

/// Generate a valid claim set.
pub fn claim_set() -> impl Strategy<Value = ClaimSet> {
    (issuer(), timestamp(), 1i64..=3_650 * 86_400, payload()).prop_map(
        |(issuer, issued_at, validity, payload)| {
            ClaimSet::new(issuer, issued_at, issued_at + validity, payload)
                .unwrap_or_else(|e| panic!("generated claims rejected: {e}"))
        },
    )
}

/// Parameters for a full issue/decode run.
#[derive(Debug, Clone)]
pub struct CertificateParams {
    pub signer: Signer,
    pub claims: ClaimSet,
}

impl Arbitrary for CertificateParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (signer(), claim_set())
            .prop_map(|(signer, claims)| CertificateParams { signer, claims })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcert::Pipeline;
    use hcert_core::{decode_claim_set, encode_claim_set, TrustEntry, TrustStore};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_issue_decode_roundtrip(params: CertificateParams) {
            let pipeline = Pipeline::default();
            let trust = TrustStore::from_entries([TrustEntry::for_signer(&params.signer)]).unwrap();

            let token = pipeline.issue(&params.claims, &params.signer).unwrap();
            let result = pipeline.decode_at(&token, &trust, params.claims.issued_at());

            prop_assert!(result.signature_valid());
            prop_assert!(!result.expired());
            prop_assert_eq!(result.verified_claims(), Some(&params.claims));
        }

        #[test]
        fn test_canonical_bytes_deterministic(claims in claim_set()) {
            let b1 = encode_claim_set(&claims).unwrap();
            let b2 = encode_claim_set(&decode_claim_set(&b1).unwrap()).unwrap();
            prop_assert_eq!(b1, b2);
        }

        #[test]
        fn test_token_stays_in_alphabet(params: CertificateParams) {
            let token = Pipeline::default().issue(&params.claims, &params.signer).unwrap();
            prop_assert!(token.starts_with("HC1:"));
            prop_assert!(hcert_text::base45::is_base45_text(&token));
        }

        #[test]
        fn test_unknown_key_keeps_claims(params: CertificateParams, other in signer()) {
            prop_assume!(other.kid() != params.signer.kid());
            let pipeline = Pipeline::default();
            let trust = TrustStore::from_entries([TrustEntry::for_signer(&other)]).unwrap();

            let token = pipeline.issue(&params.claims, &params.signer).unwrap();
            let result = pipeline.decode_at(&token, &trust, params.claims.issued_at());

            prop_assert!(!result.kid_found());
            prop_assert!(!result.signature_valid());
            prop_assert!(result.verified_claims().is_none());
            prop_assert_eq!(result.unverified_claims(), Some(&params.claims));
        }
    }
}

//! Golden test vectors for deterministic verification.
//!
//! These pin the wire format: any change to the claim-set layout, the
//! canonical encoding or the envelope structure breaks them.

use hcert_core::{Algorithm, ClaimSet, ClaimValue, Kid, Payload, Signer};

/// RFC 9285 Base45 examples: (raw bytes, encoded text).
pub const BASE45_VECTORS: &[(&[u8], &str)] = &[
    (b"AB", "BB8"),
    (b"Hello!!", "%69 VD92EX0"),
    (b"base-45", "UJCLQE7W581"),
    (b"ietf!", "QED8WEX0"),
    (b"", ""),
];

/// A claim set with its expected canonical encoding.
#[derive(Debug, Clone)]
pub struct ClaimSetVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub claims: ClaimSet,
    /// Expected canonical CBOR (hex).
    pub expected_hex: &'static str,
}

fn payload(entries: Vec<(&str, ClaimValue)>) -> Payload {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn map(entries: Vec<(&str, ClaimValue)>) -> ClaimValue {
    ClaimValue::Map(payload(entries))
}

/// Get all claim-set vectors.
pub fn claim_set_vectors() -> Vec<ClaimSetVector> {
    let build = |issuer: &str, iat: i64, exp: i64, entries: Vec<(&str, ClaimValue)>| {
        ClaimSet::new(issuer, iat, exp, payload(entries))
            .unwrap_or_else(|e| panic!("invalid vector claims: {e}"))
    };

    vec![
        ClaimSetVector {
            name: "minimal",
            claims: build("XY", 1, 2, vec![("n", "A".into())]),
            expected_hex: "a40162585904020601390103a101a1616e6141",
        },
        ClaimSetVector {
            name: "name valid for 180 days",
            claims: build(
                "XY",
                1_735_689_600,
                1_735_689_600 + 180 * 86_400,
                vec![("name", "A".into())],
            ),
            expected_hex: "a401625859041a6861d380061a67748580390103a101a1646e616d656141",
        },
        ClaimSetVector {
            name: "vaccination record",
            claims: build(
                "DE",
                1_735_689_600,
                1_767_225_600,
                vec![
                    ("ver", "1.3.0".into()),
                    (
                        "nam",
                        map(vec![("fn", "Musterfrau".into()), ("gn", "Erika".into())]),
                    ),
                    ("dob", "1964-08-12".into()),
                    (
                        "v",
                        ClaimValue::Array(vec![map(vec![
                            ("dn", 2i64.into()),
                            ("sd", 2i64.into()),
                        ])]),
                    ),
                ],
            ),
            expected_hex: "a401624445041a6955b900061a67748580390103a101a4617681a262646e026273640263646f626a313936342d30382d3132636e616da262666e6a4d75737465726672617562676e654572696b616376657265312e332e30",
        },
        ClaimSetVector {
            name: "empty payload with extensions",
            claims: build("AT", 0, 1, vec![])
                .with_extension(-70000, ClaimValue::Bool(true))
                .and_then(|c| c.with_extension(7, ClaimValue::Null))
                .unwrap_or_else(|e| panic!("invalid vector extensions: {e}")),
            expected_hex: "a6016241540401060007f6390103a101a03a0001116ff5",
        },
    ]
}

/// A signed envelope with a fixed Ed25519 key and KID.
#[derive(Debug, Clone)]
pub struct EnvelopeVector {
    pub seed: [u8; 32],
    pub kid: &'static [u8],
    /// Canonical claim set (hex), signed as the envelope payload.
    pub payload_hex: &'static str,
    /// Expected Ed25519 public key (hex).
    pub public_key_hex: &'static str,
    /// Expected `Sig_structure` bytes (hex).
    pub signed_hex: &'static str,
    /// Expected envelope bytes (hex).
    pub envelope_hex: &'static str,
}

impl EnvelopeVector {
    pub fn signer(&self) -> Signer {
        Signer::from_seed(Algorithm::EdDsa, &self.seed)
            .unwrap_or_else(|e| panic!("invalid vector seed: {e}"))
            .with_kid(Kid::from_bytes(self.kid))
    }
}

/// Ed25519 is deterministic, so the whole envelope is reproducible.
pub fn envelope_vector() -> EnvelopeVector {
    EnvelopeVector {
        seed: [0x42; 32],
        kid: b"DEMO-KID",
        payload_hex: "a401625859041a6861d380061a67748580390103a101a1646e616d656141",
        public_key_hex: "2152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12",
        signed_hex: "846a5369676e6174757265314da20127044844454d4f2d4b494440581ea401625859041a6861d380061a67748580390103a101a1646e616d656141",
        envelope_hex: "d2844da20127044844454d4f2d4b4944a0581ea401625859041a6861d380061a67748580390103a101a1646e616d6561415840262c689a365b2afcb3aa4a5b0cdda48b34bb721f8c3547f999c675e429bd80dd4552a78060ca1d93c3310e99f06451a83f474aef3460625c15330f9e551bb808",
    }
}

/// Check every vector, returning (name, passed, details).
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let mut results = Vec::new();

    for vector in claim_set_vectors() {
        let (passed, details) = match hcert_core::encode_claim_set(&vector.claims) {
            Ok(bytes) => {
                let actual = hex::encode(bytes);
                (actual == vector.expected_hex, actual)
            }
            Err(e) => (false, e.to_string()),
        };
        results.push((vector.name.to_string(), passed, details));
    }

    for (raw, text) in BASE45_VECTORS {
        let actual = hcert_text::base45::encode(raw);
        results.push((format!("base45 {text:?}"), actual == *text, actual));
    }

    results
}

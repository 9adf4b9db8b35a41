//! Claim model: the time-bounded, issuer-attributed claim set.
//!
//! A [`ClaimSet`] is created once at issuance and never edited. Decoding
//! produces a fresh value; nothing is shared with the issuing side.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Maximum nesting depth accepted for claim values, on decode and from JSON.
pub const MAX_CLAIM_DEPTH: usize = 32;

/// Top-level claim keys reserved by the claim-set layout.
pub const RESERVED_CLAIM_KEYS: [i64; 4] = [1, 4, 6, -260];

/// The certificate payload: a map with text keys.
pub type Payload = BTreeMap<String, ClaimValue>;

/// A single claim value.
///
/// Floats are deliberately absent: every numeric claim (including
/// timestamps) is an integer so the binary encoding stays deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ClaimValue {
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
    Bytes(#[serde(with = "hex")] Vec<u8>),
    Array(Vec<ClaimValue>),
    Map(BTreeMap<String, ClaimValue>),
}

impl ClaimValue {
    /// Get the text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ClaimValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer content, if this is an integer value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ClaimValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Nesting depth (scalars are depth 0).
    pub fn depth(&self) -> usize {
        match self {
            ClaimValue::Array(items) => 1 + items.iter().map(Self::depth).max().unwrap_or(0),
            ClaimValue::Map(entries) => 1 + entries.values().map(Self::depth).max().unwrap_or(0),
            _ => 0,
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(s: &str) -> Self {
        ClaimValue::Text(s.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(s: String) -> Self {
        ClaimValue::Text(s)
    }
}

impl From<i64> for ClaimValue {
    fn from(n: i64) -> Self {
        ClaimValue::Integer(n)
    }
}

impl From<bool> for ClaimValue {
    fn from(b: bool) -> Self {
        ClaimValue::Bool(b)
    }
}

/// The signed claim set: issuer, validity window and payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimSet {
    issuer: String,
    issued_at: i64,
    expires_at: i64,
    payload: Payload,
    /// Unknown integer-keyed top-level claims, preserved verbatim.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    extensions: BTreeMap<i64, ClaimValue>,
}

impl ClaimSet {
    /// Create a claim set. Timestamps are seconds since the Unix epoch.
    ///
    /// Fails with `SchemaViolation` unless `issued_at < expires_at`.
    pub fn new(
        issuer: impl Into<String>,
        issued_at: i64,
        expires_at: i64,
        payload: Payload,
    ) -> Result<Self> {
        if issued_at >= expires_at {
            return Err(CoreError::SchemaViolation(format!(
                "issuedAt ({issued_at}) must precede expiresAt ({expires_at})"
            )));
        }
        for value in payload.values() {
            check_depth(value)?;
        }
        Ok(Self::from_parts(
            issuer.into(),
            issued_at,
            expires_at,
            payload,
            BTreeMap::new(),
        ))
    }

    /// Assemble a claim set without checking the validity window.
    ///
    /// Used by the decoder: staleness and ordering are judged by the pipeline.
    pub(crate) fn from_parts(
        issuer: String,
        issued_at: i64,
        expires_at: i64,
        payload: Payload,
        extensions: BTreeMap<i64, ClaimValue>,
    ) -> Self {
        Self {
            issuer,
            issued_at,
            expires_at,
            payload,
            extensions,
        }
    }

    /// Attach an extra top-level claim under an unreserved integer key.
    pub fn with_extension(mut self, key: i64, value: ClaimValue) -> Result<Self> {
        if RESERVED_CLAIM_KEYS.contains(&key) {
            return Err(CoreError::SchemaViolation(format!(
                "claim key {key} is reserved"
            )));
        }
        check_depth(&value)?;
        self.extensions.insert(key, value);
        Ok(self)
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn extensions(&self) -> &BTreeMap<i64, ClaimValue> {
        &self.extensions
    }

    /// Whether the claim set has expired at `now` (`expiresAt <= now`).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    /// Whether the claim set is not yet valid at `now` (`now < issuedAt`).
    pub fn is_premature_at(&self, now: i64) -> bool {
        now < self.issued_at
    }
}

/// Structural rules applied to an untyped JSON payload before issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimSchema {
    /// Top-level payload fields that must be present.
    pub required: Vec<String>,
    /// Maximum nesting depth of any payload value.
    pub max_depth: usize,
}

impl Default for ClaimSchema {
    fn default() -> Self {
        Self {
            required: Vec::new(),
            max_depth: 16,
        }
    }
}

impl ClaimSchema {
    /// Validate a JSON payload and convert it into a typed [`Payload`].
    pub fn parse(&self, json: &serde_json::Value) -> Result<Payload> {
        let object = json.as_object().ok_or_else(|| {
            CoreError::SchemaViolation("payload must be a JSON object".into())
        })?;

        for field in &self.required {
            if !object.contains_key(field) {
                return Err(CoreError::SchemaViolation(format!(
                    "missing required field '{field}'"
                )));
            }
        }

        let max_depth = self.max_depth.min(MAX_CLAIM_DEPTH);
        let mut payload = Payload::new();
        for (key, value) in object {
            let converted = json_to_claim_value(value, 1, max_depth)
                .map_err(|msg| CoreError::SchemaViolation(format!("field '{key}': {msg}")))?;
            payload.insert(key.clone(), converted);
        }
        Ok(payload)
    }
}

fn json_to_claim_value(
    value: &serde_json::Value,
    depth: usize,
    max_depth: usize,
) -> std::result::Result<ClaimValue, String> {
    use serde_json::Value as Json;

    let nested = |depth: usize| {
        if depth > max_depth {
            Err(format!("nesting depth exceeds {max_depth}"))
        } else {
            Ok(())
        }
    };

    match value {
        Json::Null => Ok(ClaimValue::Null),
        Json::Bool(b) => Ok(ClaimValue::Bool(*b)),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Ok(ClaimValue::Integer(i)),
            None if n.is_u64() => Err(format!("integer {n} out of range")),
            None => Err(format!("non-integer number {n} not permitted")),
        },
        Json::String(s) => Ok(ClaimValue::Text(s.clone())),
        Json::Array(items) => {
            nested(depth)?;
            items
                .iter()
                .map(|item| json_to_claim_value(item, depth + 1, max_depth))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(ClaimValue::Array)
        }
        Json::Object(entries) => {
            nested(depth)?;
            entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), json_to_claim_value(v, depth + 1, max_depth)?)))
                .collect::<std::result::Result<BTreeMap<_, _>, String>>()
                .map(ClaimValue::Map)
        }
    }
}

/// Claim values nest at most [`MAX_CLAIM_DEPTH`] containers deep, so that
/// anything that can be built can also be decoded.
fn check_depth(value: &ClaimValue) -> Result<()> {
    let depth = value.depth();
    if depth > MAX_CLAIM_DEPTH {
        return Err(CoreError::SchemaViolation(format!(
            "claim nesting depth {depth} exceeds {MAX_CLAIM_DEPTH}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload_with_name() -> Payload {
        let mut payload = Payload::new();
        payload.insert("name".into(), "A".into());
        payload
    }

    #[test]
    fn test_new_rejects_inverted_window() {
        let result = ClaimSet::new("XY", 100, 100, payload_with_name());
        assert!(matches!(result, Err(CoreError::SchemaViolation(_))));

        let result = ClaimSet::new("XY", 200, 100, payload_with_name());
        assert!(matches!(result, Err(CoreError::SchemaViolation(_))));
    }

    #[test]
    fn test_validity_checks() {
        let claims = ClaimSet::new("XY", 100, 200, payload_with_name()).unwrap();
        assert!(claims.is_premature_at(99));
        assert!(!claims.is_premature_at(100));
        assert!(!claims.is_expired_at(199));
        assert!(claims.is_expired_at(200));
    }

    #[test]
    fn test_reserved_extension_key_rejected() {
        let claims = ClaimSet::new("XY", 100, 200, payload_with_name()).unwrap();
        assert!(claims.clone().with_extension(-260, ClaimValue::Null).is_err());
        let claims = claims.with_extension(-70000, ClaimValue::Integer(7)).unwrap();
        assert_eq!(claims.extensions().get(&-70000), Some(&ClaimValue::Integer(7)));
    }

    #[test]
    fn test_schema_parses_nested_payload() {
        let schema = ClaimSchema {
            required: vec!["nam".into()],
            ..ClaimSchema::default()
        };
        let payload = schema
            .parse(&json!({
                "ver": "1.3.0",
                "nam": { "fn": "Musterfrau", "gn": "Erika" },
                "v": [{ "dn": 2, "sd": 2 }],
                "flag": true,
                "none": null,
            }))
            .unwrap();

        assert_eq!(payload["ver"], ClaimValue::Text("1.3.0".into()));
        assert_eq!(payload["flag"], ClaimValue::Bool(true));
        assert_eq!(payload["none"], ClaimValue::Null);
        match &payload["v"] {
            ClaimValue::Array(items) => assert_eq!(items.len(), 1),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn test_schema_rejects_missing_required_field() {
        let schema = ClaimSchema {
            required: vec!["nam".into()],
            ..ClaimSchema::default()
        };
        let result = schema.parse(&json!({ "ver": "1.3.0" }));
        assert!(matches!(result, Err(CoreError::SchemaViolation(_))));
    }

    #[test]
    fn test_schema_rejects_non_object() {
        let schema = ClaimSchema::default();
        assert!(schema.parse(&json!(["a"])).is_err());
        assert!(schema.parse(&json!("a")).is_err());
    }

    #[test]
    fn test_schema_rejects_floats_and_huge_integers() {
        let schema = ClaimSchema::default();
        assert!(schema.parse(&json!({ "dose": 1.5 })).is_err());
        assert!(schema.parse(&json!({ "n": u64::MAX })).is_err());
        assert!(schema.parse(&json!({ "n": -5 })).is_ok());
    }

    #[test]
    fn test_schema_enforces_depth() {
        let schema = ClaimSchema {
            required: vec![],
            max_depth: 2,
        };
        assert!(schema.parse(&json!({ "a": { "b": 1 } })).is_ok());
        assert!(schema.parse(&json!({ "a": { "b": [1] } })).is_ok());
        assert!(schema.parse(&json!({ "a": { "b": [[1]] } })).is_err());
    }

    #[test]
    fn test_claim_set_serializes_to_json() {
        let claims = ClaimSet::new("XY", 1, 2, payload_with_name()).unwrap();
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["issuer"], "XY");
        assert_eq!(json["payload"]["name"], "A");
        assert!(json.get("extensions").is_none());
    }
}

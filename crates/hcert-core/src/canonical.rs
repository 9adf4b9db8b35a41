//! Canonical CBOR encoding for deterministic serialization.
//!
//! This module implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (timestamps are i64 seconds)
//!
//! The same claim set always produces identical bytes, which is what gets
//! signed. The decoder is strict about structure but accepts any valid CBOR
//! encoding of it; signatures are checked over the bytes as received.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;

use ciborium::value::Value;

use crate::claims::{ClaimSet, ClaimValue, Payload, MAX_CLAIM_DEPTH};
use crate::error::{CoreError, Result};

/// Claim-set map keys (CWT layout).
mod keys {
    pub const ISSUER: i64 = 1;
    pub const EXPIRES_AT: i64 = 4;
    pub const ISSUED_AT: i64 = 6;
    pub const HCERT: i64 = -260;
    /// Key of the payload inside the `HCERT` container.
    pub const HCERT_PAYLOAD: i64 = 1;
}

/// Encode a claim set to canonical CBOR bytes.
pub fn encode_claim_set(claims: &ClaimSet) -> Result<Vec<u8>> {
    encode_canonical(&claim_set_to_cbor_value(claims))
}

/// Decode a claim set from CBOR bytes.
///
/// Unknown integer top-level keys are kept in [`ClaimSet::extensions`];
/// anything else outside the layout is rejected.
pub fn decode_claim_set(bytes: &[u8]) -> Result<ClaimSet> {
    let value = decode_value(bytes).map_err(CoreError::MalformedPayload)?;
    cbor_value_to_claim_set(value)
}

/// Encode a CBOR Value to canonical bytes.
pub fn encode_canonical(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

/// Parse exactly one CBOR item from `bytes`.
///
/// Truncated input and trailing bytes are both errors.
pub fn decode_value(bytes: &[u8]) -> std::result::Result<Value, String> {
    if bytes.is_empty() {
        return Err("empty input".into());
    }
    let mut cursor = Cursor::new(bytes);
    let value: Value = ciborium::from_reader(&mut cursor).map_err(|e| e.to_string())?;
    let consumed = cursor.position() as usize;
    if consumed != bytes.len() {
        return Err(format!(
            "{} trailing bytes after CBOR item",
            bytes.len() - consumed
        ));
    }
    Ok(value)
}

pub(crate) fn int_value(n: i64) -> Value {
    Value::Integer(n.into())
}

/// Convert a claim set to a CBOR Value (map with integer keys).
fn claim_set_to_cbor_value(claims: &ClaimSet) -> Value {
    let mut entries = Vec::with_capacity(4 + claims.extensions().len());

    entries.push((
        int_value(keys::ISSUER),
        Value::Text(claims.issuer().to_string()),
    ));
    entries.push((int_value(keys::EXPIRES_AT), int_value(claims.expires_at())));
    entries.push((int_value(keys::ISSUED_AT), int_value(claims.issued_at())));

    let payload = Value::Map(
        claims
            .payload()
            .iter()
            .map(|(k, v)| (Value::Text(k.clone()), claim_value_to_cbor(v)))
            .collect(),
    );
    entries.push((
        int_value(keys::HCERT),
        Value::Map(vec![(int_value(keys::HCERT_PAYLOAD), payload)]),
    ));

    for (key, value) in claims.extensions() {
        entries.push((int_value(*key), claim_value_to_cbor(value)));
    }

    Value::Map(entries)
}

fn claim_value_to_cbor(value: &ClaimValue) -> Value {
    match value {
        ClaimValue::Null => Value::Null,
        ClaimValue::Bool(b) => Value::Bool(*b),
        ClaimValue::Integer(n) => int_value(*n),
        ClaimValue::Text(s) => Value::Text(s.clone()),
        ClaimValue::Bytes(b) => Value::Bytes(b.clone()),
        ClaimValue::Array(items) => Value::Array(items.iter().map(claim_value_to_cbor).collect()),
        ClaimValue::Map(entries) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| (Value::Text(k.clone()), claim_value_to_cbor(v)))
                .collect(),
        ),
    }
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr)?,
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Tag(tag, inner) => {
            encode_uint(buf, 6, *tag);
            encode_value_to(buf, inner)?;
        }
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => {
            return Err(CoreError::EncodingError(
                "floats not supported in canonical encoding".into(),
            ))
        }
        _ => {
            return Err(CoreError::EncodingError(
                "unsupported CBOR value type".into(),
            ))
        }
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode an array (major type 4).
fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) -> Result<()> {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item)?;
    }
    Ok(())
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison. Duplicate keys are an error.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<()> {
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        key_value_pairs.push((key_buf, v));
    }

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    if key_value_pairs.windows(2).any(|w| w[0].0 == w[1].0) {
        return Err(CoreError::EncodingError("duplicate map key".into()));
    }

    encode_uint(buf, 5, key_value_pairs.len() as u64);

    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

/// Convert a CBOR Value (map) back to a ClaimSet.
fn cbor_value_to_claim_set(value: Value) -> Result<ClaimSet> {
    let entries = match value {
        Value::Map(m) => m,
        _ => return Err(CoreError::MalformedPayload("claim set is not a map".into())),
    };

    let mut seen = BTreeSet::new();
    let mut issuer = None;
    let mut expires_at = None;
    let mut issued_at = None;
    let mut payload = None;
    let mut extensions = BTreeMap::new();

    for (key, value) in entries {
        let key = match key {
            Value::Integer(i) => i64::try_from(i128::from(i))
                .map_err(|_| CoreError::MalformedPayload("claim key out of range".into()))?,
            _ => {
                return Err(CoreError::MalformedPayload(
                    "claim keys must be integers".into(),
                ))
            }
        };
        if !seen.insert(key) {
            return Err(CoreError::MalformedPayload(format!(
                "duplicate claim key {key}"
            )));
        }

        match key {
            keys::ISSUER => issuer = Some(expect_text(value, "issuer")?),
            keys::EXPIRES_AT => expires_at = Some(expect_int(value, "expiresAt")?),
            keys::ISSUED_AT => issued_at = Some(expect_int(value, "issuedAt")?),
            keys::HCERT => payload = Some(decode_hcert_container(value)?),
            other => {
                extensions.insert(other, cbor_to_claim_value(value, 0)?);
            }
        }
    }

    let missing = |name: &str, key: i64| {
        CoreError::SchemaViolation(format!("missing {name} claim ({key})"))
    };
    let issuer = issuer.ok_or_else(|| missing("issuer", keys::ISSUER))?;
    let expires_at = expires_at.ok_or_else(|| missing("expiresAt", keys::EXPIRES_AT))?;
    let issued_at = issued_at.ok_or_else(|| missing("issuedAt", keys::ISSUED_AT))?;
    let payload = payload.ok_or_else(|| missing("health certificate", keys::HCERT))?;

    Ok(ClaimSet::from_parts(
        issuer, issued_at, expires_at, payload, extensions,
    ))
}

fn decode_hcert_container(value: Value) -> Result<Payload> {
    let entries = match value {
        Value::Map(m) => m,
        _ => {
            return Err(CoreError::MalformedPayload(
                "health certificate container is not a map".into(),
            ))
        }
    };

    let mut entries = entries.into_iter();
    let payload = match (entries.next(), entries.next()) {
        (Some((Value::Integer(k), v)), None) if i128::from(k) == keys::HCERT_PAYLOAD as i128 => v,
        (None, _) => {
            return Err(CoreError::SchemaViolation(
                "health certificate container is empty".into(),
            ))
        }
        _ => {
            return Err(CoreError::MalformedPayload(
                "health certificate container must hold exactly key 1".into(),
            ))
        }
    };

    // Payload values count depth the same way ClaimValue::depth does.
    match payload {
        Value::Map(entries) => cbor_to_claim_map(entries, 0),
        _ => Err(CoreError::MalformedPayload("payload is not a map".into())),
    }
}

fn expect_text(value: Value, name: &str) -> Result<String> {
    match value {
        Value::Text(s) => Ok(s),
        _ => Err(CoreError::MalformedPayload(format!("{name} must be text"))),
    }
}

fn expect_int(value: Value, name: &str) -> Result<i64> {
    match value {
        Value::Integer(i) => i64::try_from(i128::from(i))
            .map_err(|_| CoreError::MalformedPayload(format!("{name} out of range"))),
        _ => Err(CoreError::MalformedPayload(format!(
            "{name} must be an integer"
        ))),
    }
}

fn cbor_to_claim_value(value: Value, depth: usize) -> Result<ClaimValue> {
    if depth > MAX_CLAIM_DEPTH {
        return Err(CoreError::MalformedPayload("claims nested too deeply".into()));
    }

    match value {
        Value::Null => Ok(ClaimValue::Null),
        Value::Bool(b) => Ok(ClaimValue::Bool(b)),
        Value::Integer(i) => i64::try_from(i128::from(i))
            .map(ClaimValue::Integer)
            .map_err(|_| CoreError::MalformedPayload("integer claim out of range".into())),
        Value::Text(s) => Ok(ClaimValue::Text(s)),
        Value::Bytes(b) => Ok(ClaimValue::Bytes(b)),
        Value::Array(items) => items
            .into_iter()
            .map(|item| cbor_to_claim_value(item, depth + 1))
            .collect::<Result<Vec<_>>>()
            .map(ClaimValue::Array),
        Value::Map(entries) => cbor_to_claim_map(entries, depth + 1).map(ClaimValue::Map),
        Value::Float(_) => Err(CoreError::MalformedPayload(
            "floating point claims are not permitted".into(),
        )),
        Value::Tag(tag, _) => Err(CoreError::MalformedPayload(format!(
            "tagged claim values are not permitted (tag {tag})"
        ))),
        _ => Err(CoreError::MalformedPayload(
            "unsupported CBOR claim value".into(),
        )),
    }
}

/// Convert a text-keyed map whose values sit at `value_depth`.
fn cbor_to_claim_map(
    entries: Vec<(Value, Value)>,
    value_depth: usize,
) -> Result<BTreeMap<String, ClaimValue>> {
    let mut map = BTreeMap::new();
    for (k, v) in entries {
        let key = match k {
            Value::Text(s) => s,
            _ => {
                return Err(CoreError::MalformedPayload(
                    "payload map keys must be text".into(),
                ))
            }
        };
        if map.contains_key(&key) {
            return Err(CoreError::MalformedPayload(format!(
                "duplicate payload key '{key}'"
            )));
        }
        let v = cbor_to_claim_value(v, value_depth)?;
        map.insert(key, v);
    }
    Ok(map)
}

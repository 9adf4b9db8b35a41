//! CBOR diagnostic notation (RFC 8949 §8) for inspecting certificates.
//!
//! Byte strings that themselves hold a single well-formed CBOR item (the
//! envelope's protected header and payload) are shown with the embedded
//! item as `<<...>>`, up to [`MAX_EMBED_DEPTH`] levels; deeper ones stay hex.

use std::fmt::Write as _;

use ciborium::value::Value;

use crate::canonical::decode_value;
use crate::error::{CoreError, Result};

/// How many byte-string layers are expanded as embedded CBOR.
pub const MAX_EMBED_DEPTH: usize = 8;

/// Render `bytes` as diagnostic notation.
pub fn diagnostic(bytes: &[u8]) -> Result<String> {
    let value = decode_value(bytes).map_err(CoreError::MalformedPayload)?;
    Ok(diagnostic_value(&value))
}

/// Render a decoded value as diagnostic notation.
pub fn diagnostic_value(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, MAX_EMBED_DEPTH);
    out
}

fn write_value(out: &mut String, value: &Value, embed_budget: usize) {
    match value {
        Value::Integer(i) => {
            let _ = write!(out, "{}", i128::from(*i));
        }
        Value::Bytes(b) => match embedded(b, embed_budget) {
            Some(inner) => {
                out.push_str("<<");
                write_value(out, &inner, embed_budget - 1);
                out.push_str(">>");
            }
            None => {
                let _ = write!(out, "h'{}'", hex::encode(b));
            }
        },
        Value::Float(f) => {
            let _ = write!(out, "{f:?}");
        }
        Value::Text(s) => {
            let _ = write!(out, "{s:?}");
        }
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Null => out.push_str("null"),
        Value::Tag(tag, inner) => {
            let _ = write!(out, "{tag}(");
            write_value(out, inner, embed_budget);
            out.push(')');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item, embed_budget);
            }
            out.push(']');
        }
        Value::Map(entries) => {
            out.push('{');
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, k, embed_budget);
                out.push_str(": ");
                write_value(out, v, embed_budget);
            }
            out.push('}');
        }
        _ => out.push_str("undefined"),
    }
}

fn embedded(bytes: &[u8], embed_budget: usize) -> Option<Value> {
    if embed_budget == 0 {
        return None;
    }
    match decode_value(bytes) {
        Ok(inner @ (Value::Map(_) | Value::Array(_) | Value::Tag(..))) => Some(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::encode_claim_set;
    use crate::claims::{ClaimSet, Payload};

    #[test]
    fn test_claim_set_diagnostic() {
        let mut payload = Payload::new();
        payload.insert("n".into(), "A".into());
        let claims = ClaimSet::new("XY", 1, 2, payload).unwrap();
        let bytes = encode_claim_set(&claims).unwrap();

        assert_eq!(
            diagnostic(&bytes).unwrap(),
            r#"{1: "XY", 4: 2, 6: 1, -260: {1: {"n": "A"}}}"#
        );
    }

    #[test]
    fn test_embedded_cbor_shown_inline() {
        let value = Value::Array(vec![
            Value::Bytes(vec![0xa1, 0x01, 0x26]),
            Value::Bytes(vec![0xde, 0xad]),
            Value::Tag(18, Box::new(Value::Null)),
        ]);
        assert_eq!(diagnostic_value(&value), "[<<{1: -7}>>, h'dead', 18(null)]");
    }

    #[test]
    fn test_nested_byte_strings_stop_expanding() {
        // [h'[h'[h'...']']'] nested far past the expansion limit.
        let mut bytes = vec![0x80];
        for _ in 0..2_000 {
            let mut wrapped = vec![0x81];
            wrapped.extend(bstr_header(bytes.len()));
            wrapped.extend_from_slice(&bytes);
            bytes = wrapped;
        }

        let out = diagnostic(&bytes).unwrap();
        assert_eq!(out.matches("<<").count(), MAX_EMBED_DEPTH);
        assert!(out.contains("h'"));
    }

    fn bstr_header(len: usize) -> Vec<u8> {
        let len = len as u64;
        match len {
            0..=23 => vec![0x40 | len as u8],
            24..=0xff => vec![0x58, len as u8],
            0x100..=0xffff => {
                let mut h = vec![0x59];
                h.extend_from_slice(&(len as u16).to_be_bytes());
                h
            }
            _ => {
                let mut h = vec![0x5a];
                h.extend_from_slice(&(len as u32).to_be_bytes());
                h
            }
        }
    }

    #[test]
    fn test_malformed_input() {
        assert!(diagnostic(&[0xa1]).is_err());
    }
}

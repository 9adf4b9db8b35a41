//! Base45 (RFC 9285): bytes to QR alphanumeric-mode text.
//!
//! Every two bytes become three characters, little-end first; a trailing
//! single byte becomes two characters.

use crate::error::{Result, TextError};

/// The 45-character alphabet, in value order.
pub const ALPHABET: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

const BASE: u32 = 45;
const BASE_SQ: u32 = BASE * BASE;

/// Encode bytes as Base45 text.
pub fn encode(input: &[u8]) -> String {
    let mut out = String::with_capacity(input.len().div_ceil(2) * 3);
    let mut chunks = input.chunks_exact(2);
    for pair in &mut chunks {
        let n = (u32::from(pair[0]) << 8) | u32::from(pair[1]);
        push_digits(&mut out, n, 3);
    }
    if let [last] = chunks.remainder() {
        push_digits(&mut out, u32::from(*last), 2);
    }
    out
}

fn push_digits(out: &mut String, mut n: u32, count: usize) {
    for _ in 0..count {
        out.push(char::from(ALPHABET[(n % BASE) as usize]));
        n /= BASE;
    }
}

/// Decode Base45 text.
///
/// Fails on characters outside [`ALPHABET`], on groups whose value does not
/// fit the byte count they stand for, and on a dangling single character.
pub fn decode(input: &str) -> Result<Vec<u8>> {
    let digits = input
        .chars()
        .enumerate()
        .map(|(position, character)| {
            digit_value(character).ok_or(TextError::InvalidCharacter {
                character,
                position,
            })
        })
        .collect::<Result<Vec<u32>>>()?;

    if digits.len() % 3 == 1 {
        return Err(TextError::InvalidLength(digits.len()));
    }

    let mut out = Vec::with_capacity(digits.len() / 3 * 2 + 1);
    for (i, group) in digits.chunks(3).enumerate() {
        let position = i * 3;
        match *group {
            [c, d, e] => {
                let value = c + d * BASE + e * BASE_SQ;
                if value > 0xffff {
                    return Err(TextError::GroupOverflow { position, value });
                }
                out.extend_from_slice(&(value as u16).to_be_bytes());
            }
            [c, d] => {
                let value = c + d * BASE;
                if value > 0xff {
                    return Err(TextError::GroupOverflow { position, value });
                }
                out.push(value as u8);
            }
            _ => return Err(TextError::InvalidLength(digits.len())),
        }
    }
    Ok(out)
}

fn digit_value(c: char) -> Option<u32> {
    let byte = u8::try_from(c).ok()?;
    ALPHABET.iter().position(|&a| a == byte).map(|p| p as u32)
}

/// Whether every character of `text` is in the Base45 alphabet.
pub fn is_base45_text(text: &str) -> bool {
    text.chars().all(|c| digit_value(c).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rfc_vectors() {
        let vectors: [(&[u8], &str); 5] = [
            (b"AB", "BB8"),
            (b"Hello!!", "%69 VD92EX0"),
            (b"base-45", "UJCLQE7W581"),
            (b"ietf!", "QED8WEX0"),
            (b"", ""),
        ];
        for (raw, text) in vectors {
            assert_eq!(encode(raw), text);
            assert_eq!(decode(text).unwrap(), raw);
        }
    }

    #[test]
    fn test_invalid_character() {
        match decode("QED8wEX0") {
            Err(TextError::InvalidCharacter {
                character,
                position,
            }) => {
                assert_eq!(character, 'w');
                assert_eq!(position, 4);
            }
            other => panic!("expected invalid character, got {other:?}"),
        }
        assert!(decode("BB8\u{e9}").is_err());
    }

    #[test]
    fn test_group_overflow() {
        // ":::" = 44 + 44*45 + 44*2025 = 91124 > 65535
        assert!(matches!(
            decode(":::"),
            Err(TextError::GroupOverflow { position: 0, .. })
        ));
        // "::" = 44 + 44*45 = 2024 > 255
        assert!(matches!(
            decode("BB8::"),
            Err(TextError::GroupOverflow { position: 3, .. })
        ));
        // Largest valid values.
        assert_eq!(decode("FGW").unwrap(), vec![0xff, 0xff]);
        assert_eq!(decode("U5").unwrap(), vec![0xff]);
    }

    #[test]
    fn test_dangling_character() {
        assert!(matches!(decode("BB8B"), Err(TextError::InvalidLength(4))));
        assert!(matches!(decode("B"), Err(TextError::InvalidLength(1))));
    }

    proptest! {
        #[test]
        fn encoded_text_stays_in_alphabet(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let text = encode(&bytes);
            prop_assert!(is_base45_text(&text));
            prop_assert_eq!(text.len(), bytes.len() / 2 * 3 + bytes.len() % 2 * 2);
            prop_assert_eq!(decode(&text).unwrap(), bytes);
        }
    }
}

//! Unique vaccination certificate identifiers (UVCI).
//!
//! `URN:UVCI:01:<country>:<32 uppercase hex>#<check>`, where the check
//! character is Luhn mod N over [`CHECK_ALPHABET`] computed on everything
//! before the `#`.

use rand::RngCore;

use crate::error::{PipelineError, Result};

/// Scheme and version that open every identifier.
pub const UVCI_PREFIX: &str = "URN:UVCI:01";

/// Characters the check character is computed over, in value order.
pub const CHECK_ALPHABET: &[u8; 38] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ/:";

const OPAQUE_LEN: usize = 16;

/// Generate a random identifier for `country`.
pub fn generate(country: &str) -> Result<String> {
    let mut opaque = [0u8; OPAQUE_LEN];
    rand::thread_rng().fill_bytes(&mut opaque);
    generate_with(country, &opaque)
}

/// Build the identifier for `country` around fixed opaque bytes.
pub fn generate_with(country: &str, opaque: &[u8; OPAQUE_LEN]) -> Result<String> {
    check_country(country).map_err(|_| {
        PipelineError::Identifier(format!("country code {country:?} is not two letters"))
    })?;
    let body = format!("{UVCI_PREFIX}:{country}:{}", hex::encode_upper(opaque));
    let check = check_character(&body)
        .ok_or_else(|| PipelineError::Identifier(format!("cannot checksum {body:?}")))?;
    Ok(format!("{body}#{check}"))
}

/// Verify structure and check character.
pub fn validate(identifier: &str) -> Result<()> {
    let invalid = |msg: &str| PipelineError::Identifier(format!("{identifier:?}: {msg}"));

    let (body, check) = identifier
        .rsplit_once('#')
        .ok_or_else(|| invalid("missing check character"))?;

    let rest = body
        .strip_prefix(UVCI_PREFIX)
        .and_then(|r| r.strip_prefix(':'))
        .ok_or_else(|| invalid("unknown scheme"))?;
    let (country, opaque) = rest
        .split_once(':')
        .ok_or_else(|| invalid("missing country"))?;
    if check_country(country).is_err() {
        return Err(invalid("bad country code"));
    }
    if opaque.is_empty() || opaque.bytes().any(|b| !CHECK_ALPHABET.contains(&b)) {
        return Err(invalid("bad opaque part"));
    }

    let mut chars = check.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if luhn_sum(&format!("{body}{c}"), 1) == Some(0) => Ok(()),
        (Some(_), None) => Err(invalid("check character mismatch")),
        _ => Err(invalid("check must be one character")),
    }
}

/// The Luhn mod N check character for `input`, or `None` if `input` has
/// characters outside [`CHECK_ALPHABET`].
pub fn check_character(input: &str) -> Option<char> {
    let n = CHECK_ALPHABET.len() as u32;
    let sum = luhn_sum(input, 2)?;
    let index = (n - sum) % n;
    Some(char::from(CHECK_ALPHABET[index as usize]))
}

/// Weighted digit sum mod N, walking right to left starting with `factor`.
fn luhn_sum(input: &str, mut factor: u32) -> Option<u32> {
    let n = CHECK_ALPHABET.len() as u32;
    let mut sum = 0;
    for c in input.bytes().rev() {
        let code = CHECK_ALPHABET.iter().position(|&a| a == c)? as u32;
        let addend = factor * code;
        factor = if factor == 2 { 1 } else { 2 };
        sum += addend / n + addend % n;
    }
    Some(sum % n)
}

pub(crate) fn check_country(country: &str) -> Result<()> {
    if country.len() == 2 && country.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(PipelineError::Config(format!(
            "country code {country:?} must be two uppercase letters"
        )))
    }
}

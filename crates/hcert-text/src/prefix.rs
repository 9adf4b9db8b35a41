//! The versioned context prefix, e.g. `HC1:`.

use std::fmt;

use crate::error::{Result, TextError};

/// Tag and version of the token prefix: `<tag><version>:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPrefix {
    tag: String,
    version: u8,
}

impl Default for TokenPrefix {
    fn default() -> Self {
        Self {
            tag: "HC".into(),
            version: 1,
        }
    }
}

impl TokenPrefix {
    /// The tag must be non-empty uppercase ASCII letters and the version a
    /// single digit, so the prefix stays within the Base45 alphabet.
    pub fn new(tag: impl Into<String>, version: u8) -> Result<Self> {
        let tag = tag.into();
        if tag.is_empty() || !tag.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(TextError::BadPrefix(format!(
                "prefix tag {tag:?} must be uppercase ASCII letters"
            )));
        }
        if version > 9 {
            return Err(TextError::BadPrefix(format!(
                "prefix version {version} must be a single digit"
            )));
        }
        Ok(Self { tag, version })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Prepend the prefix to Base45 text.
    pub fn attach(&self, body: &str) -> String {
        format!("{self}{body}")
    }

    /// Strip surrounding whitespace and the prefix, returning the body.
    ///
    /// A recognized tag with a different version is still `BadPrefix`; the
    /// message names the version found.
    pub fn strip<'a>(&self, token: &'a str) -> Result<&'a str> {
        let token = token.trim_matches(|c: char| c.is_ascii_whitespace());

        let Some(rest) = token.strip_prefix(self.tag.as_str()) else {
            return Err(TextError::BadPrefix(format!(
                "expected token to start with {self}"
            )));
        };

        let mut chars = rest.chars();
        match (chars.next(), chars.next()) {
            (Some(v), Some(':')) if v.to_digit(10) == Some(u32::from(self.version)) => {
                Ok(chars.as_str())
            }
            (Some(v), Some(':')) if v.is_ascii_digit() => Err(TextError::BadPrefix(format!(
                "unsupported version {}{v}, expected {self}",
                self.tag
            ))),
            _ => Err(TextError::BadPrefix(format!(
                "expected token to start with {self}"
            ))),
        }
    }
}

impl fmt::Display for TokenPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:", self.tag, self.version)
    }
}

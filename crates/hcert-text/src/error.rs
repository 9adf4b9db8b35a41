//! Text transport errors.

use hcert_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextError {
    #[error("bad prefix: {0}")]
    BadPrefix(String),

    #[error("invalid character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },

    #[error("invalid Base45 group at position {position}: value {value} out of range")]
    GroupOverflow { position: usize, value: u32 },

    #[error("invalid Base45 length {0}")]
    InvalidLength(usize),

    #[error("corrupt stream: {0}")]
    CorruptStream(String),

    #[error("decompressed size exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("compression failed: {0}")]
    Compression(#[from] std::io::Error),
}

impl TextError {
    /// Map onto the stage-level taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TextError::BadPrefix(_) => ErrorKind::BadPrefix,
            TextError::InvalidCharacter { .. }
            | TextError::GroupOverflow { .. }
            | TextError::InvalidLength(_) => ErrorKind::InvalidAlphabet,
            TextError::CorruptStream(_)
            | TextError::TooLarge { .. }
            | TextError::Compression(_) => ErrorKind::CorruptStream,
        }
    }
}

pub type Result<T> = std::result::Result<T, TextError>;

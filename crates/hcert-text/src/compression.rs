//! zlib (RFC 1950) compression with a bounded inflate.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use tracing::debug;

use crate::error::{Result, TextError};

/// Default compression level (best compression).
pub const DEFAULT_LEVEL: u32 = 9;

/// Default ceiling on inflated size.
pub const DEFAULT_MAX_DECOMPRESSED: usize = 64 * 1024;

/// zlib codec with a fixed level and inflate ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zlib {
    level: u32,
    max_decompressed: usize,
}

impl Default for Zlib {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            max_decompressed: DEFAULT_MAX_DECOMPRESSED,
        }
    }
}

impl Zlib {
    /// Levels above 9 are clamped.
    pub fn new(level: u32, max_decompressed: usize) -> Self {
        Self {
            level: level.min(9),
            max_decompressed,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn max_decompressed(&self) -> usize {
        self.max_decompressed
    }

    /// Compress into a zlib stream.
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(
            Vec::with_capacity(input.len() / 2 + 16),
            Compression::new(self.level),
        );
        encoder.write_all(input)?;
        let out = encoder.finish()?;
        debug!(raw = input.len(), compressed = out.len(), "compressed");
        Ok(out)
    }

    /// Inflate a zlib stream.
    ///
    /// Empty input inflates to empty output. Truncated or checksum-failing
    /// streams, and bytes after the end of the stream, are `CorruptStream`.
    /// Output is never grown past one byte beyond the ceiling.
    pub fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let limit = self.max_decompressed.saturating_add(1);
        let mut inflater = Decompress::new(true);
        let mut out = Vec::with_capacity(input.len().saturating_mul(4).min(limit));

        loop {
            if out.len() == out.capacity() {
                let grow = out.capacity().max(1024).min(limit - out.len());
                out.reserve_exact(grow);
            }

            let in_before = inflater.total_in();
            let out_before = inflater.total_out();
            let status = inflater
                .decompress_vec(&input[in_before as usize..], &mut out, FlushDecompress::None)
                .map_err(|e| TextError::CorruptStream(e.to_string()))?;

            if out.len() > self.max_decompressed {
                return Err(TextError::TooLarge {
                    limit: self.max_decompressed,
                });
            }

            match status {
                Status::StreamEnd => break,
                _ if inflater.total_in() == in_before && inflater.total_out() == out_before => {
                    return Err(TextError::CorruptStream("truncated zlib stream".into()));
                }
                _ => {}
            }
        }

        let consumed = inflater.total_in() as usize;
        if consumed != input.len() {
            return Err(TextError::CorruptStream(format!(
                "{} bytes after end of zlib stream",
                input.len() - consumed
            )));
        }

        debug!(compressed = input.len(), raw = out.len(), "inflated");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let zlib = Zlib::default();
        let data = b"health certificate payload ".repeat(20);
        let compressed = zlib.compress(&data).unwrap();
        assert!(compressed.len() < data.len());
        // zlib header: CM=8, best compression flag.
        assert_eq!(compressed[0], 0x78);
        assert_eq!(zlib.decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_empty_input() {
        let zlib = Zlib::default();
        let compressed = zlib.compress(&[]).unwrap();
        assert!(!compressed.is_empty());
        assert!(zlib.decompress(&compressed).unwrap().is_empty());
        assert!(zlib.decompress(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_stream() {
        let zlib = Zlib::default();
        assert!(matches!(
            zlib.decompress(b"not a zlib stream"),
            Err(TextError::CorruptStream(_))
        ));

        let compressed = zlib.compress(b"some data that compresses").unwrap();
        let truncated = &compressed[..compressed.len() - 3];
        assert!(zlib.decompress(truncated).is_err());

        let mut bad_checksum = compressed.clone();
        let last = bad_checksum.len() - 1;
        bad_checksum[last] ^= 0xff;
        assert!(zlib.decompress(&bad_checksum).is_err());

        let mut trailing = compressed;
        trailing.push(0);
        assert!(matches!(
            zlib.decompress(&trailing),
            Err(TextError::CorruptStream(_))
        ));
    }

    #[test]
    fn test_ceiling() {
        let zlib = Zlib::new(9, 1024);
        let exact = zlib.compress(&[0u8; 1024]).unwrap();
        assert_eq!(zlib.decompress(&exact).unwrap().len(), 1024);

        let bomb = zlib.compress(&vec![0u8; 1024 * 1024]).unwrap();
        let err = zlib.decompress(&bomb).unwrap_err();
        assert!(matches!(err, TextError::TooLarge { limit: 1024 }));
        assert_eq!(err.kind(), hcert_core::ErrorKind::CorruptStream);
    }

    #[test]
    fn test_level_clamped() {
        assert_eq!(Zlib::new(42, 10).level(), 9);
    }
}

// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Chunk decompression registry.
//!
//! Dispatches on the chunk header's `compression` tag. Supported tags are
//! `none` and `lz4` (raw block format, decompressed size taken from the
//! chunk header's `size` field). Anything else is rejected.

use std::borrow::Cow;

use crate::core::{BagError, Result};

/// Decompress a chunk payload.
///
/// `uncompressed_size` is the `size` field from the chunk record header;
/// the output must be exactly that long.
pub fn decompress<'a>(
    compression: &str,
    data: &'a [u8],
    uncompressed_size: usize,
) -> Result<Cow<'a, [u8]>> {
    match compression {
        "none" => Ok(Cow::Borrowed(data)),
        "lz4" => {
            let out = lz4_flex::block::decompress(data, uncompressed_size)
                .map_err(|e| BagError::decompression_failure("lz4", e))?;
            if out.len() != uncompressed_size {
                return Err(BagError::decompression_failure(
                    "lz4",
                    format!(
                        "decompressed to {} bytes, chunk header declared {uncompressed_size}",
                        out.len()
                    ),
                ));
            }
            Ok(Cow::Owned(out))
        }
        other => Err(BagError::unsupported_compression(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_passes_through() {
        let data = vec![1u8, 2, 3, 4];
        let out = decompress("none", &data, 4).unwrap();
        assert_eq!(out.as_ref(), &data[..]);
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn test_lz4_block_round_trip() {
        let original: Vec<u8> = (0..1024u32).flat_map(|v| v.to_le_bytes()).collect();
        let compressed = lz4_flex::block::compress(&original);
        let out = decompress("lz4", &compressed, original.len()).unwrap();
        assert_eq!(out.as_ref(), &original[..]);
    }

    #[test]
    fn test_lz4_rejects_garbage() {
        let garbage = vec![0xFFu8; 16];
        assert!(matches!(
            decompress("lz4", &garbage, 1024),
            Err(BagError::DecompressionFailure { .. })
        ));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let err = decompress("bz2", &[], 0).unwrap_err();
        match err {
            BagError::UnsupportedCompression { compression } => assert_eq!(compression, "bz2"),
            other => panic!("unexpected error: {other}"),
        }
    }
}

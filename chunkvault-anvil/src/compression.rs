//! Per-slot payload compression.
//!
//! A stored chunk is framed as `[Length: 4][Type: 1][Data...]` where the
//! length is big-endian and counts the type byte plus the data.

use std::io::{Read, Write};
use std::str::FromStr;

use flate2::Compression as ZlibCompression;
use flate2::write::{GzEncoder, ZlibEncoder};

use crate::RegionError;

/// Compression scheme ids, same as vanilla Minecraft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionScheme {
    Gzip,
    #[default]
    Zlib,
    None,
    /// Read support only.
    Lz4,
}

impl CompressionScheme {
    pub fn id(self) -> u8 {
        match self {
            CompressionScheme::Gzip => 1,
            CompressionScheme::Zlib => 2,
            CompressionScheme::None => 3,
            CompressionScheme::Lz4 => 4,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(CompressionScheme::Gzip),
            2 => Some(CompressionScheme::Zlib),
            3 => Some(CompressionScheme::None),
            4 => Some(CompressionScheme::Lz4),
            _ => None,
        }
    }

    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>, RegionError> {
        match self {
            CompressionScheme::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), ZlibCompression::default());
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            CompressionScheme::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), ZlibCompression::default());
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            CompressionScheme::None => Ok(data.to_vec()),
            CompressionScheme::Lz4 => Err(RegionError::UnsupportedCompression(self.id())),
        }
    }

    pub fn decompress(self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut decompressed = Vec::new();
        match self {
            CompressionScheme::Zlib => {
                flate2::read::ZlibDecoder::new(data).read_to_end(&mut decompressed)?;
            }
            CompressionScheme::Gzip => {
                flate2::read::GzDecoder::new(data).read_to_end(&mut decompressed)?;
            }
            CompressionScheme::None => decompressed.extend_from_slice(data),
            CompressionScheme::Lz4 => {
                // Same block format as Pumpkin and vanilla (lz4-java).
                lz4_java_wrc::Lz4BlockInput::new(data).read_to_end(&mut decompressed)?;
            }
        }
        Ok(decompressed)
    }
}

impl FromStr for CompressionScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gzip" => Ok(CompressionScheme::Gzip),
            "zlib" => Ok(CompressionScheme::Zlib),
            "none" => Ok(CompressionScheme::None),
            "lz4" => Ok(CompressionScheme::Lz4),
            other => Err(format!("unknown compression scheme: {other}")),
        }
    }
}

/// Compress `nbt_data` and frame it for storage in a sector run.
pub fn compress_and_wrap_chunk(
    scheme: CompressionScheme,
    nbt_data: &[u8],
) -> Result<Vec<u8>, RegionError> {
    let compressed = scheme.compress(nbt_data)?;
    // +1 byte for Type
    let total_len = (compressed.len() + 1) as u32;
    let mut chunk_blob = Vec::with_capacity(compressed.len() + 5);
    chunk_blob.extend_from_slice(&total_len.to_be_bytes());
    chunk_blob.push(scheme.id());
    chunk_blob.extend_from_slice(&compressed);
    Ok(chunk_blob)
}

/// Why a framed blob could not be unwrapped.
#[derive(Debug)]
pub enum UnwrapError {
    TooShort,
    UnknownScheme(u8),
    Decompress(std::io::Error),
}

impl std::fmt::Display for UnwrapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnwrapError::TooShort => f.write_str("chunk blob too short"),
            UnwrapError::UnknownScheme(id) => write!(f, "unknown compression type: {id}"),
            UnwrapError::Decompress(e) => write!(f, "decompression failed: {e}"),
        }
    }
}

/// Unwrap and decompress a framed chunk blob.
pub fn unwrap_and_decompress_chunk(chunk_blob: &[u8]) -> Result<Vec<u8>, UnwrapError> {
    if chunk_blob.len() < 5 {
        return Err(UnwrapError::TooShort);
    }
    let compression_type = chunk_blob[4];
    let compressed_data = &chunk_blob[5..];
    let scheme =
        CompressionScheme::from_id(compression_type).ok_or(UnwrapError::UnknownScheme(compression_type))?;
    scheme.decompress(compressed_data).map_err(UnwrapError::Decompress)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &[u8] = b"\x0a\x00\x00\x03\x00\x04xPos\x00\x00\x00\x07\x00";

    #[test]
    fn test_wrap_and_unwrap_each_writable_scheme() {
        for scheme in [CompressionScheme::Gzip, CompressionScheme::Zlib, CompressionScheme::None] {
            let blob = compress_and_wrap_chunk(scheme, PAYLOAD).unwrap();
            let len = u32::from_be_bytes(blob[0..4].try_into().unwrap()) as usize;
            assert_eq!(len, blob.len() - 4);
            assert_eq!(blob[4], scheme.id());
            assert_eq!(unwrap_and_decompress_chunk(&blob).unwrap(), PAYLOAD);
        }
    }

    #[test]
    fn test_lz4_is_read_only() {
        assert!(matches!(
            compress_and_wrap_chunk(CompressionScheme::Lz4, PAYLOAD),
            Err(RegionError::UnsupportedCompression(4))
        ));
    }

    #[test]
    fn test_unwrap_rejects_bad_blobs() {
        assert!(matches!(unwrap_and_decompress_chunk(&[0, 0, 0, 1]), Err(UnwrapError::TooShort)));
        assert!(matches!(
            unwrap_and_decompress_chunk(&[0, 0, 0, 2, 9, 0]),
            Err(UnwrapError::UnknownScheme(9))
        ));
        assert!(matches!(
            unwrap_and_decompress_chunk(&[0, 0, 0, 4, 2, 1, 2, 3]),
            Err(UnwrapError::Decompress(_))
        ));
    }

    #[test]
    fn test_scheme_from_str() {
        assert_eq!("ZLIB".parse::<CompressionScheme>(), Ok(CompressionScheme::Zlib));
        assert_eq!("none".parse::<CompressionScheme>(), Ok(CompressionScheme::None));
        assert!("brotli".parse::<CompressionScheme>().is_err());
    }
}

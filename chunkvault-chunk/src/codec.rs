use crate::nbt::DataVersionProbe;
use crate::{Chunk, ChunkError, ChunkVariant, anvil12, anvil113, mcregion};

/// The operations one chunk variant provides, as plain function pointers.
pub struct Codec {
    pub variant: ChunkVariant,
    /// `(payload, max_height, read_only)`; the payload is never modified.
    pub decode: fn(&[u8], i32, bool) -> Result<Chunk, ChunkError>,
    pub encode: fn(&Chunk) -> Result<Vec<u8>, ChunkError>,
    /// `(x, z, max_height)`
    pub create: fn(i32, i32, i32) -> Result<Chunk, ChunkError>,
}

pub static MCREGION: Codec = Codec {
    variant: ChunkVariant::McRegion,
    decode: mcregion::decode,
    encode: mcregion::encode_chunk,
    create: mcregion::create,
};

pub static ANVIL_12: Codec = Codec {
    variant: ChunkVariant::Anvil12,
    decode: anvil12::decode,
    encode: anvil12::encode_chunk,
    create: anvil12::create,
};

pub static ANVIL_113: Codec = Codec {
    variant: ChunkVariant::Anvil113,
    decode: anvil113::decode,
    encode: anvil113::encode_chunk,
    create: anvil113::create,
};

/// Encodes a chunk with the codec of its own variant.
pub fn encode(chunk: &Chunk) -> Result<Vec<u8>, ChunkError> {
    (chunk.variant().codec().encode)(chunk)
}

/// Reads the root `DataVersion` tag of an uncompressed payload, if any.
pub fn peek_data_version(raw: &[u8]) -> Result<Option<i32>, ChunkError> {
    let probe: DataVersionProbe = fastnbt::from_bytes(raw)?;
    Ok(probe.data_version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DATA_VERSION_MC_1_12_2, DATA_VERSION_MC_1_13_2};

    #[test]
    fn test_codecs_match_their_variant() {
        for variant in [ChunkVariant::McRegion, ChunkVariant::Anvil12, ChunkVariant::Anvil113] {
            let codec = variant.codec();
            assert_eq!(codec.variant, variant);
            let chunk = (codec.create)(4, 4, 128).unwrap();
            assert_eq!(chunk.variant(), variant);
            let bytes = encode(&chunk).unwrap();
            assert_eq!((codec.decode)(&bytes, 128, false).unwrap(), chunk);
        }
    }

    #[test]
    fn test_peek_data_version() {
        let old = encode(&anvil12::create(0, 0, 256).unwrap()).unwrap();
        assert_eq!(peek_data_version(&old).unwrap(), Some(DATA_VERSION_MC_1_12_2));
        let new = encode(&anvil113::create(0, 0, 256).unwrap()).unwrap();
        assert_eq!(peek_data_version(&new).unwrap(), Some(DATA_VERSION_MC_1_13_2));
        let beta = encode(&mcregion::create(0, 0, 128).unwrap()).unwrap();
        assert_eq!(peek_data_version(&beta).unwrap(), None);
        assert!(peek_data_version(b"junk").is_err());
    }
}

//! In-memory chunks and their versioned NBT codecs.
//!
//! Three mutually exclusive chunk variants exist, one per on-disk payload
//! generation. Which one a payload decodes to is decided by the caller
//! (see [`peek_data_version`]); a codec never second-guesses that choice.

pub mod anvil113;
pub mod anvil12;
pub mod block;
mod codec;
mod error;
pub mod mcregion;
pub mod nbt;
mod nibble;
mod packed;
pub mod postprocess;

use std::ops::{Deref, DerefMut};

use fastnbt::Value;

pub use anvil12::Anvil12Chunk;
pub use anvil113::Anvil113Chunk;
pub use block::{Block, BlockState, Material};
pub use codec::{ANVIL_12, ANVIL_113, Codec, MCREGION, encode, peek_data_version};
pub use error::ChunkError;
pub use mcregion::McRegionChunk;
pub use postprocess::{Java113PostProcessor, LegacyPostProcessor, PostProcessor};

/// Chunk footprint along x and z.
pub const CHUNK_SIZE: i32 = 16;

/// Height of one Anvil section.
pub const SECTION_HEIGHT: i32 = 16;

/// Highest DataVersion written by pre-1.13 Anvil chunks.
pub const DATA_VERSION_MC_1_12_2: i32 = 1343;

/// DataVersion stamped on newly created 1.13 chunks.
pub const DATA_VERSION_MC_1_13_2: i32 = 1631;

/// The concrete payload generation of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkVariant {
    McRegion,
    Anvil12,
    Anvil113,
}

impl ChunkVariant {
    pub fn codec(self) -> &'static Codec {
        match self {
            ChunkVariant::McRegion => &MCREGION,
            ChunkVariant::Anvil12 => &ANVIL_12,
            ChunkVariant::Anvil113 => &ANVIL_113,
        }
    }
}

/// Typed access to one chunk column, independent of its payload format.
///
/// Block coordinates are chunk-local: `x` and `z` in `0..16`, `y` in
/// `0..max_height`. Every setter fails with
/// [`ChunkError::ReadOnlyViolation`] on a chunk loaded read-only.
pub trait ChunkData {
    fn variant(&self) -> ChunkVariant;
    fn x(&self) -> i32;
    fn z(&self) -> i32;
    fn max_height(&self) -> i32;
    fn is_read_only(&self) -> bool;

    fn block(&self, x: i32, y: i32, z: i32) -> Result<Block, ChunkError>;
    fn set_block(&mut self, x: i32, y: i32, z: i32, block: &Block) -> Result<(), ChunkError>;

    /// Lighting properties of the block at a position.
    fn material(&self, x: i32, y: i32, z: i32) -> Result<Material, ChunkError> {
        Ok(self.block(x, y, z)?.material())
    }

    fn sky_light(&self, x: i32, y: i32, z: i32) -> Result<u8, ChunkError>;
    fn set_sky_light(&mut self, x: i32, y: i32, z: i32, level: u8) -> Result<(), ChunkError>;
    fn block_light(&self, x: i32, y: i32, z: i32) -> Result<u8, ChunkError>;
    fn set_block_light(&mut self, x: i32, y: i32, z: i32, level: u8) -> Result<(), ChunkError>;

    /// Height index: lowest y at which this column and everything above is transparent.
    fn height(&self, x: i32, z: i32) -> Result<i32, ChunkError>;
    fn set_height(&mut self, x: i32, z: i32, height: i32) -> Result<(), ChunkError>;

    /// `None` when the format stores no biome, or the biome was never computed.
    fn biome(&self, x: i32, z: i32) -> Result<Option<i32>, ChunkError>;
    fn set_biome(&mut self, x: i32, z: i32, biome: i32) -> Result<(), ChunkError>;

    fn entities(&self) -> &[Value];
    fn set_entities(&mut self, entities: Vec<Value>) -> Result<(), ChunkError>;
    fn tile_entities(&self) -> &[Value];
    fn set_tile_entities(&mut self, tile_entities: Vec<Value>) -> Result<(), ChunkError>;
}

/// A decoded or freshly created chunk. Exactly one variant is live and it
/// never changes in place.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    McRegion(McRegionChunk),
    Anvil12(Anvil12Chunk),
    Anvil113(Anvil113Chunk),
}

impl Deref for Chunk {
    type Target = dyn ChunkData;

    fn deref(&self) -> &Self::Target {
        match self {
            Chunk::McRegion(c) => c,
            Chunk::Anvil12(c) => c,
            Chunk::Anvil113(c) => c,
        }
    }
}

impl DerefMut for Chunk {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            Chunk::McRegion(c) => c,
            Chunk::Anvil12(c) => c,
            Chunk::Anvil113(c) => c,
        }
    }
}

impl From<McRegionChunk> for Chunk {
    fn from(chunk: McRegionChunk) -> Self {
        Chunk::McRegion(chunk)
    }
}

impl From<Anvil12Chunk> for Chunk {
    fn from(chunk: Anvil12Chunk) -> Self {
        Chunk::Anvil12(chunk)
    }
}

impl From<Anvil113Chunk> for Chunk {
    fn from(chunk: Anvil113Chunk) -> Self {
        Chunk::Anvil113(chunk)
    }
}

// --- helpers shared by the variants ---

/// Index of a column in 16x16 per-column arrays (`z * 16 + x`).
pub(crate) fn column_index(x: i32, z: i32) -> Result<usize, ChunkError> {
    if (0..CHUNK_SIZE).contains(&x) && (0..CHUNK_SIZE).contains(&z) {
        Ok((z * CHUNK_SIZE + x) as usize)
    } else {
        Err(ChunkError::OutOfBounds { x, y: 0, z })
    }
}

pub(crate) fn check_position(x: i32, y: i32, z: i32, max_height: i32) -> Result<(), ChunkError> {
    if (0..CHUNK_SIZE).contains(&x) && (0..CHUNK_SIZE).contains(&z) && (0..max_height).contains(&y) {
        Ok(())
    } else {
        Err(ChunkError::OutOfBounds { x, y, z })
    }
}

pub(crate) fn check_writable(read_only: bool, x: i32, z: i32) -> Result<(), ChunkError> {
    if read_only {
        return Err(ChunkError::ReadOnlyViolation { x, z });
    }
    Ok(())
}

pub(crate) fn check_light(level: u8) -> Result<(), ChunkError> {
    if level > 15 {
        return Err(ChunkError::InvalidValue {
            what: "light level",
            value: level as i64,
        });
    }
    Ok(())
}

pub(crate) fn check_height(height: i32, max_height: i32) -> Result<(), ChunkError> {
    if !(0..=max_height).contains(&height) {
        return Err(ChunkError::InvalidValue {
            what: "height",
            value: height as i64,
        });
    }
    Ok(())
}

/// Heights must be a positive multiple of 16 no greater than `limit`.
pub(crate) fn section_count(max_height: i32, limit: i32) -> Result<usize, ChunkError> {
    if max_height <= 0 || max_height > limit || max_height % SECTION_HEIGHT != 0 {
        return Err(ChunkError::malformed(format!("unsupported max height {max_height}")));
    }
    Ok((max_height / SECTION_HEIGHT) as usize)
}

pub(crate) fn expect_len<T>(what: &str, data: &[T], expected: usize) -> Result<(), ChunkError> {
    if data.len() != expected {
        return Err(ChunkError::malformed(format!(
            "{what} has {} entries, expected {expected}",
            data.len()
        )));
    }
    Ok(())
}

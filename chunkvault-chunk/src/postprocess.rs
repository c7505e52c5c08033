//! Finishing passes that recompute derived chunk data after edits.
//!
//! Lighting is computed from block materials alone, so running a pass twice
//! produces the same chunk as running it once.

use std::collections::VecDeque;

use log::debug;

use crate::anvil113::COMPLETE_STATUSES;
use crate::{Anvil113Chunk, CHUNK_SIZE, Chunk, ChunkData, ChunkError};

pub trait PostProcessor: Send + Sync {
    /// Recomputes derived fields in place. Performs no I/O.
    fn process(&self, chunk: &mut Chunk) -> Result<(), ChunkError>;
}

/// Height index, sky light and block light. Used for McRegion and pre-1.13
/// Anvil chunks; sets `LightPopulated` where the format has it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyPostProcessor;

impl PostProcessor for LegacyPostProcessor {
    fn process(&self, chunk: &mut Chunk) -> Result<(), ChunkError> {
        ensure_writable(chunk)?;
        let lighting = Lighting::compute(chunk)?;
        lighting.apply(chunk)?;
        if let Chunk::Anvil12(c) = chunk {
            c.set_light_populated(true)?;
        }
        debug!("Post-processed chunk ({}, {})", chunk.x(), chunk.z());
        Ok(())
    }
}

/// Everything the legacy pass does, plus the `MOTION_BLOCKING` heightmap,
/// palette compaction and status promotion for 1.13 chunks.
#[derive(Debug, Default, Clone, Copy)]
pub struct Java113PostProcessor;

impl PostProcessor for Java113PostProcessor {
    fn process(&self, chunk: &mut Chunk) -> Result<(), ChunkError> {
        if !matches!(chunk, Chunk::Anvil113(_)) {
            // Anvil platforms still hold chunks saved before 1.13.
            return LegacyPostProcessor.process(chunk);
        }
        ensure_writable(chunk)?;
        let lighting = Lighting::compute(chunk)?;
        lighting.apply(chunk)?;
        if let Chunk::Anvil113(c) = chunk {
            finish_113(c)?;
            debug!("Post-processed 1.13 chunk ({}, {})", c.x(), c.z());
        }
        Ok(())
    }
}

fn finish_113(chunk: &mut Anvil113Chunk) -> Result<(), ChunkError> {
    chunk.compact_palettes()?;
    for z in 0..CHUNK_SIZE {
        for x in 0..CHUNK_SIZE {
            let mut top = 0;
            for y in (0..chunk.max_height()).rev() {
                if chunk.material(x, y, z)?.motion_blocking {
                    top = y + 1;
                    break;
                }
            }
            chunk.set_motion_blocking_height(x, z, top)?;
        }
    }
    if !COMPLETE_STATUSES.contains(&chunk.status()) {
        chunk.set_status("postprocessed")?;
    }
    Ok(())
}

fn ensure_writable(chunk: &Chunk) -> Result<(), ChunkError> {
    if chunk.is_read_only() {
        return Err(ChunkError::ReadOnlyViolation {
            x: chunk.x(),
            z: chunk.z(),
        });
    }
    Ok(())
}

/// Derived light for a whole chunk, indexed `(y * 16 + z) * 16 + x`.
struct Lighting {
    max_height: i32,
    heights: Vec<i32>,
    sky: Vec<u8>,
    block: Vec<u8>,
}

impl Lighting {
    fn compute(chunk: &Chunk) -> Result<Self, ChunkError> {
        let max_height = chunk.max_height();
        let volume = (CHUNK_SIZE * CHUNK_SIZE * max_height) as usize;
        let mut opacity = vec![0u8; volume];
        let mut block = vec![0u8; volume];
        let mut queue = VecDeque::new();

        for y in 0..max_height {
            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    let material = chunk.material(x, y, z)?;
                    let i = index(x, y, z);
                    opacity[i] = material.opacity;
                    if material.emission > 0 {
                        block[i] = material.emission;
                        queue.push_back((x, y, z));
                    }
                }
            }
        }

        let mut heights = vec![0; 256];
        let mut sky = vec![0u8; volume];
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let height = (0..max_height)
                    .rev()
                    .find(|&y| opacity[index(x, y, z)] > 0)
                    .map_or(0, |y| y + 1);
                heights[(z * CHUNK_SIZE + x) as usize] = height;
                let mut level = 15u8;
                for y in (0..max_height).rev() {
                    let i = index(x, y, z);
                    if y < height {
                        level = level.saturating_sub(opacity[i]);
                    }
                    sky[i] = level;
                }
            }
        }

        // Flood fill block light, losing 1 plus the opacity of each block entered.
        const NEIGHBOURS: [(i32, i32, i32); 6] =
            [(1, 0, 0), (-1, 0, 0), (0, 1, 0), (0, -1, 0), (0, 0, 1), (0, 0, -1)];
        while let Some((x, y, z)) = queue.pop_front() {
            let level = block[index(x, y, z)];
            for (dx, dy, dz) in NEIGHBOURS {
                let (nx, ny, nz) = (x + dx, y + dy, z + dz);
                if !(0..CHUNK_SIZE).contains(&nx)
                    || !(0..CHUNK_SIZE).contains(&nz)
                    || !(0..max_height).contains(&ny)
                {
                    continue;
                }
                let n = index(nx, ny, nz);
                let spread = level.saturating_sub(1 + opacity[n]);
                if spread > block[n] {
                    block[n] = spread;
                    queue.push_back((nx, ny, nz));
                }
            }
        }

        Ok(Self {
            max_height,
            heights,
            sky,
            block,
        })
    }

    fn apply(&self, chunk: &mut Chunk) -> Result<(), ChunkError> {
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                chunk.set_height(x, z, self.heights[(z * CHUNK_SIZE + x) as usize])?;
                for y in 0..self.max_height {
                    let i = index(x, y, z);
                    chunk.set_sky_light(x, y, z, self.sky[i])?;
                    chunk.set_block_light(x, y, z, self.block[i])?;
                }
            }
        }
        Ok(())
    }
}

fn index(x: i32, y: i32, z: i32) -> usize {
    ((y * CHUNK_SIZE + z) * CHUNK_SIZE + x) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Block, anvil12, anvil113, mcregion};

    fn furnish(chunk: &mut Chunk) {
        for x in 0..16 {
            for z in 0..16 {
                for y in 0..4 {
                    chunk.set_block(x, y, z, &Block::legacy(1, 0)).unwrap();
                }
            }
        }
        chunk.set_block(8, 4, 8, &Block::legacy(50, 0)).unwrap();
        chunk.set_block(2, 20, 2, &Block::legacy(18, 0)).unwrap();
        chunk.set_block(5, 10, 5, &Block::legacy(20, 0)).unwrap();
        chunk.set_block(12, 30, 12, &Block::legacy(1, 0)).unwrap();
    }

    fn all_chunks() -> Vec<(Chunk, &'static dyn PostProcessor)> {
        let legacy: &'static dyn PostProcessor = &LegacyPostProcessor;
        let modern: &'static dyn PostProcessor = &Java113PostProcessor;
        vec![
            (mcregion::create(0, 0, 128).unwrap(), legacy),
            (anvil12::create(0, 0, 128).unwrap(), legacy),
            (anvil113::create(0, 0, 128).unwrap(), modern),
        ]
    }

    #[test]
    fn test_processing_is_idempotent() {
        for (mut chunk, processor) in all_chunks() {
            furnish(&mut chunk);
            processor.process(&mut chunk).unwrap();
            let once = chunk.clone();
            processor.process(&mut chunk).unwrap();
            assert_eq!(chunk, once, "{:?}", chunk.variant());
        }
    }

    #[test]
    fn test_height_and_sky_light() {
        for (mut chunk, processor) in all_chunks() {
            furnish(&mut chunk);
            processor.process(&mut chunk).unwrap();
            assert_eq!(chunk.height(0, 0).unwrap(), 4);
            assert_eq!(chunk.sky_light(0, 4, 0).unwrap(), 15);
            assert_eq!(chunk.sky_light(0, 3, 0).unwrap(), 0);

            assert_eq!(chunk.height(12, 12).unwrap(), 31);
            assert_eq!(chunk.sky_light(12, 31, 12).unwrap(), 15);
            assert_eq!(chunk.sky_light(12, 20, 12).unwrap(), 0);

            // Leaves let most light through.
            assert_eq!(chunk.height(2, 2).unwrap(), 21);
            assert_eq!(chunk.sky_light(2, 20, 2).unwrap(), 14);
            assert_eq!(chunk.sky_light(2, 10, 2).unwrap(), 14);

            // Glass is transparent.
            assert_eq!(chunk.height(5, 5).unwrap(), 4);
            assert_eq!(chunk.sky_light(5, 9, 5).unwrap(), 15);
        }
    }

    #[test]
    fn test_block_light_flood_fill() {
        for (mut chunk, processor) in all_chunks() {
            furnish(&mut chunk);
            processor.process(&mut chunk).unwrap();
            assert_eq!(chunk.block_light(8, 4, 8).unwrap(), 14);
            assert_eq!(chunk.block_light(9, 4, 8).unwrap(), 13);
            assert_eq!(chunk.block_light(8, 4, 10).unwrap(), 12);
            assert_eq!(chunk.block_light(8, 6, 9).unwrap(), 11);
            assert_eq!(chunk.block_light(8, 3, 8).unwrap(), 0);
            assert_eq!(chunk.block_light(0, 4, 0).unwrap(), 0);
        }
    }

    #[test]
    fn test_anvil12_light_populated() {
        let mut chunk = anvil12::create(0, 0, 256).unwrap();
        LegacyPostProcessor.process(&mut chunk).unwrap();
        let Chunk::Anvil12(c) = &chunk else {
            panic!("wrong variant");
        };
        assert!(c.light_populated());
    }

    #[test]
    fn test_anvil113_extras() {
        let mut chunk = anvil113::create(0, 0, 256).unwrap();
        chunk.set_block(1, 1, 1, &Block::named("minecraft:stone")).unwrap();
        chunk.set_block(1, 1, 1, &Block::named("minecraft:water")).unwrap();
        chunk.set_block(1, 9, 1, &Block::named("minecraft:torch")).unwrap();
        if let Chunk::Anvil113(c) = &mut chunk {
            c.set_status("features").unwrap();
        }
        Java113PostProcessor.process(&mut chunk).unwrap();
        let Chunk::Anvil113(c) = &mut chunk else {
            panic!("wrong variant");
        };
        assert_eq!(c.status(), "postprocessed");
        assert_eq!(c.motion_blocking_height(1, 1).unwrap(), Some(2));
        assert_eq!(c.motion_blocking_height(0, 0).unwrap(), Some(0));
        assert_eq!(c.compact_palettes().unwrap(), 0);

        c.set_status("full").unwrap();
        Java113PostProcessor.process(&mut chunk).unwrap();
        let Chunk::Anvil113(c) = &chunk else {
            panic!("wrong variant");
        };
        assert_eq!(c.status(), "full");
    }

    #[test]
    fn test_java113_processor_accepts_older_chunks() {
        let mut chunk = anvil12::create(0, 0, 256).unwrap();
        chunk.set_block(0, 0, 0, &Block::legacy(89, 0)).unwrap();
        Java113PostProcessor.process(&mut chunk).unwrap();
        assert_eq!(chunk.block_light(1, 0, 0).unwrap(), 14);
    }

    #[test]
    fn test_read_only_chunks_are_rejected() {
        let bytes = crate::encode(&anvil113::create(3, 4, 256).unwrap()).unwrap();
        let mut chunk = anvil113::decode(&bytes, 256, true).unwrap();
        let before = chunk.clone();
        assert!(matches!(
            Java113PostProcessor.process(&mut chunk),
            Err(ChunkError::ReadOnlyViolation { x: 3, z: 4 })
        ));
        assert!(LegacyPostProcessor.process(&mut chunk).is_err());
        assert_eq!(chunk, before);
    }
}

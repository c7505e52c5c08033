//! Anvil chunks from 1.13 on: paletted sections of named block states.

use fastnbt::{IntArray, LongArray, Value};
use log::debug;

use crate::block::{Block, BlockState, Material};
use crate::nbt::{Anvil113Level, Anvil113Root, Anvil113Section, Heightmaps, from_byte_array, to_byte_array};
use crate::packed::{bits_for_palette, pack, unpack};
use crate::{
    Chunk, ChunkData, ChunkError, ChunkVariant, DATA_VERSION_MC_1_13_2, SECTION_HEIGHT,
    check_height, check_light, check_position, check_writable, column_index, expect_len, nibble,
    section_count,
};

const MAX_HEIGHT_LIMIT: i32 = 256;
const SECTION_VOLUME: usize = 4096;
const HEIGHTMAP_BITS: u32 = 9;
const DEFAULT_BIOME: i32 = 1;

/// Chunk statuses at which the game considers a chunk complete.
pub const COMPLETE_STATUSES: [&str; 3] = ["fullchunk", "postprocessed", "full"];

#[derive(Debug, Clone, PartialEq)]
struct Section {
    palette: Vec<BlockState>,
    indices: Vec<u16>,
    sky_light: Option<Vec<u8>>,
    block_light: Option<Vec<u8>>,
}

impl Section {
    fn empty() -> Self {
        Self {
            palette: vec![BlockState::air()],
            indices: vec![0; SECTION_VOLUME],
            sky_light: Some(vec![0xFF; SECTION_VOLUME / 2]),
            block_light: Some(vec![0; SECTION_VOLUME / 2]),
        }
    }

    fn decode(raw: Anvil113Section) -> Result<Self, ChunkError> {
        let (palette, indices) = match (raw.palette, raw.block_states) {
            (Some(palette), Some(states)) => {
                let bits = bits_for_palette(palette.len());
                let indices = unpack(&states, bits, SECTION_VOLUME).ok_or_else(|| {
                    ChunkError::malformed(format!(
                        "section Y {} has {} block state longs for a palette of {}",
                        raw.y,
                        states.len(),
                        palette.len()
                    ))
                })?;
                if let Some(&bad) = indices.iter().find(|&&i| i as usize >= palette.len()) {
                    return Err(ChunkError::malformed(format!(
                        "section Y {} references palette entry {bad} of {}",
                        raw.y,
                        palette.len()
                    )));
                }
                if u16::try_from(palette.len()).is_err() {
                    return Err(ChunkError::malformed(format!(
                        "section Y {} has a palette of {} entries",
                        raw.y,
                        palette.len()
                    )));
                }
                (palette, indices.into_iter().map(|i| i as u16).collect())
            }
            (None, None) => (vec![BlockState::air()], vec![0; SECTION_VOLUME]),
            _ => {
                return Err(ChunkError::malformed(format!(
                    "section Y {} has a palette without block states or the reverse",
                    raw.y
                )));
            }
        };
        let sky_light = raw.sky_light.map(from_byte_array);
        let block_light = raw.block_light.map(from_byte_array);
        if let Some(light) = &sky_light {
            expect_len("SkyLight", light, SECTION_VOLUME / 2)?;
        }
        if let Some(light) = &block_light {
            expect_len("BlockLight", light, SECTION_VOLUME / 2)?;
        }
        Ok(Self {
            palette,
            indices,
            sky_light,
            block_light,
        })
    }

    fn encode(&self, y: i8) -> Anvil113Section {
        let bits = bits_for_palette(self.palette.len());
        Anvil113Section {
            y,
            palette: Some(self.palette.clone()),
            block_states: Some(LongArray::new(pack(
                self.indices.iter().map(|&i| i as u32),
                bits,
            ))),
            sky_light: self.sky_light.as_deref().map(to_byte_array),
            block_light: self.block_light.as_deref().map(to_byte_array),
        }
    }

    /// Finds or adds `state`. A palette that has grown to one entry per
    /// block is compacted first, so it never outgrows the section.
    fn palette_index(&mut self, state: &BlockState) -> Result<u16, ChunkError> {
        let index = match self.palette.iter().position(|p| p == state) {
            Some(i) => i,
            None => {
                if self.palette.len() >= SECTION_VOLUME {
                    self.compact();
                }
                self.palette.push(state.clone());
                self.palette.len() - 1
            }
        };
        u16::try_from(index).map_err(|_| ChunkError::InvalidValue {
            what: "palette index",
            value: index as i64,
        })
    }

    /// Drops palette entries no block refers to; `true` if anything changed.
    fn compact(&mut self) -> bool {
        let mut used = vec![false; self.palette.len()];
        for &i in &self.indices {
            used[i as usize] = true;
        }
        if used.iter().all(|&u| u) {
            return false;
        }
        let mut remap = vec![0u16; self.palette.len()];
        let mut palette = Vec::with_capacity(self.palette.len());
        for (old, state) in self.palette.drain(..).enumerate() {
            if used[old] {
                remap[old] = palette.len() as u16;
                palette.push(state);
            }
        }
        self.palette = palette;
        for i in &mut self.indices {
            *i = remap[*i as usize];
        }
        true
    }
}

/// Light data the game stores just below or above the world, kept as read.
#[derive(Debug, Clone, PartialEq)]
struct OuterLight {
    y: i8,
    sky_light: Option<Vec<u8>>,
    block_light: Option<Vec<u8>>,
}

impl OuterLight {
    fn encode(&self) -> Anvil113Section {
        Anvil113Section {
            y: self.y,
            palette: None,
            block_states: None,
            sky_light: self.sky_light.as_deref().map(to_byte_array),
            block_light: self.block_light.as_deref().map(to_byte_array),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Anvil113Chunk {
    x: i32,
    z: i32,
    max_height: i32,
    read_only: bool,
    data_version: i32,
    status: String,
    sections: Vec<Option<Section>>,
    outer_light: Vec<OuterLight>,
    biomes: Option<Vec<i32>>,
    world_surface: Vec<i32>,
    motion_blocking: Option<Vec<i32>>,
    entities: Vec<Value>,
    tile_entities: Vec<Value>,
    last_update: i64,
    inhabited_time: i64,
}

impl Anvil113Chunk {
    pub fn data_version(&self) -> i32 {
        self.data_version
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        self.status = status.into();
        Ok(())
    }

    /// `None` when the chunk carries no `MOTION_BLOCKING` heightmap.
    pub fn motion_blocking_height(&self, x: i32, z: i32) -> Result<Option<i32>, ChunkError> {
        let i = column_index(x, z)?;
        Ok(self.motion_blocking.as_ref().map(|heights| heights[i]))
    }

    pub fn set_motion_blocking_height(&mut self, x: i32, z: i32, height: i32) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        let i = column_index(x, z)?;
        check_height(height, self.max_height)?;
        self.motion_blocking.get_or_insert_with(|| vec![0; 256])[i] = height;
        Ok(())
    }

    /// Removes unused palette entries from every section.
    pub fn compact_palettes(&mut self) -> Result<usize, ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        let mut changed = 0;
        for section in self.sections.iter_mut().flatten() {
            if section.compact() {
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn locate(&self, x: i32, y: i32, z: i32) -> Result<(usize, usize), ChunkError> {
        check_position(x, y, z, self.max_height)?;
        let local = (y % SECTION_HEIGHT) * 256 + z * 16 + x;
        Ok(((y / SECTION_HEIGHT) as usize, local as usize))
    }

    fn section_mut(&mut self, index: usize) -> &mut Section {
        self.sections[index].get_or_insert_with(Section::empty)
    }
}

impl ChunkData for Anvil113Chunk {
    fn variant(&self) -> ChunkVariant {
        ChunkVariant::Anvil113
    }

    fn x(&self) -> i32 {
        self.x
    }

    fn z(&self) -> i32 {
        self.z
    }

    fn max_height(&self) -> i32 {
        self.max_height
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn block(&self, x: i32, y: i32, z: i32) -> Result<Block, ChunkError> {
        let (s, i) = self.locate(x, y, z)?;
        Ok(match &self.sections[s] {
            Some(section) => Block::State(section.palette[section.indices[i] as usize].clone()),
            None => Block::State(BlockState::air()),
        })
    }

    fn set_block(&mut self, x: i32, y: i32, z: i32, block: &Block) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        let (s, i) = self.locate(x, y, z)?;
        let Some(state) = block.to_state() else {
            return Err(ChunkError::IncompatibleBlock {
                block: block.to_string(),
                variant: ChunkVariant::Anvil113,
            });
        };
        if state.is_air() && self.sections[s].is_none() {
            return Ok(());
        }
        let section = self.section_mut(s);
        let index = section.palette_index(&state)?;
        section.indices[i] = index;
        Ok(())
    }

    fn material(&self, x: i32, y: i32, z: i32) -> Result<Material, ChunkError> {
        let (s, i) = self.locate(x, y, z)?;
        Ok(match &self.sections[s] {
            Some(section) => section.palette[section.indices[i] as usize].material(),
            None => Material::AIR,
        })
    }

    fn sky_light(&self, x: i32, y: i32, z: i32) -> Result<u8, ChunkError> {
        let (s, i) = self.locate(x, y, z)?;
        Ok(self.sections[s]
            .as_ref()
            .and_then(|section| section.sky_light.as_deref())
            .map_or(15, |light| nibble::get(light, i)))
    }

    fn set_sky_light(&mut self, x: i32, y: i32, z: i32, level: u8) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        check_light(level)?;
        let (s, i) = self.locate(x, y, z)?;
        if level == 15 && self.sections[s].is_none() {
            return Ok(());
        }
        let light = self
            .section_mut(s)
            .sky_light
            .get_or_insert_with(|| vec![0xFF; SECTION_VOLUME / 2]);
        nibble::set(light, i, level);
        Ok(())
    }

    fn block_light(&self, x: i32, y: i32, z: i32) -> Result<u8, ChunkError> {
        let (s, i) = self.locate(x, y, z)?;
        Ok(self.sections[s]
            .as_ref()
            .and_then(|section| section.block_light.as_deref())
            .map_or(0, |light| nibble::get(light, i)))
    }

    fn set_block_light(&mut self, x: i32, y: i32, z: i32, level: u8) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        check_light(level)?;
        let (s, i) = self.locate(x, y, z)?;
        if level == 0 && self.sections[s].is_none() {
            return Ok(());
        }
        let light = self
            .section_mut(s)
            .block_light
            .get_or_insert_with(|| vec![0; SECTION_VOLUME / 2]);
        nibble::set(light, i, level);
        Ok(())
    }

    /// Backed by the `WORLD_SURFACE` heightmap.
    fn height(&self, x: i32, z: i32) -> Result<i32, ChunkError> {
        Ok(self.world_surface[column_index(x, z)?])
    }

    fn set_height(&mut self, x: i32, z: i32, height: i32) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        let i = column_index(x, z)?;
        check_height(height, self.max_height)?;
        self.world_surface[i] = height;
        Ok(())
    }

    fn biome(&self, x: i32, z: i32) -> Result<Option<i32>, ChunkError> {
        let i = column_index(x, z)?;
        Ok(self.biomes.as_ref().map(|biomes| biomes[i]))
    }

    fn set_biome(&mut self, x: i32, z: i32, biome: i32) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        let i = column_index(x, z)?;
        if biome < 0 {
            return Err(ChunkError::InvalidValue {
                what: "biome",
                value: biome as i64,
            });
        }
        self.biomes.get_or_insert_with(|| vec![DEFAULT_BIOME; 256])[i] = biome;
        Ok(())
    }

    fn entities(&self) -> &[Value] {
        &self.entities
    }

    fn set_entities(&mut self, entities: Vec<Value>) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        self.entities = entities;
        Ok(())
    }

    fn tile_entities(&self) -> &[Value] {
        &self.tile_entities
    }

    fn set_tile_entities(&mut self, tile_entities: Vec<Value>) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        self.tile_entities = tile_entities;
        Ok(())
    }
}

/// An empty chunk at DataVersion 1631, already marked complete.
pub fn create(x: i32, z: i32, max_height: i32) -> Result<Chunk, ChunkError> {
    let count = section_count(max_height, MAX_HEIGHT_LIMIT)?;
    Ok(Chunk::Anvil113(Anvil113Chunk {
        x,
        z,
        max_height,
        read_only: false,
        data_version: DATA_VERSION_MC_1_13_2,
        status: "postprocessed".to_string(),
        sections: vec![None; count],
        outer_light: Vec::new(),
        biomes: None,
        world_surface: vec![0; 256],
        motion_blocking: None,
        entities: Vec::new(),
        tile_entities: Vec::new(),
        last_update: 0,
        inhabited_time: 0,
    }))
}

fn decode_heightmap(name: &str, words: LongArray, max_height: i32) -> Result<Vec<i32>, ChunkError> {
    let heights = unpack(&words, HEIGHTMAP_BITS, 256)
        .ok_or_else(|| ChunkError::malformed(format!("{name} heightmap has {} longs", words.len())))?;
    if let Some(h) = heights.iter().find(|&&h| h as i32 > max_height) {
        return Err(ChunkError::malformed(format!(
            "{name} height {h} exceeds max height {max_height}"
        )));
    }
    Ok(heights.into_iter().map(|h| h as i32).collect())
}

fn encode_heightmap(heights: &[i32]) -> LongArray {
    LongArray::new(pack(heights.iter().map(|&h| h as u32), HEIGHTMAP_BITS))
}

pub fn decode(raw: &[u8], max_height: i32, read_only: bool) -> Result<Chunk, ChunkError> {
    let count = section_count(max_height, MAX_HEIGHT_LIMIT)?;
    let root: Anvil113Root = fastnbt::from_bytes(raw)?;
    let level = root.level;

    let mut sections = vec![None; count];
    let mut outer_light = Vec::new();
    for raw_section in level.sections {
        let y = raw_section.y;
        let light_only = raw_section.palette.is_none() && raw_section.block_states.is_none();
        let slot = match usize::try_from(y).ok().filter(|&s| s < count) {
            Some(slot) => slot,
            // The game keeps light-only sections just outside the world.
            None if light_only => {
                if outer_light.iter().any(|o: &OuterLight| o.y == y) {
                    return Err(ChunkError::malformed(format!("duplicate section Y {y}")));
                }
                let sky_light = raw_section.sky_light.map(from_byte_array);
                let block_light = raw_section.block_light.map(from_byte_array);
                for (name, light) in [("SkyLight", &sky_light), ("BlockLight", &block_light)] {
                    if let Some(light) = light {
                        expect_len(name, light, SECTION_VOLUME / 2)?;
                    }
                }
                debug!("Keeping light-only section Y {} outside the world", y);
                outer_light.push(OuterLight {
                    y,
                    sky_light,
                    block_light,
                });
                continue;
            }
            None => {
                return Err(ChunkError::malformed(format!(
                    "section Y {y} exceeds max height {max_height}"
                )));
            }
        };
        if sections[slot].is_some() {
            return Err(ChunkError::malformed(format!("duplicate section Y {y}")));
        }
        sections[slot] = Some(Section::decode(raw_section)?);
    }

    let biomes = match level.biomes {
        Some(biomes) => {
            let biomes = biomes.into_inner();
            expect_len("Biomes", &biomes, 256)?;
            Some(biomes)
        }
        None => None,
    };
    let world_surface = match level.heightmaps.world_surface {
        Some(words) => decode_heightmap("WORLD_SURFACE", words, max_height)?,
        None => vec![0; 256],
    };
    let motion_blocking = level
        .heightmaps
        .motion_blocking
        .map(|words| decode_heightmap("MOTION_BLOCKING", words, max_height))
        .transpose()?;

    Ok(Chunk::Anvil113(Anvil113Chunk {
        x: level.x_pos,
        z: level.z_pos,
        max_height,
        read_only,
        data_version: root.data_version,
        status: level.status,
        sections,
        outer_light,
        biomes,
        world_surface,
        motion_blocking,
        entities: level.entities,
        tile_entities: level.tile_entities,
        last_update: level.last_update,
        inhabited_time: level.inhabited_time,
    }))
}

pub fn encode(chunk: &Anvil113Chunk) -> Result<Vec<u8>, ChunkError> {
    let below = chunk.outer_light.iter().filter(|o| o.y < 0).map(OuterLight::encode);
    let above = chunk.outer_light.iter().filter(|o| o.y >= 0).map(OuterLight::encode);
    let sections = below
        .chain(
            chunk
                .sections
                .iter()
                .enumerate()
                .filter_map(|(y, section)| section.as_ref().map(|s| s.encode(y as i8))),
        )
        .chain(above)
        .collect();

    let root = Anvil113Root {
        data_version: chunk.data_version,
        level: Anvil113Level {
            x_pos: chunk.x,
            z_pos: chunk.z,
            status: chunk.status.clone(),
            sections,
            biomes: chunk.biomes.clone().map(IntArray::new),
            heightmaps: Heightmaps {
                world_surface: Some(encode_heightmap(&chunk.world_surface)),
                motion_blocking: chunk.motion_blocking.as_deref().map(encode_heightmap),
            },
            entities: chunk.entities.clone(),
            tile_entities: chunk.tile_entities.clone(),
            last_update: chunk.last_update,
            inhabited_time: chunk.inhabited_time,
        },
    };
    fastnbt::to_bytes(&root).map_err(|e| ChunkError::Encode(e.to_string()))
}

pub(crate) fn encode_chunk(chunk: &Chunk) -> Result<Vec<u8>, ChunkError> {
    match chunk {
        Chunk::Anvil113(c) => encode(c),
        other => Err(ChunkError::VariantMismatch {
            expected: ChunkVariant::Anvil113,
            found: other.variant(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inner(chunk: &mut Chunk) -> &mut Anvil113Chunk {
        match chunk {
            Chunk::Anvil113(c) => c,
            _ => panic!("wrong variant"),
        }
    }

    fn stone() -> Block {
        Block::named("minecraft:stone")
    }

    #[test]
    fn test_create_defaults() {
        let mut chunk = create(1, 2, 256).unwrap();
        assert_eq!(chunk.block(0, 0, 0).unwrap(), Block::State(BlockState::air()));
        assert_eq!(chunk.sky_light(0, 0, 0).unwrap(), 15);
        assert_eq!(chunk.biome(0, 0).unwrap(), None);
        let c = inner(&mut chunk);
        assert_eq!(c.data_version(), DATA_VERSION_MC_1_13_2);
        assert_eq!(c.status(), "postprocessed");
    }

    #[test]
    fn test_palette_grows_past_four_bits() {
        let mut chunk = create(0, 0, 256).unwrap();
        // 20 distinct states forces 5 bits per entry.
        for i in 0..20 {
            let state = BlockState::new("minecraft:oak_log").with_property("n", i.to_string());
            chunk.set_block(i % 16, 5, i / 16, &Block::State(state)).unwrap();
        }
        let bytes = encode_chunk(&chunk).unwrap();
        let decoded = decode(&bytes, 256, false).unwrap();
        assert_eq!(decoded, chunk);
        let expected = BlockState::new("minecraft:oak_log").with_property("n", "13");
        assert_eq!(decoded.block(13, 5, 0).unwrap(), Block::State(expected));
        assert!(chunk.set_block(16, 5, 0, &stone()).is_err());
    }

    #[test]
    fn test_legacy_blocks_convert() {
        let mut chunk = create(0, 0, 256).unwrap();
        chunk.set_block(1, 1, 1, &Block::legacy(12, 0)).unwrap();
        assert_eq!(chunk.block(1, 1, 1).unwrap(), Block::named("minecraft:sand"));
        assert!(matches!(
            chunk.set_block(1, 1, 1, &Block::legacy(12, 1)),
            Err(ChunkError::IncompatibleBlock { .. })
        ));
    }

    #[test]
    fn test_round_trip_with_heightmaps_and_biomes() {
        let mut chunk = create(-30, 12, 256).unwrap();
        chunk.set_block(3, 100, 4, &stone()).unwrap();
        chunk.set_block(3, 101, 4, &Block::named("minecraft:glowstone")).unwrap();
        chunk.set_height(3, 4, 102).unwrap();
        chunk.set_biome(0, 0, 7).unwrap();
        chunk.set_block_light(3, 102, 4, 14).unwrap();
        inner(&mut chunk).set_motion_blocking_height(3, 4, 256).unwrap();
        inner(&mut chunk).set_status("features").unwrap();

        let bytes = encode_chunk(&chunk).unwrap();
        let mut decoded = decode(&bytes, 256, false).unwrap();
        assert_eq!(decoded, chunk);
        assert_eq!(decoded.biome(0, 0).unwrap(), Some(7));
        assert_eq!(decoded.biome(1, 0).unwrap(), Some(DEFAULT_BIOME));
        assert_eq!(inner(&mut decoded).motion_blocking_height(3, 4).unwrap(), Some(256));
        assert_eq!(inner(&mut decoded).status(), "features");
    }

    #[test]
    fn test_compaction_drops_unused_entries() {
        let mut chunk = create(0, 0, 256).unwrap();
        chunk.set_block(0, 0, 0, &stone()).unwrap();
        chunk.set_block(0, 0, 0, &Block::named("minecraft:dirt")).unwrap();
        assert_eq!(inner(&mut chunk).compact_palettes().unwrap(), 1);
        assert_eq!(inner(&mut chunk).compact_palettes().unwrap(), 0);
        assert_eq!(chunk.block(0, 0, 0).unwrap(), Block::named("minecraft:dirt"));
        assert_eq!(chunk.block(1, 0, 0).unwrap(), Block::State(BlockState::air()));
    }

    fn note(n: usize) -> Block {
        Block::State(BlockState::new("minecraft:note_block").with_property("note", n.to_string()))
    }

    #[test]
    fn test_rewriting_one_block_keeps_palette_bounded() {
        let mut chunk = create(0, 0, 256).unwrap();
        for n in 0..=5000 {
            chunk.set_block(0, 0, 0, &note(n)).unwrap();
        }
        assert_eq!(chunk.block(0, 0, 0).unwrap(), note(5000));
        assert_eq!(chunk.block(1, 0, 0).unwrap(), Block::State(BlockState::air()));
        let palette_len = inner(&mut chunk).sections[0].as_ref().unwrap().palette.len();
        assert!(palette_len <= SECTION_VOLUME + 1);

        let decoded = decode(&encode_chunk(&chunk).unwrap(), 256, false).unwrap();
        assert_eq!(decoded.block(0, 0, 0).unwrap(), note(5000));
    }

    #[test]
    fn test_full_section_of_distinct_states() {
        let mut chunk = create(0, 0, 256).unwrap();
        for i in 0..SECTION_VOLUME {
            let (x, y, z) = ((i % 16) as i32, (i / 256) as i32, ((i / 16) % 16) as i32);
            chunk.set_block(x, y, z, &note(i)).unwrap();
        }
        for n in 0..3 {
            chunk.set_block(5, 5, 5, &note(SECTION_VOLUME + n)).unwrap();
        }
        assert_eq!(chunk.block(5, 5, 5).unwrap(), note(SECTION_VOLUME + 2));
        assert_eq!(chunk.block(15, 15, 15).unwrap(), note(SECTION_VOLUME - 1));
        assert_eq!(chunk.block(0, 0, 0).unwrap(), note(0));
    }

    #[test]
    fn test_light_only_sections() {
        let root = Anvil113Root {
            data_version: 1631,
            level: Anvil113Level {
                x_pos: 0,
                z_pos: 0,
                status: "full".to_string(),
                sections: vec![
                    Anvil113Section {
                        y: -1,
                        palette: None,
                        block_states: None,
                        sky_light: Some(fastnbt::ByteArray::new(vec![-1; 2048])),
                        block_light: None,
                    },
                    Anvil113Section {
                        y: 0,
                        palette: None,
                        block_states: None,
                        sky_light: Some(fastnbt::ByteArray::new(vec![0x33; 2048])),
                        block_light: None,
                    },
                ],
                biomes: None,
                heightmaps: Heightmaps::default(),
                entities: Vec::new(),
                tile_entities: Vec::new(),
                last_update: 0,
                inhabited_time: 0,
            },
        };
        let bytes = fastnbt::to_bytes(&root).unwrap();
        let chunk = decode(&bytes, 256, true).unwrap();
        assert_eq!(chunk.sky_light(0, 0, 0).unwrap(), 3);
        assert_eq!(chunk.block_light(0, 0, 0).unwrap(), 0);
        assert_eq!(chunk.block(0, 0, 0).unwrap(), Block::State(BlockState::air()));

        // The section below the world survives a rewrite.
        let reencoded: Anvil113Root = fastnbt::from_bytes(&encode_chunk(&chunk).unwrap()).unwrap();
        let below = &reencoded.level.sections[0];
        assert_eq!(below.y, -1);
        assert!(below.palette.is_none());
        assert_eq!(
            below.sky_light.as_ref().map(|light| light.len()),
            Some(2048)
        );
        assert_eq!(decode(&encode_chunk(&chunk).unwrap(), 256, true).unwrap(), chunk);
    }

    #[test]
    fn test_palette_index_out_of_range_is_malformed() {
        let root = Anvil113Root {
            data_version: 1631,
            level: Anvil113Level {
                x_pos: 0,
                z_pos: 0,
                status: "full".to_string(),
                sections: vec![Anvil113Section {
                    y: 0,
                    palette: Some(vec![BlockState::air()]),
                    block_states: Some(LongArray::new(vec![0x5; 256])),
                    sky_light: None,
                    block_light: None,
                }],
                biomes: None,
                heightmaps: Heightmaps::default(),
                entities: Vec::new(),
                tile_entities: Vec::new(),
                last_update: 0,
                inhabited_time: 0,
            },
        };
        let bytes = fastnbt::to_bytes(&root).unwrap();
        assert!(matches!(
            decode(&bytes, 256, false),
            Err(ChunkError::MalformedChunk(_))
        ));
    }

    #[test]
    fn test_missing_data_version_is_malformed() {
        let root = crate::nbt::McRegionRoot {
            level: crate::nbt::McRegionLevel {
                x_pos: 0,
                z_pos: 0,
                blocks: fastnbt::ByteArray::new(Vec::new()),
                data: fastnbt::ByteArray::new(Vec::new()),
                sky_light: fastnbt::ByteArray::new(Vec::new()),
                block_light: fastnbt::ByteArray::new(Vec::new()),
                height_map: fastnbt::ByteArray::new(Vec::new()),
                entities: Vec::new(),
                tile_entities: Vec::new(),
                last_update: 0,
                terrain_populated: false,
            },
        };
        let bytes = fastnbt::to_bytes(&root).unwrap();
        assert!(matches!(
            decode(&bytes, 256, false),
            Err(ChunkError::MalformedChunk(_))
        ));
    }

    #[test]
    fn test_truncated_payload_is_malformed() {
        let mut bytes = encode_chunk(&create(0, 0, 256).unwrap()).unwrap();
        bytes.truncate(10);
        assert!(matches!(
            decode(&bytes, 256, false),
            Err(ChunkError::MalformedChunk(_))
        ));
    }
}

//! Anvil chunks from 1.2 up to 1.12.2: 16-high sections of numeric blocks.

use fastnbt::{IntArray, Value};

use crate::block::Block;
use crate::nbt::{Anvil12Level, Anvil12Root, Anvil12Section, from_byte_array, to_byte_array};
use crate::{
    Chunk, ChunkData, ChunkError, ChunkVariant, DATA_VERSION_MC_1_12_2, SECTION_HEIGHT,
    check_height, check_light, check_position, check_writable, column_index, expect_len, nibble,
    section_count,
};

const MAX_HEIGHT_LIMIT: i32 = 256;
const SECTION_VOLUME: usize = 4096;
const BIOME_UNSET: u8 = 255;

#[derive(Debug, Clone, PartialEq)]
struct Section {
    blocks: Vec<u8>,
    add: Option<Vec<u8>>,
    data: Vec<u8>,
    sky_light: Vec<u8>,
    block_light: Vec<u8>,
}

impl Section {
    fn empty() -> Self {
        Self {
            blocks: vec![0; SECTION_VOLUME],
            add: None,
            data: vec![0; SECTION_VOLUME / 2],
            sky_light: vec![0xFF; SECTION_VOLUME / 2],
            block_light: vec![0; SECTION_VOLUME / 2],
        }
    }

    fn decode(raw: Anvil12Section) -> Result<Self, ChunkError> {
        let section = Self {
            blocks: from_byte_array(raw.blocks),
            add: raw.add.map(from_byte_array),
            data: from_byte_array(raw.data),
            sky_light: from_byte_array(raw.sky_light),
            block_light: from_byte_array(raw.block_light),
        };
        expect_len("Blocks", &section.blocks, SECTION_VOLUME)?;
        if let Some(add) = &section.add {
            expect_len("Add", add, SECTION_VOLUME / 2)?;
        }
        expect_len("Data", &section.data, SECTION_VOLUME / 2)?;
        expect_len("SkyLight", &section.sky_light, SECTION_VOLUME / 2)?;
        expect_len("BlockLight", &section.block_light, SECTION_VOLUME / 2)?;
        Ok(section)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Anvil12Chunk {
    x: i32,
    z: i32,
    max_height: i32,
    read_only: bool,
    data_version: Option<i32>,
    sections: Vec<Option<Section>>,
    biomes: Vec<u8>,
    height_map: Vec<i32>,
    entities: Vec<Value>,
    tile_entities: Vec<Value>,
    last_update: i64,
    inhabited_time: i64,
    terrain_populated: bool,
    light_populated: bool,
}

impl Anvil12Chunk {
    /// `None` for chunks written before 1.9.
    pub fn data_version(&self) -> Option<i32> {
        self.data_version
    }

    pub fn light_populated(&self) -> bool {
        self.light_populated
    }

    pub fn set_light_populated(&mut self, populated: bool) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        self.light_populated = populated;
        Ok(())
    }

    pub fn terrain_populated(&self) -> bool {
        self.terrain_populated
    }

    /// Section and in-section index of a block position.
    fn locate(&self, x: i32, y: i32, z: i32) -> Result<(usize, usize), ChunkError> {
        check_position(x, y, z, self.max_height)?;
        let local = (y % SECTION_HEIGHT) * 256 + z * 16 + x;
        Ok(((y / SECTION_HEIGHT) as usize, local as usize))
    }

    fn section_mut(&mut self, index: usize) -> &mut Section {
        self.sections[index].get_or_insert_with(Section::empty)
    }
}

impl ChunkData for Anvil12Chunk {
    fn variant(&self) -> ChunkVariant {
        ChunkVariant::Anvil12
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
        let Some(section) = &self.sections[s] else {
            return Ok(Block::AIR);
        };
        let high = section.add.as_deref().map_or(0, |add| nibble::get(add, i)) as u16;
        Ok(Block::legacy(
            (high << 8) | section.blocks[i] as u16,
            nibble::get(&section.data, i),
        ))
    }

    fn set_block(&mut self, x: i32, y: i32, z: i32, block: &Block) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        let (s, i) = self.locate(x, y, z)?;
        let (id, data) = match block.to_legacy() {
            Some((id, data)) if id < 4096 && data <= 15 => (id, data),
            _ => {
                return Err(ChunkError::IncompatibleBlock {
                    block: block.to_string(),
                    variant: ChunkVariant::Anvil12,
                });
            }
        };
        if id == 0 && data == 0 && self.sections[s].is_none() {
            return Ok(());
        }
        let section = self.section_mut(s);
        section.blocks[i] = (id & 0xFF) as u8;
        nibble::set(&mut section.data, i, data);
        let high = (id >> 8) as u8;
        if high != 0 || section.add.is_some() {
            let add = section.add.get_or_insert_with(|| vec![0; SECTION_VOLUME / 2]);
            nibble::set(add, i, high);
        }
        Ok(())
    }

    fn sky_light(&self, x: i32, y: i32, z: i32) -> Result<u8, ChunkError> {
        let (s, i) = self.locate(x, y, z)?;
        Ok(self.sections[s]
            .as_ref()
            .map_or(15, |section| nibble::get(&section.sky_light, i)))
    }

    fn set_sky_light(&mut self, x: i32, y: i32, z: i32, level: u8) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        check_light(level)?;
        let (s, i) = self.locate(x, y, z)?;
        if level == 15 && self.sections[s].is_none() {
            return Ok(());
        }
        nibble::set(&mut self.section_mut(s).sky_light, i, level);
        Ok(())
    }

    fn block_light(&self, x: i32, y: i32, z: i32) -> Result<u8, ChunkError> {
        let (s, i) = self.locate(x, y, z)?;
        Ok(self.sections[s]
            .as_ref()
            .map_or(0, |section| nibble::get(&section.block_light, i)))
    }

    fn set_block_light(&mut self, x: i32, y: i32, z: i32, level: u8) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        check_light(level)?;
        let (s, i) = self.locate(x, y, z)?;
        if level == 0 && self.sections[s].is_none() {
            return Ok(());
        }
        nibble::set(&mut self.section_mut(s).block_light, i, level);
        Ok(())
    }

    fn height(&self, x: i32, z: i32) -> Result<i32, ChunkError> {
        Ok(self.height_map[column_index(x, z)?])
    }

    fn set_height(&mut self, x: i32, z: i32, height: i32) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        let i = column_index(x, z)?;
        check_height(height, self.max_height)?;
        self.height_map[i] = height;
        Ok(())
    }

    fn biome(&self, x: i32, z: i32) -> Result<Option<i32>, ChunkError> {
        let biome = self.biomes[column_index(x, z)?];
        Ok((biome != BIOME_UNSET).then_some(biome as i32))
    }

    fn set_biome(&mut self, x: i32, z: i32, biome: i32) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        let i = column_index(x, z)?;
        if !(0..BIOME_UNSET as i32).contains(&biome) {
            return Err(ChunkError::InvalidValue {
                what: "biome",
                value: biome as i64,
            });
        }
        self.biomes[i] = biome as u8;
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

/// An empty chunk stamped with the last pre-1.13 DataVersion.
pub fn create(x: i32, z: i32, max_height: i32) -> Result<Chunk, ChunkError> {
    let count = section_count(max_height, MAX_HEIGHT_LIMIT)?;
    Ok(Chunk::Anvil12(Anvil12Chunk {
        x,
        z,
        max_height,
        read_only: false,
        data_version: Some(DATA_VERSION_MC_1_12_2),
        sections: vec![None; count],
        biomes: vec![BIOME_UNSET; 256],
        height_map: vec![0; 256],
        entities: Vec::new(),
        tile_entities: Vec::new(),
        last_update: 0,
        inhabited_time: 0,
        terrain_populated: true,
        light_populated: false,
    }))
}

pub fn decode(raw: &[u8], max_height: i32, read_only: bool) -> Result<Chunk, ChunkError> {
    let count = section_count(max_height, MAX_HEIGHT_LIMIT)?;
    let root: Anvil12Root = fastnbt::from_bytes(raw)?;
    let level = root.level;

    let mut sections = vec![None; count];
    for raw_section in level.sections {
        let y = raw_section.y;
        let slot = usize::try_from(y)
            .ok()
            .filter(|&s| s < count)
            .ok_or_else(|| ChunkError::malformed(format!("section Y {y} exceeds max height {max_height}")))?;
        if sections[slot].is_some() {
            return Err(ChunkError::malformed(format!("duplicate section Y {y}")));
        }
        sections[slot] = Some(Section::decode(raw_section)?);
    }

    let biomes = match level.biomes {
        Some(biomes) => {
            let biomes = from_byte_array(biomes);
            expect_len("Biomes", &biomes, 256)?;
            biomes
        }
        None => vec![BIOME_UNSET; 256],
    };
    let height_map = match level.height_map {
        Some(heights) => {
            let heights = heights.into_inner();
            expect_len("HeightMap", &heights, 256)?;
            if let Some(h) = heights.iter().find(|h| !(0..=max_height).contains(*h)) {
                return Err(ChunkError::malformed(format!(
                    "height {h} exceeds max height {max_height}"
                )));
            }
            heights
        }
        None => vec![0; 256],
    };

    Ok(Chunk::Anvil12(Anvil12Chunk {
        x: level.x_pos,
        z: level.z_pos,
        max_height,
        read_only,
        data_version: root.data_version,
        sections,
        biomes,
        height_map,
        entities: level.entities,
        tile_entities: level.tile_entities,
        last_update: level.last_update,
        inhabited_time: level.inhabited_time,
        terrain_populated: level.terrain_populated,
        light_populated: level.light_populated,
    }))
}

pub fn encode(chunk: &Anvil12Chunk) -> Result<Vec<u8>, ChunkError> {
    let sections = chunk
        .sections
        .iter()
        .enumerate()
        .filter_map(|(y, section)| section.as_ref().map(|s| (y, s)))
        .map(|(y, s)| Anvil12Section {
            y: y as i8,
            blocks: to_byte_array(&s.blocks),
            add: s.add.as_deref().map(to_byte_array),
            data: to_byte_array(&s.data),
            sky_light: to_byte_array(&s.sky_light),
            block_light: to_byte_array(&s.block_light),
        })
        .collect();

    let root = Anvil12Root {
        data_version: chunk.data_version,
        level: Anvil12Level {
            x_pos: chunk.x,
            z_pos: chunk.z,
            sections,
            biomes: Some(to_byte_array(&chunk.biomes)),
            height_map: Some(IntArray::new(chunk.height_map.clone())),
            entities: chunk.entities.clone(),
            tile_entities: chunk.tile_entities.clone(),
            last_update: chunk.last_update,
            inhabited_time: chunk.inhabited_time,
            terrain_populated: chunk.terrain_populated,
            light_populated: chunk.light_populated,
        },
    };
    fastnbt::to_bytes(&root).map_err(|e| ChunkError::Encode(e.to_string()))
}

pub(crate) fn encode_chunk(chunk: &Chunk) -> Result<Vec<u8>, ChunkError> {
    match chunk {
        Chunk::Anvil12(c) => encode(c),
        other => Err(ChunkError::VariantMismatch {
            expected: ChunkVariant::Anvil12,
            found: other.variant(),
        }),
    }
}

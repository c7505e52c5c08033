//! MCRegion chunks (Beta 1.3 - 1.1): one flat column per chunk.

use fastnbt::Value;

use crate::block::Block;
use crate::nbt::{McRegionLevel, McRegionRoot, from_byte_array, to_byte_array};
use crate::{
    CHUNK_SIZE, Chunk, ChunkData, ChunkError, ChunkVariant, check_height, check_light,
    check_position, check_writable, column_index, expect_len, nibble, section_count,
};

/// The format stores heights in a byte.
const MAX_HEIGHT_LIMIT: i32 = 128;

#[derive(Debug, Clone, PartialEq)]
pub struct McRegionChunk {
    x: i32,
    z: i32,
    max_height: i32,
    read_only: bool,
    blocks: Vec<u8>,
    data: Vec<u8>,
    sky_light: Vec<u8>,
    block_light: Vec<u8>,
    height_map: Vec<u8>,
    entities: Vec<Value>,
    tile_entities: Vec<Value>,
    last_update: i64,
    terrain_populated: bool,
}

impl McRegionChunk {
    pub fn last_update(&self) -> i64 {
        self.last_update
    }

    pub fn terrain_populated(&self) -> bool {
        self.terrain_populated
    }

    pub fn set_terrain_populated(&mut self, populated: bool) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        self.terrain_populated = populated;
        Ok(())
    }

    fn index(&self, x: i32, y: i32, z: i32) -> Result<usize, ChunkError> {
        check_position(x, y, z, self.max_height)?;
        Ok((y + z * self.max_height + x * self.max_height * CHUNK_SIZE) as usize)
    }
}

impl ChunkData for McRegionChunk {
    fn variant(&self) -> ChunkVariant {
        ChunkVariant::McRegion
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
        let i = self.index(x, y, z)?;
        Ok(Block::legacy(self.blocks[i] as u16, nibble::get(&self.data, i)))
    }

    fn set_block(&mut self, x: i32, y: i32, z: i32, block: &Block) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        let i = self.index(x, y, z)?;
        let (id, data) = match block.to_legacy() {
            Some((id, data)) if id <= u8::MAX as u16 && data <= 15 => (id as u8, data),
            _ => {
                return Err(ChunkError::IncompatibleBlock {
                    block: block.to_string(),
                    variant: ChunkVariant::McRegion,
                });
            }
        };
        self.blocks[i] = id;
        nibble::set(&mut self.data, i, data);
        Ok(())
    }

    fn sky_light(&self, x: i32, y: i32, z: i32) -> Result<u8, ChunkError> {
        let i = self.index(x, y, z)?;
        Ok(nibble::get(&self.sky_light, i))
    }

    fn set_sky_light(&mut self, x: i32, y: i32, z: i32, level: u8) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        check_light(level)?;
        let i = self.index(x, y, z)?;
        nibble::set(&mut self.sky_light, i, level);
        Ok(())
    }

    fn block_light(&self, x: i32, y: i32, z: i32) -> Result<u8, ChunkError> {
        let i = self.index(x, y, z)?;
        Ok(nibble::get(&self.block_light, i))
    }

    fn set_block_light(&mut self, x: i32, y: i32, z: i32, level: u8) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        check_light(level)?;
        let i = self.index(x, y, z)?;
        nibble::set(&mut self.block_light, i, level);
        Ok(())
    }

    fn height(&self, x: i32, z: i32) -> Result<i32, ChunkError> {
        Ok(self.height_map[column_index(x, z)?] as i32)
    }

    fn set_height(&mut self, x: i32, z: i32, height: i32) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        let i = column_index(x, z)?;
        check_height(height, self.max_height)?;
        self.height_map[i] = height as u8;
        Ok(())
    }

    fn biome(&self, x: i32, z: i32) -> Result<Option<i32>, ChunkError> {
        column_index(x, z)?;
        Ok(None)
    }

    fn set_biome(&mut self, _x: i32, _z: i32, _biome: i32) -> Result<(), ChunkError> {
        check_writable(self.read_only, self.x, self.z)?;
        Err(ChunkError::Unsupported {
            variant: ChunkVariant::McRegion,
            what: "biomes",
        })
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

/// A fully lit, empty chunk.
pub fn create(x: i32, z: i32, max_height: i32) -> Result<Chunk, ChunkError> {
    section_count(max_height, MAX_HEIGHT_LIMIT)?;
    let volume = (CHUNK_SIZE * CHUNK_SIZE * max_height) as usize;
    Ok(Chunk::McRegion(McRegionChunk {
        x,
        z,
        max_height,
        read_only: false,
        blocks: vec![0; volume],
        data: vec![0; volume / 2],
        sky_light: vec![0xFF; volume / 2],
        block_light: vec![0; volume / 2],
        height_map: vec![0; 256],
        entities: Vec::new(),
        tile_entities: Vec::new(),
        last_update: 0,
        terrain_populated: true,
    }))
}

pub fn decode(raw: &[u8], max_height: i32, read_only: bool) -> Result<Chunk, ChunkError> {
    section_count(max_height, MAX_HEIGHT_LIMIT)?;
    let root: McRegionRoot = fastnbt::from_bytes(raw)?;
    let level = root.level;
    let volume = (CHUNK_SIZE * CHUNK_SIZE * max_height) as usize;

    let blocks = from_byte_array(level.blocks);
    let data = from_byte_array(level.data);
    let sky_light = from_byte_array(level.sky_light);
    let block_light = from_byte_array(level.block_light);
    let height_map = from_byte_array(level.height_map);
    expect_len("Blocks", &blocks, volume)?;
    expect_len("Data", &data, volume / 2)?;
    expect_len("SkyLight", &sky_light, volume / 2)?;
    expect_len("BlockLight", &block_light, volume / 2)?;
    expect_len("HeightMap", &height_map, 256)?;
    if let Some(&h) = height_map.iter().find(|&&h| h as i32 > max_height) {
        return Err(ChunkError::malformed(format!(
            "height {h} exceeds max height {max_height}"
        )));
    }

    Ok(Chunk::McRegion(McRegionChunk {
        x: level.x_pos,
        z: level.z_pos,
        max_height,
        read_only,
        blocks,
        data,
        sky_light,
        block_light,
        height_map,
        entities: level.entities,
        tile_entities: level.tile_entities,
        last_update: level.last_update,
        terrain_populated: level.terrain_populated,
    }))
}

pub fn encode(chunk: &McRegionChunk) -> Result<Vec<u8>, ChunkError> {
    let root = McRegionRoot {
        level: McRegionLevel {
            x_pos: chunk.x,
            z_pos: chunk.z,
            blocks: to_byte_array(&chunk.blocks),
            data: to_byte_array(&chunk.data),
            sky_light: to_byte_array(&chunk.sky_light),
            block_light: to_byte_array(&chunk.block_light),
            height_map: to_byte_array(&chunk.height_map),
            entities: chunk.entities.clone(),
            tile_entities: chunk.tile_entities.clone(),
            last_update: chunk.last_update,
            terrain_populated: chunk.terrain_populated,
        },
    };
    fastnbt::to_bytes(&root).map_err(|e| ChunkError::Encode(e.to_string()))
}

pub(crate) fn encode_chunk(chunk: &Chunk) -> Result<Vec<u8>, ChunkError> {
    match chunk {
        Chunk::McRegion(c) => encode(c),
        other => Err(ChunkError::VariantMismatch {
            expected: ChunkVariant::McRegion,
            found: other.variant(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_is_empty_and_lit() {
        let chunk = create(5, 6, 128).unwrap();
        assert_eq!(chunk.block(0, 0, 0).unwrap(), Block::AIR);
        assert_eq!(chunk.sky_light(15, 127, 15).unwrap(), 15);
        assert_eq!(chunk.block_light(15, 127, 15).unwrap(), 0);
        assert_eq!(chunk.biome(0, 0).unwrap(), None);
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let mut chunk = create(-3, 9, 128).unwrap();
        chunk.set_block(1, 64, 2, &Block::legacy(17, 2)).unwrap();
        chunk.set_block(15, 0, 15, &Block::named("minecraft:bedrock")).unwrap();
        chunk.set_sky_light(1, 63, 2, 4).unwrap();
        chunk.set_block_light(3, 3, 3, 9).unwrap();
        chunk.set_height(1, 2, 65).unwrap();
        chunk.set_entities(vec![Value::String("Pig".to_string())]).unwrap();

        let bytes = encode_chunk(&chunk).unwrap();
        let decoded = decode(&bytes, 128, false).unwrap();
        assert_eq!(decoded, chunk);
        assert_eq!(decoded.block(15, 0, 15).unwrap(), Block::legacy(7, 0));
    }

    #[test]
    fn test_column_layout() {
        let mut chunk = create(0, 0, 128).unwrap();
        chunk.set_block(1, 2, 3, &Block::legacy(1, 0)).unwrap();
        let Chunk::McRegion(inner) = &chunk else {
            panic!("wrong variant");
        };
        assert_eq!(inner.blocks[2 + 3 * 128 + 128 * 16], 1);
    }

    #[test]
    fn test_incompatible_blocks() {
        let mut chunk = create(0, 0, 128).unwrap();
        let err = chunk
            .set_block(0, 0, 0, &Block::named("minecraft:sculk"))
            .unwrap_err();
        assert!(matches!(err, ChunkError::IncompatibleBlock { .. }));
        let err = chunk.set_block(0, 0, 0, &Block::legacy(300, 0)).unwrap_err();
        assert!(matches!(err, ChunkError::IncompatibleBlock { .. }));
        assert!(matches!(
            chunk.set_biome(0, 0, 1).unwrap_err(),
            ChunkError::Unsupported { .. }
        ));
    }

    #[test]
    fn test_bounds_and_values() {
        let mut chunk = create(0, 0, 128).unwrap();
        assert!(matches!(chunk.block(0, 128, 0), Err(ChunkError::OutOfBounds { .. })));
        assert!(matches!(chunk.block(-1, 0, 0), Err(ChunkError::OutOfBounds { .. })));
        assert!(matches!(
            chunk.set_sky_light(0, 0, 0, 16),
            Err(ChunkError::InvalidValue { .. })
        ));
        assert!(chunk.set_height(0, 0, 129).is_err());
        assert!(create(0, 0, 256).is_err());
    }

    #[test]
    fn test_read_only_rejects_every_setter() {
        let bytes = encode_chunk(&create(1, 1, 128).unwrap()).unwrap();
        let mut chunk = decode(&bytes, 128, true).unwrap();
        let before = chunk.clone();
        assert!(matches!(
            chunk.set_block(0, 0, 0, &Block::legacy(1, 0)),
            Err(ChunkError::ReadOnlyViolation { x: 1, z: 1 })
        ));
        assert!(chunk.set_sky_light(0, 0, 0, 1).is_err());
        assert!(chunk.set_block_light(0, 0, 0, 1).is_err());
        assert!(chunk.set_height(0, 0, 1).is_err());
        assert!(chunk.set_entities(Vec::new()).is_err());
        assert!(chunk.set_tile_entities(Vec::new()).is_err());
        assert_eq!(chunk, before);
    }

    #[test]
    fn test_decode_rejects_wrong_height() {
        let bytes = encode_chunk(&create(0, 0, 64).unwrap()).unwrap();
        assert!(matches!(
            decode(&bytes, 128, false),
            Err(ChunkError::MalformedChunk(_))
        ));
        assert!(decode(&bytes, 64, false).is_ok());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode(&[1, 2, 3], 128, false),
            Err(ChunkError::MalformedChunk(_))
        ));
    }

    #[test]
    fn test_encode_checks_variant() {
        let chunk = crate::anvil12::create(0, 0, 256).unwrap();
        assert!(matches!(
            encode_chunk(&chunk),
            Err(ChunkError::VariantMismatch { .. })
        ));
    }
}

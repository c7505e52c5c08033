//! NBT (Named Binary Tag) wire structures for the three chunk formats.
//!
//! These are (de)serialized with fastnbt and converted to and from the
//! in-memory chunk types by the codec modules.

use fastnbt::{ByteArray, IntArray, LongArray, Value};
use serde::{Deserialize, Serialize};

use crate::block::BlockState;

/// Just enough of a payload to read the format-version marker.
#[derive(Debug, Deserialize)]
pub struct DataVersionProbe {
    #[serde(rename = "DataVersion", default)]
    pub data_version: Option<i32>,
}

// --- MCRegion (Beta 1.3 - 1.1) ---

#[derive(Debug, Serialize, Deserialize)]
pub struct McRegionRoot {
    #[serde(rename = "Level")]
    pub level: McRegionLevel,
}

/// Flat column layout: every array covers the full chunk height.
#[derive(Debug, Serialize, Deserialize)]
pub struct McRegionLevel {
    #[serde(rename = "xPos")]
    pub x_pos: i32,
    #[serde(rename = "zPos")]
    pub z_pos: i32,

    #[serde(rename = "Blocks")]
    pub blocks: ByteArray,
    #[serde(rename = "Data")]
    pub data: ByteArray,
    #[serde(rename = "SkyLight")]
    pub sky_light: ByteArray,
    #[serde(rename = "BlockLight")]
    pub block_light: ByteArray,
    #[serde(rename = "HeightMap")]
    pub height_map: ByteArray,

    #[serde(rename = "Entities", default)]
    pub entities: Vec<Value>,
    #[serde(rename = "TileEntities", default)]
    pub tile_entities: Vec<Value>,

    #[serde(rename = "LastUpdate", default)]
    pub last_update: i64,
    #[serde(rename = "TerrainPopulated", default)]
    pub terrain_populated: bool,
}

// --- Anvil, before the 1.13 block palette ---

#[derive(Debug, Serialize, Deserialize)]
pub struct Anvil12Root {
    // Absent before 1.9; 1.9 - 1.12.2 write values up to 1343.
    #[serde(rename = "DataVersion", default, skip_serializing_if = "Option::is_none")]
    pub data_version: Option<i32>,
    #[serde(rename = "Level")]
    pub level: Anvil12Level,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Anvil12Level {
    #[serde(rename = "xPos")]
    pub x_pos: i32,
    #[serde(rename = "zPos")]
    pub z_pos: i32,

    #[serde(rename = "Sections", default)]
    pub sections: Vec<Anvil12Section>,

    #[serde(rename = "Biomes", default, skip_serializing_if = "Option::is_none")]
    pub biomes: Option<ByteArray>,
    #[serde(rename = "HeightMap", default, skip_serializing_if = "Option::is_none")]
    pub height_map: Option<IntArray>,

    #[serde(rename = "Entities", default)]
    pub entities: Vec<Value>,
    #[serde(rename = "TileEntities", default)]
    pub tile_entities: Vec<Value>,

    #[serde(rename = "LastUpdate", default)]
    pub last_update: i64,
    #[serde(rename = "InhabitedTime", default)]
    pub inhabited_time: i64,
    #[serde(rename = "TerrainPopulated", default)]
    pub terrain_populated: bool,
    #[serde(rename = "LightPopulated", default)]
    pub light_populated: bool,
}

// --- Section (16x16x16 Cube) ---
#[derive(Debug, Serialize, Deserialize)]
pub struct Anvil12Section {
    #[serde(rename = "Y")]
    pub y: i8,
    #[serde(rename = "Blocks")]
    pub blocks: ByteArray,
    // High nibble of block ids above 255.
    #[serde(rename = "Add", default, skip_serializing_if = "Option::is_none")]
    pub add: Option<ByteArray>,
    #[serde(rename = "Data")]
    pub data: ByteArray,
    #[serde(rename = "SkyLight")]
    pub sky_light: ByteArray,
    #[serde(rename = "BlockLight")]
    pub block_light: ByteArray,
}

// --- Anvil 1.13 (paletted sections) ---

#[derive(Debug, Serialize, Deserialize)]
pub struct Anvil113Root {
    #[serde(rename = "DataVersion")]
    pub data_version: i32,
    #[serde(rename = "Level")]
    pub level: Anvil113Level,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Anvil113Level {
    #[serde(rename = "xPos")]
    pub x_pos: i32,
    #[serde(rename = "zPos")]
    pub z_pos: i32,

    // "postprocessed" or "full" tells the game the chunk is complete.
    #[serde(rename = "Status", default = "default_status")]
    pub status: String,

    #[serde(rename = "Sections", default)]
    pub sections: Vec<Anvil113Section>,

    #[serde(rename = "Biomes", default, skip_serializing_if = "Option::is_none")]
    pub biomes: Option<IntArray>,
    #[serde(rename = "Heightmaps", default)]
    pub heightmaps: Heightmaps,

    #[serde(rename = "Entities", default)]
    pub entities: Vec<Value>,
    #[serde(rename = "TileEntities", default)]
    pub tile_entities: Vec<Value>,

    #[serde(rename = "LastUpdate", default)]
    pub last_update: i64,
    #[serde(rename = "InhabitedTime", default)]
    pub inhabited_time: i64,
}

fn default_status() -> String {
    "empty".to_string()
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Heightmaps {
    #[serde(rename = "WORLD_SURFACE", default, skip_serializing_if = "Option::is_none")]
    pub world_surface: Option<LongArray>,
    #[serde(rename = "MOTION_BLOCKING", default, skip_serializing_if = "Option::is_none")]
    pub motion_blocking: Option<LongArray>,
}

// --- Block Palette ---
// Instead of storing 4096 block ids, a section stores the list of unique
// block states (Palette) and bit-packed indices into it (BlockStates).
// Light-only sections carry neither.
#[derive(Debug, Serialize, Deserialize)]
pub struct Anvil113Section {
    #[serde(rename = "Y")]
    pub y: i8,
    #[serde(rename = "Palette", default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<Vec<BlockState>>,
    #[serde(rename = "BlockStates", default, skip_serializing_if = "Option::is_none")]
    pub block_states: Option<LongArray>,
    #[serde(rename = "SkyLight", default, skip_serializing_if = "Option::is_none")]
    pub sky_light: Option<ByteArray>,
    #[serde(rename = "BlockLight", default, skip_serializing_if = "Option::is_none")]
    pub block_light: Option<ByteArray>,
}

/// NBT byte arrays are signed; chunk data is handled as unsigned bytes.
pub(crate) fn to_byte_array(bytes: &[u8]) -> ByteArray {
    ByteArray::new(bytes.iter().map(|&b| b as i8).collect())
}

pub(crate) fn from_byte_array(array: ByteArray) -> Vec<u8> {
    array.into_inner().into_iter().map(|b| b as u8).collect()
}

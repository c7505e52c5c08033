//! Block identities for both chunk generations.
//!
//! Pre-1.13 chunks store numeric `(id, data)` pairs; 1.13 chunks store named
//! block states. A small table of common blocks maps between the two and
//! carries the lighting properties post-processing needs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A named block state, as found in a 1.13 section palette.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockState {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Properties", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl BlockState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn air() -> Self {
        Self::new("minecraft:air")
    }

    pub fn is_air(&self) -> bool {
        AIR_NAMES.contains(&self.name.as_str())
    }

    pub fn material(&self) -> Material {
        if self.is_air() {
            return Material::AIR;
        }
        KNOWN_BLOCKS
            .iter()
            .find(|known| known.name == self.name)
            .map_or(Material::SOLID, |known| known.material)
    }
}

/// A block as stored by one of the chunk formats.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Block {
    Legacy { id: u16, data: u8 },
    State(BlockState),
}

impl Block {
    pub const AIR: Block = Block::Legacy { id: 0, data: 0 };

    pub fn legacy(id: u16, data: u8) -> Self {
        Block::Legacy { id, data }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Block::State(BlockState::new(name))
    }

    pub fn is_air(&self) -> bool {
        match self {
            Block::Legacy { id, .. } => *id == 0,
            Block::State(state) => state.is_air(),
        }
    }

    pub fn material(&self) -> Material {
        match self {
            Block::Legacy { id, .. } => legacy_material(*id),
            Block::State(state) => state.material(),
        }
    }

    /// Numeric form, converting named states through the known-block table.
    pub fn to_legacy(&self) -> Option<(u16, u8)> {
        match self {
            Block::Legacy { id, data } => Some((*id, *data)),
            Block::State(state) if state.is_air() => Some((0, 0)),
            Block::State(state) => KNOWN_BLOCKS
                .iter()
                .find(|known| known.name == state.name)
                .map(|known| (known.id, known.data)),
        }
    }

    /// Named form, converting numeric blocks through the known-block table.
    pub fn to_state(&self) -> Option<BlockState> {
        match self {
            Block::State(state) => Some(state.clone()),
            Block::Legacy { id, data } => KNOWN_BLOCKS
                .iter()
                .find(|known| known.id == *id && known.data == *data)
                .map(|known| BlockState::new(known.name)),
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Legacy { id, data } => write!(f, "block {id}:{data}"),
            Block::State(state) if state.properties.is_empty() => f.write_str(&state.name),
            Block::State(state) => {
                let props: Vec<String> = state
                    .properties
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect();
                write!(f, "{}[{}]", state.name, props.join(","))
            }
        }
    }
}

/// Lighting-relevant properties of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Material {
    /// Light lost when passing through (0 transparent, 15 opaque).
    pub opacity: u8,
    /// Block light emitted (0-15).
    pub emission: u8,
    pub motion_blocking: bool,
}

impl Material {
    pub const AIR: Material = Material::new(0, 0, false);
    /// Assumed for blocks missing from the table.
    pub const SOLID: Material = Material::new(15, 0, true);

    const fn new(opacity: u8, emission: u8, motion_blocking: bool) -> Self {
        Self {
            opacity,
            emission,
            motion_blocking,
        }
    }

    pub fn is_transparent(self) -> bool {
        self.opacity == 0
    }
}

const AIR_NAMES: [&str; 3] = ["minecraft:air", "minecraft:cave_air", "minecraft:void_air"];

struct KnownBlock {
    id: u16,
    data: u8,
    name: &'static str,
    material: Material,
}

const fn known(id: u16, data: u8, name: &'static str, material: Material) -> KnownBlock {
    KnownBlock {
        id,
        data,
        name,
        material,
    }
}

const SOLID: Material = Material::SOLID;
const PLANT: Material = Material::new(0, 0, false);

// First match wins in both directions, so canonical ids come first.
const KNOWN_BLOCKS: &[KnownBlock] = &[
    known(0, 0, "minecraft:air", Material::AIR),
    known(1, 0, "minecraft:stone", SOLID),
    known(2, 0, "minecraft:grass_block", SOLID),
    known(3, 0, "minecraft:dirt", SOLID),
    known(4, 0, "minecraft:cobblestone", SOLID),
    known(5, 0, "minecraft:oak_planks", SOLID),
    known(7, 0, "minecraft:bedrock", SOLID),
    known(9, 0, "minecraft:water", Material::new(3, 0, true)),
    known(8, 0, "minecraft:water", Material::new(3, 0, true)),
    known(11, 0, "minecraft:lava", Material::new(15, 15, true)),
    known(10, 0, "minecraft:lava", Material::new(15, 15, true)),
    known(12, 0, "minecraft:sand", SOLID),
    known(13, 0, "minecraft:gravel", SOLID),
    known(14, 0, "minecraft:gold_ore", SOLID),
    known(15, 0, "minecraft:iron_ore", SOLID),
    known(16, 0, "minecraft:coal_ore", SOLID),
    known(17, 0, "minecraft:oak_log", SOLID),
    known(18, 0, "minecraft:oak_leaves", Material::new(1, 0, true)),
    known(20, 0, "minecraft:glass", Material::new(0, 0, true)),
    known(24, 0, "minecraft:sandstone", SOLID),
    known(31, 1, "minecraft:grass", PLANT),
    known(37, 0, "minecraft:dandelion", PLANT),
    known(38, 0, "minecraft:poppy", PLANT),
    known(49, 0, "minecraft:obsidian", SOLID),
    known(50, 0, "minecraft:torch", Material::new(0, 14, false)),
    known(78, 0, "minecraft:snow", PLANT),
    known(79, 0, "minecraft:ice", Material::new(3, 0, true)),
    known(80, 0, "minecraft:snow_block", SOLID),
    known(82, 0, "minecraft:clay", SOLID),
    known(89, 0, "minecraft:glowstone", Material::new(15, 15, true)),
];

fn legacy_material(id: u16) -> Material {
    KNOWN_BLOCKS
        .iter()
        .find(|known| known.id == id)
        .map_or(Material::SOLID, |known| known.material)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_both_ways() {
        let stone = Block::legacy(1, 0);
        assert_eq!(stone.to_state(), Some(BlockState::new("minecraft:stone")));
        assert_eq!(Block::named("minecraft:water").to_legacy(), Some((9, 0)));
        assert_eq!(Block::named("minecraft:cave_air").to_legacy(), Some((0, 0)));
    }

    #[test]
    fn test_unknown_blocks_do_not_convert() {
        assert_eq!(Block::legacy(1, 3).to_state(), None);
        assert_eq!(Block::named("minecraft:sculk").to_legacy(), None);
    }

    #[test]
    fn test_materials() {
        assert!(Block::AIR.material().is_transparent());
        assert_eq!(Block::legacy(50, 5).material().emission, 14);
        assert_eq!(Block::named("minecraft:glowstone").material().opacity, 15);
        assert_eq!(Block::named("minecraft:oak_leaves").material().opacity, 1);
        assert_eq!(Block::legacy(4000, 0).material(), Material::SOLID);
        assert!(Block::named("minecraft:void_air").is_air());
    }

    #[test]
    fn test_display() {
        let state = BlockState::new("minecraft:oak_log").with_property("axis", "y");
        assert_eq!(Block::State(state).to_string(), "minecraft:oak_log[axis=y]");
        assert_eq!(Block::legacy(17, 2).to_string(), "block 17:2");
    }
}

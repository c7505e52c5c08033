//! World metadata (`level.dat`): gzip-compressed NBT with a `Data` compound.
//!
//! Only the handful of fields needed to pick a platform and a height bound
//! are read; everything else in the file is ignored.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chunkvault_chunk::{DATA_VERSION_MC_1_12_2, DATA_VERSION_MC_1_13_2};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};

use crate::{Platform, StoreError};

pub const LEVEL_DAT: &str = "level.dat";

/// `version` tag of McRegion worlds.
pub const VERSION_MCREGION: i32 = 19132;
/// `version` tag of Anvil worlds.
pub const VERSION_ANVIL: i32 = 19133;

#[derive(Debug, Serialize, Deserialize)]
struct LevelRoot {
    #[serde(rename = "Data")]
    data: LevelMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelMetadata {
    #[serde(rename = "version")]
    pub version: i32,
    #[serde(rename = "DataVersion", default, skip_serializing_if = "Option::is_none")]
    pub data_version: Option<i32>,
    /// Explicit height bound, written by tools for non-default heights.
    #[serde(rename = "MapHeight", default, skip_serializing_if = "Option::is_none")]
    pub map_height: Option<i32>,
    #[serde(rename = "LevelName", default)]
    pub level_name: String,
}

impl LevelMetadata {
    /// Metadata for a new world of `platform` at its default height.
    pub fn new(level_name: impl Into<String>, platform: Platform) -> Self {
        let (version, data_version) = match platform {
            Platform::JavaAnvil113 => (VERSION_ANVIL, Some(DATA_VERSION_MC_1_13_2)),
            Platform::JavaAnvil => (VERSION_ANVIL, Some(DATA_VERSION_MC_1_12_2)),
            Platform::JavaMcRegion => (VERSION_MCREGION, None),
        };
        Self {
            version,
            data_version,
            map_height: Some(platform.entry().default_max_height),
            level_name: level_name.into(),
        }
    }

    pub fn path(world_dir: &Path) -> PathBuf {
        world_dir.join(LEVEL_DAT)
    }

    /// Reads `level.dat` from a world directory.
    pub fn load(world_dir: &Path) -> Result<Self, StoreError> {
        let path = Self::path(world_dir);
        let compressed = fs::read(&path)?;
        let invalid = |reason: String| StoreError::Metadata {
            path: path.clone(),
            reason,
        };

        let mut nbt = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut nbt)
            .map_err(|e| invalid(format!("not gzip compressed: {e}")))?;
        let root: LevelRoot = fastnbt::from_bytes(&nbt).map_err(|e| invalid(e.to_string()))?;
        Ok(root.data)
    }

    pub fn save(&self, world_dir: &Path) -> Result<(), StoreError> {
        let path = Self::path(world_dir);
        let root = LevelRoot { data: self.clone() };
        let nbt = fastnbt::to_bytes(&root).map_err(|e| StoreError::Metadata {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&nbt)?;
        fs::create_dir_all(world_dir)?;
        fs::write(&path, encoder.finish()?)?;
        Ok(())
    }

    pub fn max_height(&self) -> i32 {
        match self.map_height {
            Some(height) => height,
            None if self.version == VERSION_MCREGION => 128,
            None => 256,
        }
    }
}

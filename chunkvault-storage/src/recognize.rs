use std::path::Path;

use chunkvault_chunk::DATA_VERSION_MC_1_12_2;
use log::debug;

use crate::Platform;
use crate::level::{LevelMetadata, VERSION_ANVIL, VERSION_MCREGION};

/// Guesses the platform of an existing world from its `level.dat`.
pub fn recognize_platform(world_dir: &Path) -> Option<Platform> {
    let level = match LevelMetadata::load(world_dir) {
        Ok(level) => level,
        Err(e) => {
            debug!("Not a recognizable world {:?}: {}", world_dir, e);
            return None;
        }
    };
    match level.version {
        VERSION_MCREGION => Some(Platform::JavaMcRegion),
        VERSION_ANVIL => match level.data_version {
            Some(version) if version > DATA_VERSION_MC_1_12_2 => Some(Platform::JavaAnvil113),
            _ => Some(Platform::JavaAnvil),
        },
        other => {
            debug!("Unknown level.dat version {} in {:?}", other, world_dir);
            None
        }
    }
}

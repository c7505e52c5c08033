use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use chunkvault_chunk::Chunk;
use log::{debug, info};

use crate::level::LevelMetadata;
use crate::platform::PlatformEntry;
use crate::{ChunkStore, Dimension, Platform, StoreConfig, StoreError};

/// Writes authored chunks into a world directory of one platform.
///
/// Every chunk runs through the platform's post-processor before it is
/// stored, so exported worlds are lit and carry valid height indices.
pub struct WorldExporter {
    entry: &'static PlatformEntry,
    world_dir: PathBuf,
    level: LevelMetadata,
    config: StoreConfig,
    stores: HashMap<Dimension, ChunkStore>,
    exported: usize,
}

impl WorldExporter {
    /// Writes a fresh `level.dat` when the directory has none.
    pub(crate) fn new(
        entry: &'static PlatformEntry,
        world_dir: &Path,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        let level_path = LevelMetadata::path(world_dir);
        let level = if level_path.is_file() {
            LevelMetadata::load(world_dir)?
        } else {
            let name = world_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "World".to_string());
            let level = LevelMetadata::new(name, entry.platform);
            level.save(world_dir)?;
            info!("Created {:?} for {}", level_path, entry.platform);
            level
        };
        Ok(Self {
            entry,
            world_dir: world_dir.to_path_buf(),
            level,
            config,
            stores: HashMap::new(),
            exported: 0,
        })
    }

    pub fn platform(&self) -> Platform {
        self.entry.platform
    }

    pub fn world_dir(&self) -> &Path {
        &self.world_dir
    }

    pub fn max_height(&self) -> i32 {
        self.level.max_height()
    }

    /// An empty chunk of the platform's newest variant at this world's height.
    pub fn create_chunk(&self, x: i32, z: i32) -> Result<Chunk, StoreError> {
        Ok(self.entry.create(x, z, self.max_height())?)
    }

    /// Post-processes `chunk` and stores it in `dimension`.
    pub fn export_chunk(&mut self, dimension: Dimension, mut chunk: Chunk) -> Result<(), StoreError> {
        self.entry.post_processor.process(&mut chunk)?;
        let store = match self.stores.entry(dimension) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                debug!("Opening {} store for export", dimension);
                e.insert(ChunkStore::new(
                    self.entry,
                    dimension.region_dir(&self.world_dir),
                    self.level.max_height(),
                    false,
                    &self.config,
                ))
            }
        };
        store.put_chunk(&chunk)?;
        self.exported += 1;
        Ok(())
    }

    /// Closes all stores and returns the number of chunks exported.
    pub fn finish(mut self) -> Result<usize, StoreError> {
        for (_, mut store) in self.stores.drain() {
            store.close()?;
        }
        info!(
            "Exported {} chunks to {:?} as {}",
            self.exported, self.world_dir, self.entry.platform
        );
        Ok(self.exported)
    }
}

/// The Minecraft `saves` directory of the current user, if it exists.
pub fn default_export_dir() -> Option<PathBuf> {
    let minecraft = if cfg!(target_os = "windows") {
        dirs::data_dir()?.join(".minecraft")
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()?.join("minecraft")
    } else {
        dirs::home_dir()?.join(".minecraft")
    };
    let saves = minecraft.join("saves");
    saves.is_dir().then_some(saves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkvault_chunk::{Block, ChunkData};

    #[test]
    fn test_export_writes_level_and_lit_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let world = dir.path().join("My World");
        let mut exporter = WorldExporter::new(Platform::JavaAnvil113.entry(), &world, StoreConfig::default()).unwrap();
        assert_eq!(exporter.max_height(), 256);

        let mut chunk = exporter.create_chunk(2, 3).unwrap();
        chunk.set_block(0, 10, 0, &Block::named("minecraft:stone")).unwrap();
        exporter.export_chunk(Dimension::Overworld, chunk).unwrap();
        let nether = exporter.create_chunk(0, 0).unwrap();
        exporter.export_chunk(Dimension::Nether, nether).unwrap();
        assert_eq!(exporter.finish().unwrap(), 2);

        let level = LevelMetadata::load(&world).unwrap();
        assert_eq!(level.level_name, "My World");
        assert!(world.join("region/r.0.0.mca").is_file());
        assert!(world.join("DIM-1/region/r.0.0.mca").is_file());

        let mut store = ChunkStore::new(
            Platform::JavaAnvil113.entry(),
            world.join("region"),
            256,
            true,
            &StoreConfig::default(),
        );
        let stored = store.get_chunk(2, 3).unwrap().unwrap();
        assert_eq!(stored.height(0, 0).unwrap(), 11);
        assert_eq!(stored.sky_light(0, 9, 0).unwrap(), 0);
    }

    #[test]
    fn test_existing_level_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut level = LevelMetadata::new("Old", Platform::JavaMcRegion);
        level.map_height = Some(64);
        level.save(dir.path()).unwrap();

        let exporter = WorldExporter::new(Platform::JavaMcRegion.entry(), dir.path(), StoreConfig::default()).unwrap();
        assert_eq!(exporter.max_height(), 64);
        assert_eq!(LevelMetadata::load(dir.path()).unwrap(), level);
    }
}

//! Per-dimension chunk store over a directory of region files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chunkvault_anvil::{ChunkPos, CompressionScheme, RegionFile, RegionPos};
use chunkvault_chunk::{Chunk, ChunkError};
use log::{debug, warn};
use lru::LruCache;

use crate::platform::PlatformEntry;
use crate::{Platform, StoreConfig, StoreError};

/// Maps world chunk coordinates to region files and slots.
///
/// Region files are opened lazily and kept in an LRU cache; a store is
/// meant for one thread at a time.
pub struct ChunkStore {
    entry: &'static PlatformEntry,
    region_dir: PathBuf,
    max_height: i32,
    read_only: bool,
    compression: CompressionScheme,
    regions: LruCache<RegionPos, RegionFile>,
}

impl ChunkStore {
    pub(crate) fn new(
        entry: &'static PlatformEntry,
        region_dir: PathBuf,
        max_height: i32,
        read_only: bool,
        config: &StoreConfig,
    ) -> Self {
        Self {
            entry,
            region_dir,
            max_height,
            read_only,
            compression: config.compression,
            regions: LruCache::new(config.max_open_regions),
        }
    }

    pub fn platform(&self) -> Platform {
        self.entry.platform
    }

    pub fn region_dir(&self) -> &Path {
        &self.region_dir
    }

    pub fn max_height(&self) -> i32 {
        self.max_height
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Number of region files currently held open.
    pub fn open_regions(&self) -> usize {
        self.regions.len()
    }

    /// Loads and decodes the chunk at `(x, z)`; `None` if nothing is stored there.
    pub fn get_chunk(&mut self, x: i32, z: i32) -> Result<Option<Chunk>, StoreError> {
        let pos = ChunkPos::new(x, z);
        let (max_height, read_only, entry) = (self.max_height, self.read_only, self.entry);
        let Some(region) = self.existing_region(pos.region())? else {
            return Ok(None);
        };
        let Some(raw) = region.read_chunk_bytes(pos.slot())? else {
            return Ok(None);
        };
        let chunk = entry.decode(&raw, max_height, read_only)?;
        if (chunk.x(), chunk.z()) != (x, z) {
            warn!(
                "Chunk at slot {} of {:?} claims to be ({}, {})",
                pos.slot(),
                region.path(),
                chunk.x(),
                chunk.z()
            );
            return Err(ChunkError::MalformedChunk(format!(
                "expected chunk ({x}, {z}), payload is ({}, {})",
                chunk.x(),
                chunk.z()
            ))
            .into());
        }
        Ok(Some(chunk))
    }

    /// Encodes and stores `chunk` at its own coordinates, creating the
    /// region file if needed.
    pub fn put_chunk(&mut self, chunk: &Chunk) -> Result<(), StoreError> {
        self.ensure_writable()?;
        if !self.entry.accepts(chunk.variant()) {
            return Err(StoreError::IncompatibleChunk {
                platform: self.entry.platform,
                variant: chunk.variant(),
            });
        }
        let raw = chunkvault_chunk::encode(chunk)?;
        let pos = ChunkPos::new(chunk.x(), chunk.z());
        self.open_region(pos.region())?
            .write_chunk_bytes(pos.slot(), &raw)?;
        Ok(())
    }

    /// Occupancy only; the payload is not read.
    pub fn chunk_exists(&mut self, x: i32, z: i32) -> Result<bool, StoreError> {
        let pos = ChunkPos::new(x, z);
        match self.existing_region(pos.region())? {
            Some(region) => Ok(region.has_chunk(pos.slot())?),
            None => Ok(false),
        }
    }

    /// Returns whether a chunk was stored at `(x, z)`.
    pub fn delete_chunk(&mut self, x: i32, z: i32) -> Result<bool, StoreError> {
        self.ensure_writable()?;
        let pos = ChunkPos::new(x, z);
        match self.existing_region(pos.region())? {
            Some(region) => Ok(region.delete_chunk(pos.slot())?),
            None => Ok(false),
        }
    }

    /// Coordinates of every stored chunk in this dimension, sorted.
    pub fn chunk_positions(&self) -> Result<Vec<ChunkPos>, StoreError> {
        let mut positions = Vec::new();
        for path in list_region_files(&self.region_dir, self.entry)? {
            let Some(region_pos) = region_pos_of(&path, self.entry) else {
                continue;
            };
            let slots = match self.regions.peek(&region_pos) {
                Some(region) => region.occupied_slots()?,
                None => {
                    let mut region = RegionFile::open(&path, true)?;
                    let slots = region.occupied_slots()?;
                    region.close()?;
                    slots
                }
            };
            positions.extend(slots.into_iter().map(|slot| region_pos.chunk_pos(slot)));
        }
        positions.sort_by_key(|pos| (pos.x, pos.z));
        Ok(positions)
    }

    /// Syncs every open region file to disk.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        for (_, region) in self.regions.iter_mut() {
            region.flush()?;
        }
        Ok(())
    }

    /// Closes every cached region file. The store stays usable and reopens
    /// files on demand.
    pub fn close(&mut self) -> Result<(), StoreError> {
        let mut result = Ok(());
        while let Some((_, mut region)) = self.regions.pop_lru() {
            if let Err(e) = region.close() {
                warn!("Failed to close region {:?}: {}", region.path(), e);
                if result.is_ok() {
                    result = Err(e.into());
                }
            }
        }
        result
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnlyViolation(self.region_dir.clone()));
        }
        Ok(())
    }

    fn region_path(&self, pos: RegionPos) -> PathBuf {
        self.region_dir.join(pos.filename(self.entry.format))
    }

    /// The cached or on-disk region at `pos`, never creating a file.
    fn existing_region(&mut self, pos: RegionPos) -> Result<Option<&mut RegionFile>, StoreError> {
        if !self.regions.contains(&pos) && !self.region_path(pos).is_file() {
            return Ok(None);
        }
        self.open_region(pos).map(Some)
    }

    fn open_region(&mut self, pos: RegionPos) -> Result<&mut RegionFile, StoreError> {
        if !self.regions.contains(&pos) {
            if !self.read_only {
                fs::create_dir_all(&self.region_dir)?;
            }
            let region = RegionFile::open_with(self.region_path(pos), self.read_only, self.compression)?;
            if let Some((evicted, mut old)) = self.regions.push(pos, region) {
                debug!("Evicting region ({}, {}) from cache", evicted.x, evicted.z);
                old.close()?;
            }
        }
        self.regions
            .get_mut(&pos)
            .ok_or_else(|| io::Error::other("region cache lost an entry").into())
    }
}

/// Region files in `region_dir` whose names match the platform's pattern.
/// A missing directory holds no region files.
pub(crate) fn list_region_files(
    region_dir: &Path,
    entry: &PlatformEntry,
) -> Result<Vec<PathBuf>, StoreError> {
    let dir = match fs::read_dir(region_dir) {
        Ok(dir) => dir,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut files = Vec::new();
    for dir_entry in dir {
        let path = dir_entry?.path();
        if path.is_file() && region_pos_of(&path, entry).is_some() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn region_pos_of(path: &Path, entry: &PlatformEntry) -> Option<RegionPos> {
    let name = path.file_name()?.to_str()?;
    RegionPos::from_filename(name, entry.format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    use chunkvault_chunk::{Block, ChunkData, anvil12, anvil113, mcregion};

    fn store(dir: &Path, platform: Platform, read_only: bool) -> ChunkStore {
        let entry = platform.entry();
        ChunkStore::new(
            entry,
            dir.join("region"),
            entry.default_max_height,
            read_only,
            &StoreConfig::default(),
        )
    }

    #[test]
    fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(dir.path(), Platform::JavaAnvil113, false);
        assert!(!store.chunk_exists(-1, 5).unwrap());
        assert!(store.get_chunk(-1, 5).unwrap().is_none());
        // Reading a missing region creates nothing.
        assert!(!dir.path().join("region").exists());

        let mut chunk = anvil113::create(-1, 5, 256).unwrap();
        chunk.set_block(1, 2, 3, &Block::named("minecraft:stone")).unwrap();
        store.put_chunk(&chunk).unwrap();

        assert!(dir.path().join("region/r.-1.0.mca").is_file());
        assert!(store.chunk_exists(-1, 5).unwrap());
        let loaded = store.get_chunk(-1, 5).unwrap().unwrap();
        assert_eq!(loaded, chunk);
        assert_eq!((loaded.x(), loaded.z()), (-1, 5));
        assert!(!store.chunk_exists(-1, 6).unwrap());
    }

    #[test]
    fn test_persists_across_stores() {
        let dir = tempfile::tempdir().unwrap();
        let chunk = mcregion::create(40, -70, 128).unwrap();
        {
            let mut store = store(dir.path(), Platform::JavaMcRegion, false);
            store.put_chunk(&chunk).unwrap();
            store.close().unwrap();
        }
        assert!(dir.path().join("region/r.1.-3.mcr").is_file());

        let mut store = store(dir.path(), Platform::JavaMcRegion, true);
        let loaded = store.get_chunk(40, -70).unwrap().unwrap();
        assert!(loaded.is_read_only());
        assert_eq!(loaded.block(0, 0, 0).unwrap(), chunk.block(0, 0, 0).unwrap());
    }

    #[test]
    fn test_anvil_store_holds_both_generations() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(dir.path(), Platform::JavaAnvil, false);
        let old = anvil12::create(0, 0, 256).unwrap();
        let new = anvil113::create(1, 0, 256).unwrap();
        store.put_chunk(&old).unwrap();
        store.put_chunk(&new).unwrap();
        assert_eq!(store.get_chunk(0, 0).unwrap().unwrap(), old);
        assert_eq!(store.get_chunk(1, 0).unwrap().unwrap(), new);
    }

    #[test]
    fn test_rejects_foreign_variants() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(dir.path(), Platform::JavaMcRegion, false);
        let chunk = anvil12::create(0, 0, 256).unwrap();
        assert!(matches!(
            store.put_chunk(&chunk),
            Err(StoreError::IncompatibleChunk {
                platform: Platform::JavaMcRegion,
                ..
            })
        ));
        assert!(!dir.path().join("region").exists());
    }

    #[test]
    fn test_read_only_store() {
        let dir = tempfile::tempdir().unwrap();
        let chunk = anvil12::create(3, 3, 256).unwrap();
        store(dir.path(), Platform::JavaAnvil, false)
            .put_chunk(&chunk)
            .unwrap();
        let path = dir.path().join("region/r.0.0.mca");
        let before = fs::read(&path).unwrap();

        let mut store = store(dir.path(), Platform::JavaAnvil, true);
        assert!(matches!(
            store.put_chunk(&chunk),
            Err(StoreError::ReadOnlyViolation(_))
        ));
        assert!(matches!(
            store.delete_chunk(3, 3),
            Err(StoreError::ReadOnlyViolation(_))
        ));
        assert!(store.chunk_exists(3, 3).unwrap());
        store.close().unwrap();
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_delete_and_positions() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(dir.path(), Platform::JavaAnvil, false);
        for (x, z) in [(0, 0), (31, 31), (32, 0), (-1, -1)] {
            store.put_chunk(&anvil12::create(x, z, 256).unwrap()).unwrap();
        }
        // Not matching the pattern, ignored.
        fs::write(dir.path().join("region/r.0.0.mcr"), b"").unwrap();

        let positions: Vec<(i32, i32)> = store
            .chunk_positions()
            .unwrap()
            .into_iter()
            .map(|p| (p.x, p.z))
            .collect();
        assert_eq!(positions, vec![(-1, -1), (0, 0), (31, 31), (32, 0)]);

        assert!(store.delete_chunk(31, 31).unwrap());
        assert!(!store.delete_chunk(31, 31).unwrap());
        assert!(!store.delete_chunk(500, 500).unwrap());
        assert!(!store.chunk_exists(31, 31).unwrap());
        assert_eq!(store.chunk_positions().unwrap().len(), 3);
    }

    #[test]
    fn test_lru_eviction_closes_regions() {
        let dir = tempfile::tempdir().unwrap();
        let entry = Platform::JavaAnvil.entry();
        let config = StoreConfig::default().with_max_open_regions(NonZeroUsize::new(2).unwrap());
        let mut store = ChunkStore::new(entry, dir.path().join("region"), 256, false, &config);
        for i in 0..5 {
            store.put_chunk(&anvil12::create(i * 32, 0, 256).unwrap()).unwrap();
            assert!(store.open_regions() <= 2);
        }
        for i in 0..5 {
            assert!(store.chunk_exists(i * 32, 0).unwrap());
        }
        assert_eq!(store.open_regions(), 2);
        store.flush().unwrap();
        store.close().unwrap();
        assert_eq!(store.open_regions(), 0);
        assert!(store.get_chunk(64, 0).unwrap().is_some());
    }

    #[test]
    fn test_coordinate_mismatch_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let region_dir = dir.path().join("region");
        fs::create_dir_all(&region_dir).unwrap();
        // Store chunk (5, 5) in the slot belonging to (6, 5).
        let raw = chunkvault_chunk::encode(&anvil12::create(5, 5, 256).unwrap()).unwrap();
        let mut region = RegionFile::open(region_dir.join("r.0.0.mca"), false).unwrap();
        region
            .write_chunk_bytes(ChunkPos::new(6, 5).slot(), &raw)
            .unwrap();
        region.close().unwrap();

        let mut store = store(dir.path(), Platform::JavaAnvil, false);
        assert!(matches!(
            store.get_chunk(6, 5),
            Err(StoreError::Chunk(ChunkError::MalformedChunk(_)))
        ));
        assert!(store.chunk_exists(6, 5).unwrap());
    }

    #[test]
    fn test_malformed_chunk_does_not_affect_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(dir.path(), Platform::JavaAnvil, false);
        store.put_chunk(&anvil12::create(0, 0, 256).unwrap()).unwrap();
        store.close().unwrap();

        let mut region = RegionFile::open(dir.path().join("region/r.0.0.mca"), false).unwrap();
        region
            .write_chunk_bytes(ChunkPos::new(1, 0).slot(), b"garbage")
            .unwrap();
        region.close().unwrap();

        assert!(store.get_chunk(1, 0).is_err());
        assert!(store.get_chunk(0, 0).unwrap().is_some());
    }
}

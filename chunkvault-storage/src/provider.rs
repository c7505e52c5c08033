use std::path::{Path, PathBuf};

use chunkvault_anvil::{RegionFile, RegionPos};
use chunkvault_chunk::{Chunk, PostProcessor};
use log::debug;

use crate::level::LevelMetadata;
use crate::platform::PlatformEntry;
use crate::store::list_region_files;
use crate::{ChunkStore, Dimension, Platform, StoreConfig, StoreError, WorldExporter};

/// The single dispatch point for everything that differs between platforms.
///
/// A provider is built once over a subset of [`Platform::ALL`]; any other
/// platform passed to it fails with [`StoreError::UnsupportedPlatform`].
#[derive(Debug, Clone)]
pub struct PlatformProvider {
    platforms: Vec<Platform>,
    config: StoreConfig,
}

impl Default for PlatformProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformProvider {
    /// All platforms, default store settings.
    pub fn new() -> Self {
        Self::with_platforms(&Platform::ALL)
    }

    pub fn with_platforms(platforms: &[Platform]) -> Self {
        Self {
            platforms: Platform::ALL
                .into_iter()
                .filter(|p| platforms.contains(p))
                .collect(),
            config: StoreConfig::default(),
        }
    }

    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Registered platforms, most modern first.
    pub fn list_platforms(&self) -> &[Platform] {
        &self.platforms
    }

    fn entry(&self, platform: Platform) -> Result<&'static PlatformEntry, StoreError> {
        if self.platforms.contains(&platform) {
            Ok(platform.entry())
        } else {
            Err(StoreError::UnsupportedPlatform(platform.id().to_string()))
        }
    }

    /// Decodes an uncompressed payload, picking the codec from its
    /// `DataVersion` on platforms that hold more than one chunk variant.
    pub fn decode_chunk(
        &self,
        platform: Platform,
        raw: &[u8],
        max_height: i32,
        read_only: bool,
    ) -> Result<Chunk, StoreError> {
        Ok(self.entry(platform)?.decode(raw, max_height, read_only)?)
    }

    /// An empty chunk of the platform's newest variant.
    pub fn create_chunk(
        &self,
        platform: Platform,
        x: i32,
        z: i32,
        max_height: i32,
    ) -> Result<Chunk, StoreError> {
        Ok(self.entry(platform)?.create(x, z, max_height)?)
    }

    /// Files in `region_dir` named after the platform's region pattern, sorted.
    pub fn list_region_files(
        &self,
        platform: Platform,
        region_dir: &Path,
    ) -> Result<Vec<PathBuf>, StoreError> {
        list_region_files(region_dir, self.entry(platform)?)
    }

    pub fn region_file_path(
        &self,
        platform: Platform,
        region_dir: &Path,
        coords: RegionPos,
    ) -> Result<PathBuf, StoreError> {
        Ok(region_dir.join(coords.filename(self.entry(platform)?.format)))
    }

    /// Opens the region file at `coords`; a read-write open creates it.
    pub fn open_region_container(
        &self,
        platform: Platform,
        region_dir: &Path,
        coords: RegionPos,
        read_only: bool,
    ) -> Result<RegionFile, StoreError> {
        let path = self.region_file_path(platform, region_dir, coords)?;
        Ok(RegionFile::open_with(path, read_only, self.config.compression)?)
    }

    /// Like [`open_region_container`](Self::open_region_container), but
    /// `None` when the file does not exist.
    pub fn open_region_container_if_present(
        &self,
        platform: Platform,
        region_dir: &Path,
        coords: RegionPos,
        read_only: bool,
    ) -> Result<Option<RegionFile>, StoreError> {
        let path = self.region_file_path(platform, region_dir, coords)?;
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(RegionFile::open_with(path, read_only, self.config.compression)?))
    }

    /// A store over one dimension of an existing world. The height bound
    /// comes from the world's `level.dat`.
    pub fn open_chunk_store(
        &self,
        platform: Platform,
        world_dir: &Path,
        dimension: i32,
        read_only: bool,
    ) -> Result<ChunkStore, StoreError> {
        let entry = self.entry(platform)?;
        let dimension = Dimension::try_from(dimension)?;
        let level = LevelMetadata::load(world_dir)?;
        let region_dir = dimension.region_dir(world_dir);
        debug!(
            "Opening {} store {:?} (max height {}, {})",
            platform,
            region_dir,
            level.max_height(),
            if read_only { "read-only" } else { "read-write" }
        );
        Ok(ChunkStore::new(
            entry,
            region_dir,
            level.max_height(),
            read_only,
            &self.config,
        ))
    }

    pub fn post_processor(&self, platform: Platform) -> Result<&'static dyn PostProcessor, StoreError> {
        Ok(self.entry(platform)?.post_processor)
    }

    /// An exporter writing into `world_dir`, which is created along with a
    /// `level.dat` when missing.
    pub fn exporter(&self, platform: Platform, world_dir: &Path) -> Result<WorldExporter, StoreError> {
        WorldExporter::new(self.entry(platform)?, world_dir, self.config)
    }

    /// The registered platform an existing world was saved with.
    pub fn recognize(&self, world_dir: &Path) -> Option<Platform> {
        crate::recognize_platform(world_dir).filter(|p| self.platforms.contains(p))
    }
}

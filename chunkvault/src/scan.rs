use std::path::{Path, PathBuf};

use chunkvault_anvil::{RegionFile, RegionPos, Slot};
use chunkvault_chunk::ChunkData;
use chunkvault_storage::level::LevelMetadata;
use chunkvault_storage::{Dimension, Platform, PlatformProvider, StoreError};
use log::debug;
use rayon::prelude::*;

/// Integrity of one region file.
#[derive(Debug)]
pub struct RegionReport {
    pub path: PathBuf,
    /// Chunks with a valid sector entry.
    pub chunks: usize,
    pub corrupt: Vec<Slot>,
    pub malformed: Vec<(Slot, String)>,
    /// Set when the file could not be opened at all.
    pub error: Option<String>,
}

impl RegionReport {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            chunks: 0,
            corrupt: Vec::new(),
            malformed: Vec::new(),
            error: None,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.corrupt.is_empty() && self.malformed.is_empty() && self.error.is_none()
    }
}

/// Scans every region file of every dimension, one region per rayon task.
pub fn scan_world(
    provider: &PlatformProvider,
    platform: Platform,
    world_dir: &Path,
) -> Result<Vec<RegionReport>, StoreError> {
    let max_height = LevelMetadata::load(world_dir)?.max_height();
    let mut paths = Vec::new();
    for dimension in Dimension::ALL {
        paths.extend(provider.list_region_files(platform, &dimension.region_dir(world_dir))?);
    }

    Ok(paths
        .par_iter()
        .map(|path| {
            scan_region(provider, platform, path, max_height).unwrap_or_else(|e| {
                let mut report = RegionReport::new(path);
                report.error = Some(e.to_string());
                report
            })
        })
        .collect())
}

/// Reads and decodes every occupied slot of one region file without
/// modifying it.
pub fn scan_region(
    provider: &PlatformProvider,
    platform: Platform,
    path: &Path,
    max_height: i32,
) -> Result<RegionReport, StoreError> {
    let region_pos = path
        .file_name()
        .and_then(|name| RegionPos::from_filename(&name.to_string_lossy(), platform.entry().format));
    let mut region = RegionFile::open_with(path, true, provider.config().compression)?;
    let mut report = RegionReport::new(path);
    report.corrupt = region.corrupt_slots()?;

    for slot in region.occupied_slots()? {
        if report.corrupt.contains(&slot) {
            continue;
        }
        report.chunks += 1;
        let raw = match region.read_chunk_bytes(slot) {
            Ok(Some(raw)) => raw,
            Ok(None) => continue,
            Err(e) => {
                report.malformed.push((slot, e.to_string()));
                continue;
            }
        };
        match provider.decode_chunk(platform, &raw, max_height, true) {
            Ok(chunk) => {
                if let Some(expected) = region_pos.map(|r| r.chunk_pos(slot)) {
                    if (chunk.x(), chunk.z()) != (expected.x, expected.z) {
                        report.malformed.push((
                            slot,
                            format!(
                                "payload is chunk ({}, {}), slot holds ({}, {})",
                                chunk.x(),
                                chunk.z(),
                                expected.x,
                                expected.z
                            ),
                        ));
                    }
                }
            }
            Err(e) => report.malformed.push((slot, e.to_string())),
        }
    }
    region.close()?;
    debug!(
        "Scanned {:?}: {} chunks, {} corrupt, {} malformed",
        path,
        report.chunks,
        report.corrupt.len(),
        report.malformed.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkvault_chunk::{Block, encode};
    use std::fs::OpenOptions;
    use std::io::{Seek, SeekFrom, Write};

    fn export_world(platform: Platform, chunks: &[(i32, i32)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let provider = PlatformProvider::new();
        let mut exporter = provider.exporter(platform, dir.path()).unwrap();
        for &(x, z) in chunks {
            let mut chunk = exporter.create_chunk(x, z).unwrap();
            chunk.set_block(1, 1, 1, &Block::named("minecraft:stone")).unwrap();
            exporter.export_chunk(Dimension::Overworld, chunk).unwrap();
        }
        exporter.finish().unwrap();
        dir
    }

    #[test]
    fn test_clean_world() {
        let world = export_world(Platform::JavaAnvil, &[(0, 0), (1, 0), (-1, -1)]);
        let reports = scan_world(&PlatformProvider::new(), Platform::JavaAnvil, world.path()).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(RegionReport::is_clean));
        assert_eq!(reports.iter().map(|r| r.chunks).sum::<usize>(), 3);
    }

    #[test]
    fn test_reports_corrupt_and_malformed_slots() {
        let world = export_world(Platform::JavaAnvil113, &[(0, 0), (1, 0)]);
        let path = world.path().join("region/r.0.0.mca");

        let mut region = RegionFile::open(&path, false).unwrap();
        region.write_chunk_bytes(Slot::from_chunk(2, 0), b"not nbt").unwrap();
        let elsewhere = chunkvault_chunk::anvil113::create(9, 9, 256).unwrap();
        region
            .write_chunk_bytes(Slot::from_chunk(3, 0), &encode(&elsewhere).unwrap())
            .unwrap();
        region.close().unwrap();

        // Point slot (1, 0) into the header.
        let mut file = OpenOptions::new().write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(4)).unwrap();
        file.write_all(&[0, 0, 1, 1]).unwrap();
        drop(file);

        let report = scan_region(&PlatformProvider::new(), Platform::JavaAnvil113, &path, 256).unwrap();
        assert_eq!(report.chunks, 3);
        assert_eq!(report.corrupt, vec![Slot::from_chunk(1, 0)]);
        let malformed: Vec<Slot> = report.malformed.iter().map(|(slot, _)| *slot).collect();
        assert_eq!(malformed, vec![Slot::from_chunk(2, 0), Slot::from_chunk(3, 0)]);
        assert!(!report.is_clean());
    }
}

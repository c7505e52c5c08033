use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::allocator::SectorMap;
use crate::compression::{self, CompressionScheme};
use crate::header::{Header, SectorEntry};
use crate::{HEADER_BYTES, RegionError, SECTOR_BYTES, SLOT_COUNT, Slot};

/// Largest sector offset a 3-byte location entry can hold.
const MAX_SECTOR_OFFSET: u32 = 0x00FF_FFFF;

/// An open region file.
///
/// The handle owns the sector table exclusively; callers that share one
/// across threads must wrap it in a mutex. Writes are copy-on-write per
/// slot: the payload lands in free sectors first and the location entry is
/// rewritten last, so a failed write leaves the previous payload readable.
#[derive(Debug)]
pub struct RegionFile {
    path: PathBuf,
    file: Option<File>,
    read_only: bool,
    compression: CompressionScheme,
    header: Header,
    sectors: SectorMap,
    corrupt: Vec<bool>,
}

impl RegionFile {
    /// Open with zlib as the write compression.
    pub fn open(path: impl AsRef<Path>, read_only: bool) -> Result<Self, RegionError> {
        Self::open_with(path, read_only, CompressionScheme::default())
    }

    /// Open an existing region file, or create an empty one when opening
    /// read-write. A read-only open of a missing file fails with `Io`.
    pub fn open_with(
        path: impl AsRef<Path>,
        read_only: bool,
        compression: CompressionScheme,
    ) -> Result<Self, RegionError> {
        let path = path.as_ref().to_path_buf();
        let mut file = if read_only {
            File::open(&path)?
        } else {
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)?
        };

        let mut file_len = file.metadata()?.len();
        if !read_only {
            // Minecraft rejects files that are not a whole number of sectors.
            let padded = file_len.max(HEADER_BYTES).div_ceil(SECTOR_BYTES) * SECTOR_BYTES;
            if padded != file_len {
                file.set_len(padded)?;
                file_len = padded;
            }
        }

        let mut header_bytes = Vec::with_capacity(HEADER_BYTES as usize);
        std::io::Read::by_ref(&mut file).take(HEADER_BYTES).read_to_end(&mut header_bytes)?;
        let header = Header::parse(&header_bytes);

        let total_sectors = file_len.div_ceil(SECTOR_BYTES) as u32;
        let (sectors, corrupt) = scan_sector_table(&path, &header, total_sectors);

        log::debug!(
            "Opened region {:?} ({}, {} sectors)",
            path,
            if read_only { "read-only" } else { "read-write" },
            total_sectors
        );

        Ok(Self {
            path,
            file: Some(file),
            read_only,
            compression,
            header,
            sectors,
            corrupt,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    pub fn compression(&self) -> CompressionScheme {
        self.compression
    }

    /// Read and decompress the payload stored in `slot`.
    pub fn read_chunk_bytes(&mut self, slot: Slot) -> Result<Option<Vec<u8>>, RegionError> {
        self.ensure_open()?;
        let entry = self.header.locations[slot.index()];
        if entry.is_empty() {
            return Ok(None);
        }
        if self.corrupt[slot.index()] {
            return Err(RegionError::corrupt(
                &self.path,
                format!("slot {slot} has invalid sector entry {}+{}", entry.offset, entry.count),
            ));
        }

        let frame = self.read_frame(slot, entry)?;
        compression::unwrap_and_decompress_chunk(&frame)
            .map(Some)
            .map_err(|e| RegionError::corrupt(&self.path, format!("slot {slot}: {e}")))
    }

    /// Compress and store `bytes` in `slot`, replacing any previous payload.
    pub fn write_chunk_bytes(&mut self, slot: Slot, bytes: &[u8]) -> Result<(), RegionError> {
        self.ensure_writable()?;

        let mut blob = compression::compress_and_wrap_chunk(self.compression, bytes)?;
        let needed = (blob.len() as u64).div_ceil(SECTOR_BYTES);
        if needed > u8::MAX as u64 {
            return Err(RegionError::ChunkTooLarge { slot, sectors: needed });
        }
        let needed = needed as u32;
        blob.resize((needed as u64 * SECTOR_BYTES) as usize, 0);

        // The current span stays marked as used, so the new payload never overwrites it.
        let start = self.sectors.find_free(needed);
        if start + needed > MAX_SECTOR_OFFSET {
            return Err(RegionError::RegionFull(self.path.clone()));
        }
        let entry = SectorEntry::new(start, needed as u8);
        let timestamp = unix_now();

        let file = self.handle()?;
        file.seek(SeekFrom::Start(entry.byte_offset()))?;
        file.write_all(&blob)?;
        file.sync_data()?;
        file.seek(SeekFrom::Start(Header::location_offset(slot)))?;
        file.write_all(&entry.to_raw().to_be_bytes())?;
        file.seek(SeekFrom::Start(Header::timestamp_offset(slot)))?;
        file.write_all(&timestamp.to_be_bytes())?;
        file.flush()?;

        let index = slot.index();
        let old = std::mem::replace(&mut self.header.locations[index], entry);
        self.header.timestamps[index] = timestamp;
        self.sectors.mark_used(start, needed);
        self.release(index, old);
        Ok(())
    }

    /// Clear `slot`. Returns whether anything was stored there.
    pub fn delete_chunk(&mut self, slot: Slot) -> Result<bool, RegionError> {
        self.ensure_writable()?;
        let index = slot.index();
        let old = self.header.locations[index];
        if old.is_empty() {
            return Ok(false);
        }

        let file = self.handle()?;
        file.seek(SeekFrom::Start(Header::location_offset(slot)))?;
        file.write_all(&SectorEntry::EMPTY.to_raw().to_be_bytes())?;
        file.seek(SeekFrom::Start(Header::timestamp_offset(slot)))?;
        file.write_all(&0u32.to_be_bytes())?;
        file.flush()?;

        self.header.locations[index] = SectorEntry::EMPTY;
        self.header.timestamps[index] = 0;
        self.release(index, old);
        Ok(true)
    }

    /// Slots with a non-empty location entry, in header order.
    /// Payloads are not read.
    pub fn occupied_slots(&self) -> Result<Vec<Slot>, RegionError> {
        self.ensure_open()?;
        Ok(Slot::all()
            .filter(|slot| !self.header.locations[slot.index()].is_empty())
            .collect())
    }

    /// Slots whose location entry points into the header, past the end of
    /// the file, or over another slot's sectors.
    pub fn corrupt_slots(&self) -> Result<Vec<Slot>, RegionError> {
        self.ensure_open()?;
        Ok(Slot::all().filter(|slot| self.corrupt[slot.index()]).collect())
    }

    pub fn has_chunk(&self, slot: Slot) -> Result<bool, RegionError> {
        self.ensure_open()?;
        Ok(!self.header.locations[slot.index()].is_empty())
    }

    pub fn sector_entry(&self, slot: Slot) -> Result<SectorEntry, RegionError> {
        self.ensure_open()?;
        Ok(self.header.locations[slot.index()])
    }

    /// Last-modified time of `slot` in Unix seconds (0 if never written).
    pub fn timestamp(&self, slot: Slot) -> Result<u32, RegionError> {
        self.ensure_open()?;
        Ok(self.header.timestamps[slot.index()])
    }

    pub fn flush(&mut self) -> Result<(), RegionError> {
        let read_only = self.read_only;
        let file = self.handle()?;
        if !read_only {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Release the file handle. Every later call fails with `ClosedContainer`.
    pub fn close(&mut self) -> Result<(), RegionError> {
        let file = self
            .file
            .take()
            .ok_or_else(|| RegionError::ClosedContainer(self.path.clone()))?;
        if !self.read_only {
            file.sync_all()?;
        }
        log::debug!("Closed region {:?}", self.path);
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), RegionError> {
        if self.file.is_none() {
            return Err(RegionError::ClosedContainer(self.path.clone()));
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<(), RegionError> {
        self.ensure_open()?;
        if self.read_only {
            return Err(RegionError::ReadOnlyViolation(self.path.clone()));
        }
        Ok(())
    }

    fn handle(&mut self) -> Result<&mut File, RegionError> {
        let RegionFile { file, path, .. } = self;
        file.as_mut()
            .ok_or_else(|| RegionError::ClosedContainer(path.clone()))
    }

    // Corrupt spans may overlap a live slot, so they stay reserved.
    fn release(&mut self, index: usize, old: SectorEntry) {
        if !old.is_empty() && !self.corrupt[index] {
            self.sectors.release(old.offset, old.count as u32);
        }
        self.corrupt[index] = false;
    }

    fn read_frame(&mut self, slot: Slot, entry: SectorEntry) -> Result<Vec<u8>, RegionError> {
        let RegionFile { file, path, .. } = self;
        let path: &Path = path.as_path();
        let file = file
            .as_mut()
            .ok_or_else(|| RegionError::ClosedContainer(path.to_path_buf()))?;
        let truncated = |e: std::io::Error| {
            if e.kind() == ErrorKind::UnexpectedEof {
                RegionError::corrupt(path, format!("slot {slot}: payload runs past end of file"))
            } else {
                RegionError::Io(e)
            }
        };

        file.seek(SeekFrom::Start(entry.byte_offset()))?;
        let mut length_bytes = [0u8; 4];
        file.read_exact(&mut length_bytes).map_err(truncated)?;
        let length = u32::from_be_bytes(length_bytes) as u64;
        if length == 0 || length + 4 > entry.byte_len() {
            return Err(RegionError::corrupt(
                path,
                format!(
                    "slot {slot}: frame length {length} does not fit {} sectors",
                    entry.count
                ),
            ));
        }

        let mut frame = vec![0u8; length as usize + 4];
        frame[..4].copy_from_slice(&length_bytes);
        file.read_exact(&mut frame[4..]).map_err(truncated)?;
        Ok(frame)
    }
}

/// Build the sector map and flag entries that point into the header, past
/// the end of the file, or over another slot's sectors.
fn scan_sector_table(path: &Path, header: &Header, total_sectors: u32) -> (SectorMap, Vec<bool>) {
    let mut sectors = SectorMap::new(total_sectors);
    let mut owners: Vec<Option<usize>> = vec![None; total_sectors as usize];
    let mut corrupt = vec![false; SLOT_COUNT];

    for (index, entry) in header.locations.iter().enumerate() {
        if entry.is_empty() {
            continue;
        }
        if entry.offset < 2 || entry.end() > total_sectors {
            corrupt[index] = true;
            let start = entry.offset.max(2);
            let end = entry.end().min(total_sectors);
            if start < end {
                sectors.mark_used(start, end - start);
            }
            continue;
        }
        for sector in entry.offset..entry.end() {
            match owners[sector as usize] {
                Some(other) => {
                    corrupt[index] = true;
                    corrupt[other] = true;
                }
                None => owners[sector as usize] = Some(index),
            }
        }
        sectors.mark_used(entry.offset, entry.count as u32);
    }

    let bad = corrupt.iter().filter(|&&c| c).count();
    if bad > 0 {
        log::warn!("Region {:?} has {} slot(s) with invalid sector entries", path, bad);
    }
    (sectors, corrupt)
}

fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

//! Minecraft region containers (`.mcr` / `.mca`).
//!
//! A region file stores up to 32x32 chunks:
//! - Bytes 0-4095: Location table (1024 entries × 4 bytes)
//! - Bytes 4096-8191: Timestamp table (1024 entries × 4 bytes)
//! - Bytes 8192+: Chunk payloads in 4 KiB sectors
//!
//! Both generations of the format share this layout and differ only in
//! file extension and in what the payloads contain.

mod allocator;
pub mod compression;
mod error;
mod header;
mod region_file;

pub use compression::CompressionScheme;
pub use error::RegionError;
pub use header::SectorEntry;
pub use region_file::RegionFile;

/// Size of one sector in bytes (4 KB).
pub const SECTOR_BYTES: u64 = 4096;

/// Total header size (location table + timestamp table).
pub const HEADER_BYTES: u64 = SECTOR_BYTES * 2;

/// Number of chunks per region dimension.
pub const REGION_SIZE: i32 = 32;

/// Number of chunk slots in one region.
pub const SLOT_COUNT: usize = (REGION_SIZE * REGION_SIZE) as usize;

/// Convert chunk coordinates to local region coordinates (0-31).
#[inline]
pub fn chunk_to_local(chunk_coord: i32) -> i32 {
    chunk_coord.rem_euclid(REGION_SIZE)
}

/// Convert chunk coordinates to region coordinates.
#[inline]
pub fn chunk_to_region(chunk_coord: i32) -> i32 {
    chunk_coord.div_euclid(REGION_SIZE)
}

/// The two container generations, told apart by file extension.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum RegionFormat {
    /// Beta 1.3 - 1.1 worlds, `r.x.z.mcr`.
    McRegion,
    /// 1.2+ worlds, `r.x.z.mca`.
    Anvil,
}

impl RegionFormat {
    pub fn extension(self) -> &'static str {
        match self {
            RegionFormat::McRegion => "mcr",
            RegionFormat::Anvil => "mca",
        }
    }

    /// True if `name` is exactly `r.<int>.<int>.<ext>` for this format.
    pub fn matches(self, name: &str) -> bool {
        RegionPos::from_filename(name, self).is_some()
    }
}

/// Position of a chunk slot inside a region (0-31 on both axes).
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Slot {
    x: u8,
    z: u8,
}

impl Slot {
    pub fn new(x: i32, z: i32) -> Option<Self> {
        if (0..REGION_SIZE).contains(&x) && (0..REGION_SIZE).contains(&z) {
            Some(Self { x: x as u8, z: z as u8 })
        } else {
            None
        }
    }

    /// Slot owning the given world chunk coordinates (floored modulo).
    pub fn from_chunk(chunk_x: i32, chunk_z: i32) -> Self {
        Self {
            x: chunk_to_local(chunk_x) as u8,
            z: chunk_to_local(chunk_z) as u8,
        }
    }

    /// Linear index within the header tables (0-1023).
    #[inline]
    pub fn index(self) -> usize {
        self.z as usize * REGION_SIZE as usize + self.x as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        if index >= SLOT_COUNT {
            return None;
        }
        let local_x = (index % REGION_SIZE as usize) as u8;
        let local_z = (index / REGION_SIZE as usize) as u8;
        Some(Self { x: local_x, z: local_z })
    }

    pub fn x(self) -> i32 {
        self.x as i32
    }

    pub fn z(self) -> i32 {
        self.z as i32
    }

    /// All 1024 slots in header order.
    pub fn all() -> impl Iterator<Item = Slot> {
        (0..SLOT_COUNT).filter_map(Slot::from_index)
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Coordinates for a chunk in the world.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn region(self) -> RegionPos {
        RegionPos::new(chunk_to_region(self.x), chunk_to_region(self.z))
    }

    pub fn slot(self) -> Slot {
        Slot::from_chunk(self.x, self.z)
    }
}

/// Region file coordinates (parsed from filename like "r.0.-1.mca").
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl RegionPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Parse region position from filename (e.g., "r.0.-1.mca").
    pub fn from_filename(name: &str, format: RegionFormat) -> Option<Self> {
        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() == 4
            && parts[0] == "r"
            && parts[3] == format.extension()
            && is_coordinate(parts[1])
            && is_coordinate(parts[2])
        {
            let x = parts[1].parse().ok()?;
            let z = parts[2].parse().ok()?;
            Some(Self { x, z })
        } else {
            None
        }
    }

    pub fn filename(&self, format: RegionFormat) -> String {
        format!("r.{}.{}.{}", self.x, self.z, format.extension())
    }

    /// World chunk coordinates of a slot in this region.
    pub fn chunk_pos(&self, slot: Slot) -> ChunkPos {
        ChunkPos::new(
            self.x * REGION_SIZE + slot.x(),
            self.z * REGION_SIZE + slot.z(),
        )
    }
}

// `-?\d+`; `str::parse` alone would also accept a leading '+'.
fn is_coordinate(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

//! Region file header.
//!
//! The header consists of two tables:
//! - Location table: where each chunk is stored
//! - Timestamp table: when each chunk was last saved

use crate::{HEADER_BYTES, SECTOR_BYTES, SLOT_COUNT, Slot};

/// One location table entry: `[Offset: 3 bytes][Count: 1 byte]` (Big Endian).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectorEntry {
    pub offset: u32,
    pub count: u8,
}

impl SectorEntry {
    pub const EMPTY: SectorEntry = SectorEntry { offset: 0, count: 0 };

    pub fn new(offset: u32, count: u8) -> Self {
        Self { offset, count }
    }

    pub fn from_raw(raw: u32) -> Self {
        Self {
            offset: raw >> 8,
            count: (raw & 0xFF) as u8,
        }
    }

    pub fn to_raw(self) -> u32 {
        (self.offset << 8) | self.count as u32
    }

    /// A zero sector count means nothing is stored for the slot.
    pub fn is_empty(self) -> bool {
        self.count == 0
    }

    /// First sector past this entry's span.
    pub fn end(self) -> u32 {
        self.offset + self.count as u32
    }

    pub fn byte_offset(self) -> u64 {
        self.offset as u64 * SECTOR_BYTES
    }

    pub fn byte_len(self) -> u64 {
        self.count as u64 * SECTOR_BYTES
    }
}

/// Parsed location and timestamp tables.
#[derive(Debug, Clone)]
pub(crate) struct Header {
    pub locations: Vec<SectorEntry>,
    pub timestamps: Vec<u32>,
}

impl Header {
    pub fn empty() -> Self {
        Self {
            locations: vec![SectorEntry::EMPTY; SLOT_COUNT],
            timestamps: vec![0; SLOT_COUNT],
        }
    }

    /// Parse a header; missing trailing bytes read as zero.
    pub fn parse(bytes: &[u8]) -> Self {
        let mut padded = [0u8; HEADER_BYTES as usize];
        let available = bytes.len().min(padded.len());
        padded[..available].copy_from_slice(&bytes[..available]);

        let mut header = Self::empty();
        for index in 0..SLOT_COUNT {
            header.locations[index] = SectorEntry::from_raw(read_u32(&padded, index * 4));
            header.timestamps[index] = read_u32(&padded, SECTOR_BYTES as usize + index * 4);
        }
        header
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_BYTES as usize];
        for index in 0..SLOT_COUNT {
            let loc = index * 4;
            bytes[loc..loc + 4].copy_from_slice(&self.locations[index].to_raw().to_be_bytes());
            let ts = SECTOR_BYTES as usize + index * 4;
            bytes[ts..ts + 4].copy_from_slice(&self.timestamps[index].to_be_bytes());
        }
        bytes
    }

    /// File offset of a slot's location entry.
    #[inline]
    pub fn location_offset(slot: Slot) -> u64 {
        slot.index() as u64 * 4
    }

    /// File offset of a slot's timestamp entry.
    #[inline]
    pub fn timestamp_offset(slot: Slot) -> u64 {
        SECTOR_BYTES + slot.index() as u64 * 4
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

use std::path::PathBuf;

use crate::Slot;

/// Errors raised by [`RegionFile`](crate::RegionFile) operations.
#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    /// Underlying file system failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The sector table or a payload frame is inconsistent.
    #[error("corrupt region file {path}: {reason}")]
    CorruptContainer { path: PathBuf, reason: String },

    /// A write was attempted on a container opened read-only.
    #[error("region file {0} is opened read-only")]
    ReadOnlyViolation(PathBuf),

    /// The container was already closed.
    #[error("region file {0} is closed")]
    ClosedContainer(PathBuf),

    /// The framed payload does not fit in the 255 sectors a location entry can address.
    #[error("chunk at slot {slot} needs {sectors} sectors (max 255)")]
    ChunkTooLarge { slot: Slot, sectors: u64 },

    /// Every sector a 3-byte location offset can address is in use.
    #[error("region file {0} has no addressable sectors left")]
    RegionFull(PathBuf),

    /// Compression scheme id we cannot read or write.
    #[error("unsupported compression scheme: {0}")]
    UnsupportedCompression(u8),
}

impl RegionError {
    pub(crate) fn corrupt(path: &std::path::Path, reason: impl Into<String>) -> Self {
        RegionError::CorruptContainer {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

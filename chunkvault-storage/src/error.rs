use std::path::PathBuf;

use chunkvault_anvil::RegionError;
use chunkvault_chunk::{ChunkError, ChunkVariant};

use crate::Platform;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Not one of the platforms the provider was built with.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("unsupported dimension: {0}")]
    UnsupportedDimension(i32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    /// `level.dat` exists but could not be decoded.
    #[error("invalid world metadata {path}: {reason}")]
    Metadata { path: PathBuf, reason: String },

    /// Chunks are never migrated between formats implicitly.
    #[error("{variant:?} chunks cannot be stored on platform {platform}")]
    IncompatibleChunk { platform: Platform, variant: ChunkVariant },

    #[error("chunk store {0} is read-only")]
    ReadOnlyViolation(PathBuf),
}

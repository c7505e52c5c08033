use crate::ChunkVariant;

/// Errors raised while decoding, encoding or editing a chunk.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// The payload failed decode validation.
    #[error("malformed chunk: {0}")]
    MalformedChunk(String),

    /// A mutation was attempted on a chunk loaded read-only.
    #[error("chunk ({x}, {z}) is read-only")]
    ReadOnlyViolation { x: i32, z: i32 },

    #[error("position ({x}, {y}, {z}) is outside the chunk")]
    OutOfBounds { x: i32, y: i32, z: i32 },

    #[error("invalid {what}: {value}")]
    InvalidValue { what: &'static str, value: i64 },

    /// The block has no representation in this chunk format.
    #[error("{block} cannot be stored in a {variant:?} chunk")]
    IncompatibleBlock { block: String, variant: ChunkVariant },

    #[error("{variant:?} chunks do not store {what}")]
    Unsupported { variant: ChunkVariant, what: &'static str },

    #[error("expected a {expected:?} chunk, got {found:?}")]
    VariantMismatch { expected: ChunkVariant, found: ChunkVariant },

    #[error("failed to encode chunk: {0}")]
    Encode(String),
}

impl ChunkError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ChunkError::MalformedChunk(reason.into())
    }
}

impl From<fastnbt::error::Error> for ChunkError {
    fn from(e: fastnbt::error::Error) -> Self {
        ChunkError::MalformedChunk(e.to_string())
    }
}

//! The closed set of supported platforms and their capability table.

use std::fmt;
use std::str::FromStr;

use chunkvault_anvil::RegionFormat;
use chunkvault_chunk::{
    ANVIL_12, ANVIL_113, Chunk, ChunkError, ChunkVariant, Codec, DATA_VERSION_MC_1_12_2,
    Java113PostProcessor, LegacyPostProcessor, MCREGION, PostProcessor, peek_data_version,
};

use crate::StoreError;

/// One on-disk world format generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Anvil with 1.13 paletted chunks.
    JavaAnvil113,
    /// Anvil as written by 1.2 - 1.12.2.
    JavaAnvil,
    /// Beta 1.3 - 1.1.
    JavaMcRegion,
}

impl Platform {
    /// Most modern first.
    pub const ALL: [Platform; 3] = [
        Platform::JavaAnvil113,
        Platform::JavaAnvil,
        Platform::JavaMcRegion,
    ];

    /// Stable identifier used in configuration and on the command line.
    pub fn id(self) -> &'static str {
        match self {
            Platform::JavaAnvil113 => "org.pepsoft.anvil.1.13",
            Platform::JavaAnvil => "org.pepsoft.anvil",
            Platform::JavaMcRegion => "org.pepsoft.mcregion",
        }
    }

    pub fn entry(self) -> &'static PlatformEntry {
        match self {
            Platform::JavaAnvil113 => &REGISTRY[0],
            Platform::JavaAnvil => &REGISTRY[1],
            Platform::JavaMcRegion => &REGISTRY[2],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Platform {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.id() == s)
            .ok_or_else(|| StoreError::UnsupportedPlatform(s.to_string()))
    }
}

/// How a platform picks the codec for a stored payload.
pub enum Dispatch {
    Single(&'static Codec),
    /// `DataVersion` absent or `<= threshold` selects `legacy`.
    DataVersion {
        threshold: i32,
        legacy: &'static Codec,
        modern: &'static Codec,
    },
}

/// Everything format-specific about a platform.
pub struct PlatformEntry {
    pub platform: Platform,
    pub format: RegionFormat,
    pub default_max_height: i32,
    pub dispatch: Dispatch,
    /// Codec for chunks created from scratch.
    pub create: &'static Codec,
    pub post_processor: &'static dyn PostProcessor,
}

impl PlatformEntry {
    pub fn codec_for(&self, raw: &[u8]) -> Result<&'static Codec, ChunkError> {
        match self.dispatch {
            Dispatch::Single(codec) => Ok(codec),
            Dispatch::DataVersion {
                threshold,
                legacy,
                modern,
            } => Ok(match peek_data_version(raw)? {
                Some(version) if version > threshold => modern,
                _ => legacy,
            }),
        }
    }

    pub fn decode(&self, raw: &[u8], max_height: i32, read_only: bool) -> Result<Chunk, ChunkError> {
        let codec = self.codec_for(raw)?;
        (codec.decode)(raw, max_height, read_only)
    }

    pub fn create(&self, x: i32, z: i32, max_height: i32) -> Result<Chunk, ChunkError> {
        (self.create.create)(x, z, max_height)
    }

    /// Whether chunks of `variant` may be stored on this platform.
    pub fn accepts(&self, variant: ChunkVariant) -> bool {
        match self.dispatch {
            Dispatch::Single(codec) => codec.variant == variant,
            Dispatch::DataVersion { legacy, modern, .. } => {
                legacy.variant == variant || modern.variant == variant
            }
        }
    }

    /// `None` for platforms without version dispatch.
    pub fn threshold(&self) -> Option<i32> {
        match self.dispatch {
            Dispatch::Single(_) => None,
            Dispatch::DataVersion { threshold, .. } => Some(threshold),
        }
    }
}

/// In `Platform::ALL` order.
pub static REGISTRY: [PlatformEntry; 3] = [
    PlatformEntry {
        platform: Platform::JavaAnvil113,
        format: RegionFormat::Anvil,
        default_max_height: 256,
        dispatch: Dispatch::DataVersion {
            threshold: DATA_VERSION_MC_1_12_2,
            legacy: &ANVIL_12,
            modern: &ANVIL_113,
        },
        create: &ANVIL_113,
        post_processor: &Java113PostProcessor,
    },
    PlatformEntry {
        platform: Platform::JavaAnvil,
        format: RegionFormat::Anvil,
        default_max_height: 256,
        dispatch: Dispatch::DataVersion {
            threshold: DATA_VERSION_MC_1_12_2,
            legacy: &ANVIL_12,
            modern: &ANVIL_113,
        },
        create: &ANVIL_12,
        post_processor: &LegacyPostProcessor,
    },
    PlatformEntry {
        platform: Platform::JavaMcRegion,
        format: RegionFormat::McRegion,
        default_max_height: 128,
        dispatch: Dispatch::Single(&MCREGION),
        create: &MCREGION,
        post_processor: &LegacyPostProcessor,
    },
];

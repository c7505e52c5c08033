use std::num::NonZeroUsize;

use chunkvault_anvil::CompressionScheme;
use log::warn;

pub const ENV_COMPRESSION: &str = "CHUNKVAULT_COMPRESSION";
pub const ENV_MAX_OPEN_REGIONS: &str = "CHUNKVAULT_MAX_OPEN_REGIONS";

pub const DEFAULT_MAX_OPEN_REGIONS: usize = 64;

/// Settings shared by every chunk store a provider opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Compression for newly written payloads. LZ4 can only be read.
    pub compression: CompressionScheme,
    /// Region files kept open per store before the least recently used is closed.
    pub max_open_regions: NonZeroUsize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            compression: CompressionScheme::Zlib,
            max_open_regions: NonZeroUsize::new(DEFAULT_MAX_OPEN_REGIONS).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Invalid values fall back to the defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_COMPRESSION) {
            match value.parse::<CompressionScheme>() {
                Ok(CompressionScheme::Lz4) => {
                    warn!("{ENV_COMPRESSION}=lz4 is read-only, writing {:?}", config.compression)
                }
                Ok(scheme) => config.compression = scheme,
                Err(e) => warn!("Ignoring {ENV_COMPRESSION}: {e}"),
            }
        }

        if let Some(value) = lookup(ENV_MAX_OPEN_REGIONS) {
            match value.trim().parse::<NonZeroUsize>() {
                Ok(max) => config.max_open_regions = max,
                Err(e) => warn!("Ignoring {ENV_MAX_OPEN_REGIONS}={value:?}: {e}"),
            }
        }

        config
    }

    pub fn with_compression(mut self, compression: CompressionScheme) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_max_open_regions(mut self, max_open_regions: NonZeroUsize) -> Self {
        self.max_open_regions = max_open_regions;
        self
    }
}

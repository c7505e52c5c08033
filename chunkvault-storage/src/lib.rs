//! World-level chunk storage: platforms, per-dimension chunk stores and
//! world export on top of the region container and chunk codecs.

mod config;
mod dimension;
mod error;
mod export;
pub mod level;
pub mod platform;
mod provider;
mod recognize;
mod store;

pub use config::{DEFAULT_MAX_OPEN_REGIONS, ENV_COMPRESSION, ENV_MAX_OPEN_REGIONS, StoreConfig};
pub use dimension::Dimension;
pub use error::StoreError;
pub use export::{WorldExporter, default_export_dir};
pub use platform::{Dispatch, Platform, PlatformEntry, REGISTRY};
pub use provider::PlatformProvider;
pub use recognize::recognize_platform;
pub use store::ChunkStore;

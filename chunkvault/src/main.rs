mod json;
mod scan;

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chunkvault_anvil::{ChunkPos, CompressionScheme, RegionError};
use chunkvault_storage::level::LevelMetadata;
use chunkvault_storage::{Dimension, Platform, PlatformProvider, StoreConfig, StoreError};
use clap::{Parser, Subcommand};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "chunkvault", about = "Inspect and maintain Minecraft Java Edition worlds")]
pub struct Args {
    /// Platform id (e.g. "org.pepsoft.anvil.1.13"); recognized from level.dat when omitted
    #[arg(short, long, global = true)]
    pub platform: Option<Platform>,

    /// Compression for rewritten chunks: "gzip", "zlib" or "none"
    /// [default: $CHUNKVAULT_COMPRESSION, else zlib]
    #[arg(long, global = true)]
    pub compression: Option<CompressionScheme>,

    /// Region files kept open per dimension
    /// [default: $CHUNKVAULT_MAX_OPEN_REGIONS, else 64]
    #[arg(long, global = true)]
    pub max_open_regions: Option<NonZeroUsize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Platform, height and region files of a world
    Info { world: PathBuf },
    /// Coordinates of every stored chunk
    List {
        world: PathBuf,
        /// 0 overworld, -1 nether, 1 end
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        dimension: i32,
    },
    /// A chunk payload as JSON
    Dump {
        world: PathBuf,
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        z: i32,
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        dimension: i32,
    },
    /// Recompute lighting and heights of every chunk
    Relight {
        world: PathBuf,
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        dimension: i32,
    },
    /// Check every region file for corrupt or undecodable chunks
    Scan { world: PathBuf },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let provider = PlatformProvider::new().with_config(store_config(&args, StoreConfig::from_env())?);
    match &args.command {
        Command::Info { world } => info_cmd(&provider, args.platform, world),
        Command::List { world, dimension } => list_cmd(&provider, args.platform, world, *dimension),
        Command::Dump {
            world,
            x,
            z,
            dimension,
        } => dump_cmd(&provider, args.platform, world, *dimension, *x, *z),
        Command::Relight { world, dimension } => {
            relight_cmd(&provider, args.platform, world, *dimension)
        }
        Command::Scan { world } => scan_cmd(&provider, args.platform, world),
    }
}

/// Flags override the environment settings in `config`.
fn store_config(args: &Args, mut config: StoreConfig) -> Result<StoreConfig> {
    if let Some(compression) = args.compression {
        if compression == CompressionScheme::Lz4 {
            bail!("LZ4 compressed chunks can be read but not written");
        }
        config = config.with_compression(compression);
    }
    if let Some(max_open_regions) = args.max_open_regions {
        config = config.with_max_open_regions(max_open_regions);
    }
    Ok(config)
}

fn resolve_platform(
    provider: &PlatformProvider,
    explicit: Option<Platform>,
    world: &Path,
) -> Result<Platform> {
    match explicit {
        Some(platform) => Ok(platform),
        None => provider
            .recognize(world)
            .with_context(|| format!("{:?} is not a recognizable world; pass --platform", world)),
    }
}

fn info_cmd(provider: &PlatformProvider, platform: Option<Platform>, world: &Path) -> Result<()> {
    let platform = resolve_platform(provider, platform, world)?;
    let level = LevelMetadata::load(world).with_context(|| format!("Failed to read level.dat of {:?}", world))?;

    println!("World:      {}", level.level_name);
    println!("Platform:   {}", platform);
    println!("Max height: {}", level.max_height());
    for dimension in Dimension::ALL {
        let files = provider.list_region_files(platform, &dimension.region_dir(world))?;
        if !files.is_empty() {
            println!("{:<11} {} region files", format!("{}:", dimension), files.len());
        }
    }
    Ok(())
}

fn list_cmd(
    provider: &PlatformProvider,
    platform: Option<Platform>,
    world: &Path,
    dimension: i32,
) -> Result<()> {
    let platform = resolve_platform(provider, platform, world)?;
    let store = provider
        .open_chunk_store(platform, world, dimension, true)
        .with_context(|| format!("Failed to open dimension {} of {:?}", dimension, world))?;
    for pos in store.chunk_positions()? {
        println!("{} {}", pos.x, pos.z);
    }
    Ok(())
}

fn dump_cmd(
    provider: &PlatformProvider,
    platform: Option<Platform>,
    world: &Path,
    dimension: i32,
    x: i32,
    z: i32,
) -> Result<()> {
    let platform = resolve_platform(provider, platform, world)?;
    let region_dir = Dimension::try_from(dimension)?.region_dir(world);
    let pos = ChunkPos::new(x, z);

    let mut region = provider
        .open_region_container_if_present(platform, &region_dir, pos.region(), true)?
        .with_context(|| format!("No region file for chunk ({}, {})", x, z))?;
    let raw = region
        .read_chunk_bytes(pos.slot())?
        .with_context(|| format!("No chunk stored at ({}, {})", x, z))?;
    region.close()?;

    let nbt: fastnbt::Value = fastnbt::from_bytes(&raw).context("Chunk payload is not valid NBT")?;
    println!("{}", serde_json::to_string_pretty(&json::nbt_to_json(nbt))?);
    Ok(())
}

fn relight_cmd(
    provider: &PlatformProvider,
    platform: Option<Platform>,
    world: &Path,
    dimension: i32,
) -> Result<()> {
    let platform = resolve_platform(provider, platform, world)?;
    let processor = provider.post_processor(platform)?;
    let mut store = provider
        .open_chunk_store(platform, world, dimension, false)
        .with_context(|| format!("Failed to open dimension {} of {:?}", dimension, world))?;

    let (mut relit, mut skipped) = (0usize, 0usize);
    for pos in store.chunk_positions()? {
        let mut chunk = match store.get_chunk(pos.x, pos.z) {
            Ok(Some(chunk)) => chunk,
            Ok(None) => continue,
            Err(e @ (StoreError::Chunk(_) | StoreError::Region(RegionError::CorruptContainer { .. }))) => {
                warn!("Skipping chunk ({}, {}): {}", pos.x, pos.z, e);
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to read chunk ({}, {})", pos.x, pos.z)),
        };
        processor.process(&mut chunk)?;
        store
            .put_chunk(&chunk)
            .with_context(|| format!("Failed to write chunk ({}, {})", pos.x, pos.z))?;
        relit += 1;
    }
    store.close()?;

    info!("Relit {} chunks in dimension {} of {:?}", relit, dimension, world);
    println!("Relit {} chunks ({} skipped)", relit, skipped);
    Ok(())
}

fn scan_cmd(provider: &PlatformProvider, platform: Option<Platform>, world: &Path) -> Result<()> {
    let platform = resolve_platform(provider, platform, world)?;
    let reports = scan::scan_world(provider, platform, world)?;

    let mut problems = 0;
    for report in &reports {
        if let Some(error) = &report.error {
            println!("{:?}: unreadable: {}", report.path, error);
            problems += 1;
        }
        for slot in &report.corrupt {
            println!("{:?}: slot {} has an invalid sector entry", report.path, slot);
            problems += 1;
        }
        for (slot, reason) in &report.malformed {
            println!("{:?}: slot {}: {}", report.path, slot, reason);
            problems += 1;
        }
    }
    let chunks: usize = reports.iter().map(|r| r.chunks).sum();
    println!(
        "Scanned {} region files, {} chunks, {} problems",
        reports.len(),
        chunks,
        problems
    );
    if problems > 0 {
        bail!("{} problems found", problems);
    }
    Ok(())
}

//! Stream command - run the selection engine from a fixed camera and
//! report per-frame streaming statistics.

use std::time::Duration;

use clap::Args;
use terrastream::loader::LoaderRegistry;
use terrastream::select::{EngineOptions, TilesetEngine};
use terrastream::tileset::Tileset;

use super::common::{build_fetcher, fetch_bytes, nadir_view};
use crate::error::CliError;

/// Arguments for the stream command.
#[derive(Debug, Args)]
pub struct StreamArgs {
    /// URL or path of tileset.json
    pub tileset: String,

    /// Camera longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Camera latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Camera height above the ellipsoid in meters
    #[arg(long, default_value_t = 1000.0)]
    pub height: f64,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 1920.0)]
    pub viewport_width: f64,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 1080.0)]
    pub viewport_height: f64,

    /// Vertical field of view in degrees
    #[arg(long, default_value_t = 60.0)]
    pub fov_y: f64,

    /// Maximum screen-space error in pixels
    #[arg(long, default_value_t = 16.0)]
    pub max_sse: f64,

    /// Maximum concurrent content loads
    #[arg(long, default_value_t = 20)]
    pub concurrency: usize,

    /// Number of frames to run
    #[arg(long, default_value_t = 30)]
    pub frames: usize,
}

/// Run the stream command.
pub async fn run(args: StreamArgs) -> Result<(), CliError> {
    if args.frames == 0 {
        return Err(CliError::Argument("--frames must be at least 1".into()));
    }

    let fetcher = build_fetcher()?;
    let json = fetch_bytes(fetcher.as_ref(), &args.tileset).await?;
    let tileset = Tileset::from_json(&json, &args.tileset)?;

    println!("Streaming {} ({} tiles)", args.tileset, tileset.len());
    println!(
        "Camera: lon {}, lat {}, height {} m, max SSE {} px",
        args.lon, args.lat, args.height, args.max_sse
    );
    println!();

    let options = EngineOptions {
        maximum_screen_space_error: args.max_sse,
        max_concurrent_loads: args.concurrency,
        ..EngineOptions::default()
    };
    let mut engine = TilesetEngine::new(
        tileset,
        options,
        fetcher,
        LoaderRegistry::with_default_loaders(),
        tokio::runtime::Handle::current(),
    );

    let view = nadir_view(
        args.lon,
        args.lat,
        args.height,
        args.viewport_width,
        args.viewport_height,
        args.fov_y,
    );

    for _ in 0..args.frames {
        let result = engine.update_view(&view);
        let stats = &result.stats;
        println!(
            "frame {:>4}: selected {:>4}  visited {:>4}  culled {:>4}  \
             loads {:>3} (+{} -{})  evicted {}",
            stats.frame_number,
            stats.selected,
            stats.visited,
            stats.culled,
            stats.loads_in_flight,
            stats.loads_issued,
            stats.loads_cancelled,
            stats.evicted,
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let result = engine.last_result();
    println!();
    println!("Final selection: {} tiles", result.tiles.len());
    for key in &result.tiles {
        let tile = engine.tileset().tile(*key);
        if let Some(url) = &tile.content_url {
            println!("  {}", url);
        }
    }

    Ok(())
}

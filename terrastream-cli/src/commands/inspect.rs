//! Inspect command - summarize a tileset without streaming it.

use clap::Args;
use terrastream::tileset::{TileRefine, Tileset};

use super::common::{build_fetcher, fetch_bytes};
use crate::error::CliError;

/// Arguments for the inspect command.
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// URL or path of tileset.json
    pub tileset: String,
}

/// Run the inspect command.
pub async fn run(args: InspectArgs) -> Result<(), CliError> {
    let fetcher = build_fetcher()?;
    let json = fetch_bytes(fetcher.as_ref(), &args.tileset).await?;
    let tileset = Tileset::from_json(&json, &args.tileset)?;

    let mut with_content = 0usize;
    let mut additive = 0usize;
    let mut leaves = 0usize;
    let mut max_depth = 0usize;

    let mut stack = vec![(tileset.root(), 0usize)];
    while let Some((key, depth)) = stack.pop() {
        let tile = tileset.tile(key);
        max_depth = max_depth.max(depth);
        if tile.content_url.is_some() {
            with_content += 1;
        }
        if tile.refine == TileRefine::Add {
            additive += 1;
        }
        if tile.children.is_empty() {
            leaves += 1;
        } else {
            stack.extend(tile.children.iter().map(|&c| (c, depth + 1)));
        }
    }

    println!("Tileset: {}", args.tileset);
    println!("  Tiles:            {}", tileset.len());
    println!("  With content:     {}", with_content);
    println!("  Leaves:           {}", leaves);
    println!("  Depth:            {}", max_depth);
    println!("  Additive refine:  {}", additive);
    println!("  Geometric error:  {}", tileset.geometric_error);
    println!("  Up axis:          {:?}", tileset.up_axis);
    println!(
        "  Root error:       {}",
        tileset.tile(tileset.root()).geometric_error
    );
    if tileset.metadata.is_some() {
        println!("  Metadata:         present");
    }

    Ok(())
}

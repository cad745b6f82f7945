//! CLI error types.

use thiserror::Error;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("could not fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("invalid tileset: {0}")]
    Tileset(#[from] terrastream::tileset::TilesetError),

    #[error("invalid argument: {0}")]
    Argument(String),
}

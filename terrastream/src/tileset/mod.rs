//! Tile identity, the tileset arena, and passive metadata.
//!
//! A [`Tileset`] owns an arena of [`Tile`]s built once from
//! tileset.json; the tree structure is immutable afterward, and the
//! traversal engine mutates only per-tile content state through
//! [`TileKey`] handles.

mod json;
pub mod metadata;
mod tile;

pub use json::{Tileset, TilesetError};
pub use tile::{Tile, TileContentState, TileKey, TileRefine};

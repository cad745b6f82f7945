//! TerraStream - Streaming and level-of-detail selection for 3D Tiles
//!
//! This library parses 3D Tiles tilesets, loads glTF/GLB/b3dm tile
//! content over pluggable fetchers, and selects the tiles to render
//! each frame from a camera view using screen-space error.

pub mod asset;
pub mod geometry;
pub mod gltf;
pub mod loader;
pub mod select;
pub mod tileset;

//! Serde shapes for tileset.json and the arena construction that
//! turns them into a [`Tileset`].

use glam::{DMat4, DVec3};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::metadata::TilesetMetadataExt;
use super::tile::{Tile, TileKey, TileRefine};
use crate::geometry::{
    BoundingRegion, BoundingSphere, BoundingVolume, GlobeRectangle, OrientedBox, UpAxis,
};
use crate::loader::resolve_relative;

#[derive(Debug, Error)]
pub enum TilesetError {
    #[error("invalid tileset JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tile declares no bounding volume")]
    MissingBoundingVolume,

    #[error("unsupported gltfUpAxis {0:?}")]
    UnsupportedUpAxis(String),
}

#[derive(Debug, Deserialize)]
pub(crate) struct TilesetJson {
    #[serde(default)]
    asset: AssetJson,
    #[serde(rename = "geometricError")]
    geometric_error: f64,
    root: TileJson,
    #[serde(default)]
    extensions: TilesetExtensionsJson,
}

#[derive(Debug, Deserialize, Default)]
struct AssetJson {
    #[serde(default, rename = "gltfUpAxis")]
    gltf_up_axis: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TilesetExtensionsJson {
    #[serde(default, rename = "3DTILES_metadata")]
    metadata: Option<TilesetMetadataExt>,
}

#[derive(Debug, Deserialize)]
struct TileJson {
    #[serde(rename = "boundingVolume")]
    bounding_volume: BoundingVolumeJson,
    #[serde(default, rename = "contentBoundingVolume")]
    content_bounding_volume: Option<BoundingVolumeJson>,
    #[serde(rename = "geometricError")]
    geometric_error: f64,
    #[serde(default)]
    refine: Option<RefineJson>,
    #[serde(default)]
    transform: Option<[f64; 16]>,
    #[serde(default)]
    content: Option<ContentJson>,
    #[serde(default)]
    children: Vec<TileJson>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
enum RefineJson {
    #[serde(alias = "ADD", alias = "Add")]
    Add,
    #[serde(alias = "REPLACE", alias = "Replace")]
    Replace,
}

impl From<RefineJson> for TileRefine {
    fn from(refine: RefineJson) -> Self {
        match refine {
            RefineJson::Add => TileRefine::Add,
            RefineJson::Replace => TileRefine::Replace,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContentJson {
    #[serde(alias = "url")]
    uri: String,
}

#[derive(Debug, Deserialize, Default)]
struct BoundingVolumeJson {
    #[serde(default, rename = "box")]
    oriented_box: Option<[f64; 12]>,
    #[serde(default)]
    region: Option<[f64; 6]>,
    #[serde(default)]
    sphere: Option<[f64; 4]>,
}

impl BoundingVolumeJson {
    /// Converts to an engine volume in global coordinates, applying the
    /// tile's composed transform to box and sphere variants. Regions
    /// are already geodetic and ignore the transform.
    fn to_volume(&self, transform: &DMat4) -> Result<BoundingVolume, TilesetError> {
        if let Some(b) = self.oriented_box {
            let volume = BoundingVolume::Box(OrientedBox::new(
                DVec3::new(b[0], b[1], b[2]),
                [
                    DVec3::new(b[3], b[4], b[5]),
                    DVec3::new(b[6], b[7], b[8]),
                    DVec3::new(b[9], b[10], b[11]),
                ],
            ));
            return Ok(volume.transform(transform));
        }
        if let Some(r) = self.region {
            return Ok(BoundingVolume::Region(BoundingRegion::new(
                GlobeRectangle::new(r[0], r[1], r[2], r[3]),
                r[4],
                r[5],
            )));
        }
        if let Some(s) = self.sphere {
            let volume = BoundingVolume::Sphere(BoundingSphere::new(
                DVec3::new(s[0], s[1], s[2]),
                s[3],
            ));
            return Ok(volume.transform(transform));
        }
        Err(TilesetError::MissingBoundingVolume)
    }
}

/// An immutable tile tree plus the per-tile mutable content slots.
///
/// Tiles live in an arena indexed by [`TileKey`]; children refer to
/// their keys. The tree shape never changes after construction, which
/// is what lets the traversal engine hold `&mut` access to content
/// state without touching structure.
#[derive(Debug)]
pub struct Tileset {
    tiles: Vec<Tile>,
    root: TileKey,
    /// Geometric error to use when the root itself is too coarse.
    pub geometric_error: f64,
    /// Up-axis convention for all glTF content in this tileset.
    pub up_axis: UpAxis,
    pub metadata: Option<TilesetMetadataExt>,
}

impl Tileset {
    /// Parses tileset.json, resolving relative content URIs against
    /// `base_url`.
    pub fn from_json(json: &[u8], base_url: &str) -> Result<Self, TilesetError> {
        let parsed: TilesetJson = serde_json::from_slice(json)?;

        let up_axis = match parsed.asset.gltf_up_axis.as_deref() {
            None => UpAxis::Y,
            Some("X") => UpAxis::X,
            Some("Y") => UpAxis::Y,
            Some("Z") => UpAxis::Z,
            Some(other) => return Err(TilesetError::UnsupportedUpAxis(other.to_string())),
        };

        let mut tiles = Vec::new();
        let root = build_tile(
            &parsed.root,
            &DMat4::IDENTITY,
            TileRefine::Replace,
            base_url,
            &mut tiles,
        )?;

        info!(
            tiles = tiles.len(),
            geometric_error = parsed.geometric_error,
            "built tileset"
        );

        Ok(Self {
            tiles,
            root,
            geometric_error: parsed.geometric_error,
            up_axis,
            metadata: parsed.extensions.metadata,
        })
    }

    pub fn root(&self) -> TileKey {
        self.root
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile(&self, key: TileKey) -> &Tile {
        &self.tiles[key.0]
    }

    pub fn tile_mut(&mut self, key: TileKey) -> &mut Tile {
        &mut self.tiles[key.0]
    }

    pub fn keys(&self) -> impl Iterator<Item = TileKey> {
        (0..self.tiles.len()).map(TileKey)
    }

    /// Builds a tileset directly from tiles, for callers constructing
    /// trees programmatically. The first tile pushed is the root.
    pub fn from_tiles(tiles: Vec<Tile>, geometric_error: f64) -> Self {
        Self {
            tiles,
            root: TileKey(0),
            geometric_error,
            up_axis: UpAxis::Y,
            metadata: None,
        }
    }
}

/// Recursively appends a tile and its subtree to the arena, composing
/// transforms top-down and inheriting the refinement strategy.
fn build_tile(
    json: &TileJson,
    parent_transform: &DMat4,
    inherited_refine: TileRefine,
    base_url: &str,
    tiles: &mut Vec<Tile>,
) -> Result<TileKey, TilesetError> {
    let local = json
        .transform
        .map(|m| DMat4::from_cols_array(&m))
        .unwrap_or(DMat4::IDENTITY);
    let transform = *parent_transform * local;

    let refine = json.refine.map(TileRefine::from).unwrap_or(inherited_refine);

    let mut tile = Tile::new(
        json.bounding_volume.to_volume(&transform)?,
        json.geometric_error,
        refine,
    );
    tile.transform = transform;
    tile.content_url = json
        .content
        .as_ref()
        .map(|c| resolve_relative(base_url, &c.uri));
    tile.content_bounding_volume = json
        .content_bounding_volume
        .as_ref()
        .map(|v| v.to_volume(&transform))
        .transpose()?;

    let key = TileKey(tiles.len());
    tiles.push(tile);

    let mut children = Vec::with_capacity(json.children.len());
    for child in &json.children {
        children.push(build_tile(child, &transform, refine, base_url, tiles)?);
    }
    tiles[key.0].children = children;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tileset_json() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "asset": { "version": "1.0", "gltfUpAxis": "Z" },
            "geometricError": 500.0,
            "root": {
                "boundingVolume": { "region": [-0.1, -0.1, 0.1, 0.1, 0.0, 100.0] },
                "geometricError": 100.0,
                "refine": "REPLACE",
                "content": { "uri": "root.b3dm" },
                "children": [
                    {
                        "boundingVolume": { "region": [-0.1, -0.1, 0.0, 0.1, 0.0, 100.0] },
                        "geometricError": 10.0,
                        "content": { "uri": "0/0.b3dm" }
                    },
                    {
                        "boundingVolume": { "region": [0.0, -0.1, 0.1, 0.1, 0.0, 100.0] },
                        "geometricError": 10.0,
                        "refine": "ADD",
                        "content": { "url": "0/1.b3dm" }
                    }
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_builds_arena_in_order() {
        let tileset =
            Tileset::from_json(&sample_tileset_json(), "https://host/data/tileset.json").unwrap();
        assert_eq!(tileset.len(), 3);
        assert_eq!(tileset.root(), TileKey(0));
        assert_eq!(tileset.tile(tileset.root()).children.len(), 2);
        assert_eq!(tileset.geometric_error, 500.0);
        assert_eq!(tileset.up_axis, UpAxis::Z);
    }

    #[test]
    fn test_content_uris_resolve_against_base() {
        let tileset =
            Tileset::from_json(&sample_tileset_json(), "https://host/data/tileset.json").unwrap();
        let root = tileset.tile(tileset.root());
        assert_eq!(
            root.content_url.as_deref(),
            Some("https://host/data/root.b3dm")
        );
        let child = tileset.tile(root.children[0]);
        assert_eq!(
            child.content_url.as_deref(),
            Some("https://host/data/0/0.b3dm")
        );
    }

    #[test]
    fn test_refine_inherits_and_overrides() {
        let tileset =
            Tileset::from_json(&sample_tileset_json(), "https://host/data/tileset.json").unwrap();
        let root = tileset.tile(tileset.root());
        assert_eq!(root.refine, TileRefine::Replace);
        assert_eq!(
            tileset.tile(root.children[0]).refine,
            TileRefine::Replace,
            "unspecified refine inherits from the parent"
        );
        assert_eq!(tileset.tile(root.children[1]).refine, TileRefine::Add);
    }

    #[test]
    fn test_transform_composes_down_the_tree() {
        let json = serde_json::to_vec(&serde_json::json!({
            "geometricError": 100.0,
            "root": {
                "boundingVolume": { "sphere": [0.0, 0.0, 0.0, 10.0] },
                "geometricError": 50.0,
                "transform": [
                    1.0, 0.0, 0.0, 0.0,
                    0.0, 1.0, 0.0, 0.0,
                    0.0, 0.0, 1.0, 0.0,
                    100.0, 0.0, 0.0, 1.0
                ],
                "children": [{
                    "boundingVolume": { "sphere": [0.0, 0.0, 0.0, 5.0] },
                    "geometricError": 5.0,
                    "transform": [
                        1.0, 0.0, 0.0, 0.0,
                        0.0, 1.0, 0.0, 0.0,
                        0.0, 0.0, 1.0, 0.0,
                        0.0, 50.0, 0.0, 1.0
                    ]
                }]
            }
        }))
        .unwrap();
        let tileset = Tileset::from_json(&json, "https://host/tileset.json").unwrap();

        let root = tileset.tile(tileset.root());
        assert_eq!(root.bounding_volume.center(), DVec3::new(100.0, 0.0, 0.0));
        let child = tileset.tile(root.children[0]);
        assert_eq!(
            child.bounding_volume.center(),
            DVec3::new(100.0, 50.0, 0.0),
            "child volume should carry the composed transform"
        );
    }

    #[test]
    fn test_missing_bounding_volume_is_an_error() {
        let json = serde_json::to_vec(&serde_json::json!({
            "geometricError": 1.0,
            "root": { "boundingVolume": {}, "geometricError": 1.0 }
        }))
        .unwrap();
        assert!(matches!(
            Tileset::from_json(&json, "https://host/tileset.json"),
            Err(TilesetError::MissingBoundingVolume)
        ));
    }

    #[test]
    fn test_unsupported_up_axis_is_an_error() {
        let json = serde_json::to_vec(&serde_json::json!({
            "asset": { "gltfUpAxis": "W" },
            "geometricError": 1.0,
            "root": { "boundingVolume": { "sphere": [0.0, 0.0, 0.0, 1.0] }, "geometricError": 1.0 }
        }))
        .unwrap();
        assert!(matches!(
            Tileset::from_json(&json, "https://host/tileset.json"),
            Err(TilesetError::UnsupportedUpAxis(_))
        ));
    }
}

//! Tile identity and per-tile mutable content state.

use glam::DMat4;

use crate::geometry::BoundingVolume;
use crate::loader::LoadResult;

/// Index of a tile in its tileset's arena. Stable for the lifetime of
/// the tileset; the tree itself is immutable after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileKey(pub usize);

/// How a refined tile relates to its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileRefine {
    /// Parent and children render simultaneously.
    Add,
    /// Children supersede the parent once they are all settled.
    Replace,
}

/// The per-tile content lifecycle.
///
/// `Unloaded → Loading → (Loaded | Failed)`, and back to `Unloaded`
/// on eviction or load cancellation. `Failed` never moves to `Loaded`
/// directly; an explicit retry resets it to `Unloaded` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileContentState {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

impl TileContentState {
    /// Whether the state machine permits this transition.
    pub fn can_transition_to(self, next: TileContentState) -> bool {
        use TileContentState::*;
        matches!(
            (self, next),
            (Unloaded, Loading)
                | (Loading, Loaded)
                | (Loading, Failed)
                | (Loading, Unloaded)
                | (Loaded, Unloaded)
                | (Failed, Unloaded)
        )
    }
}

/// A node of the spatial tree.
///
/// The structural fields are fixed at construction; only the content
/// fields (`state`, `content`, the bookkeeping counters) change across
/// frames, and only on the traversal thread.
#[derive(Debug)]
pub struct Tile {
    /// Bounding volume in global coordinates (the declared transform is
    /// already composed in at construction).
    pub bounding_volume: BoundingVolume,
    /// Tighter volume around just the content, when declared.
    pub content_bounding_volume: Option<BoundingVolume>,
    /// Non-negative; non-increasing along any root-to-leaf path.
    pub geometric_error: f64,
    pub refine: TileRefine,
    /// Composed tile-to-global transform (ancestors included).
    pub transform: DMat4,
    /// Resolved content URL; tiles without content are structural only.
    pub content_url: Option<String>,
    pub children: Vec<TileKey>,

    pub state: TileContentState,
    pub content: Option<LoadResult>,
    /// Frame counter value when this tile was last selected or stood
    /// in for its subtree. Drives eviction.
    pub last_selected_frame: u64,
    /// Bumped whenever a load is started or cancelled; completions
    /// carrying a stale generation are discarded.
    pub load_generation: u64,
}

impl Tile {
    pub fn new(bounding_volume: BoundingVolume, geometric_error: f64, refine: TileRefine) -> Self {
        Self {
            bounding_volume,
            content_bounding_volume: None,
            geometric_error,
            refine,
            transform: DMat4::IDENTITY,
            content_url: None,
            children: Vec::new(),
            state: TileContentState::Unloaded,
            content: None,
            last_selected_frame: 0,
            load_generation: 0,
        }
    }

    /// Whether the tile has content to load at all.
    pub fn has_content(&self) -> bool {
        self.content_url.is_some()
    }
}

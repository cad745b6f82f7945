//! Per-frame selection output.

use crate::tileset::TileKey;

/// Counters describing what one frame's traversal did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame_number: u64,
    /// Tiles visited by the traversal.
    pub visited: usize,
    /// Tiles (with their subtrees) skipped by frustum culling.
    pub culled: usize,
    /// Tiles in the final render set.
    pub selected: usize,
    /// Loads started this frame.
    pub loads_issued: usize,
    /// Loads still in flight after admission.
    pub loads_in_flight: usize,
    /// Loads cancelled because their tile left the selection.
    pub loads_cancelled: usize,
    /// Tiles whose content was evicted this frame.
    pub evicted: usize,
}

/// The render set chosen for one frame, in traversal order, plus the
/// frame counters. Valid until the next `update_view` call; renderers
/// resolve each key's content through the engine.
#[derive(Debug, Clone, Default)]
pub struct SelectionResult {
    pub tiles: Vec<TileKey>,
    pub stats: FrameStats,
}

impl SelectionResult {
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, key: TileKey) -> bool {
        self.tiles.contains(&key)
    }
}

//! Engine configuration.

use crate::geometry::Projection;

/// Tuning knobs for the selection engine. The defaults are reasonable
/// for terrain streaming; renderers with tighter memory budgets mainly
/// adjust the eviction pair.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// A tile whose screen-space error is at or below this threshold
    /// is detailed enough and stops refinement.
    pub maximum_screen_space_error: f64,
    /// Concurrency cap on in-flight content loads.
    pub max_concurrent_loads: usize,
    /// A content-bearing tile unselected for this many frames has its
    /// content evicted.
    pub frames_before_eviction: u64,
    /// Soft cap on tiles holding content; exceeding it evicts
    /// least-recently-selected tiles first.
    pub max_cached_tiles: usize,
    /// Disable to visit tiles outside the frustum (useful for tests
    /// and offline statistics).
    pub enable_frustum_culling: bool,
    /// Hard recursion limit; `None` trusts the tree's own depth.
    pub max_depth: Option<u32>,
    /// Raster-overlay projections to generate texture coordinates
    /// for on every loaded tile, one channel each.
    pub overlay_projections: Vec<Projection>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            maximum_screen_space_error: 16.0,
            max_concurrent_loads: 20,
            frames_before_eviction: 8,
            max_cached_tiles: 512,
            enable_frustum_culling: true,
            max_depth: None,
            overlay_projections: Vec::new(),
        }
    }
}

//! The frame-driven tile selection engine.
//!
//! `update_view` runs once per frame on one thread (`&mut self`
//! enforces that). Each frame it drains completed loads, walks the
//! tree deciding select-vs-refine per tile, admits new loads under the
//! concurrency cap, cancels loads for tiles that fell out of the
//! selection, and evicts stale content. Load tasks run on a
//! caller-supplied tokio handle and report back over a channel, so
//! cache state only ever changes here, between frames.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::options::EngineOptions;
use super::priority::LoadPriority;
use super::result::{FrameStats, SelectionResult};
use super::view::ViewState;
use crate::asset::AssetFetcher;
use crate::loader::{ContentOptions, LoadContext, LoadError, LoadInput, LoadResult, LoaderRegistry};
use crate::tileset::{TileContentState, TileKey, TileRefine, Tileset};

/// What a subtree visit contributed to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitOutcome {
    /// Something from this subtree is in the render set.
    Rendered,
    /// The subtree wants to render but its content is not resident yet.
    Pending,
    /// Entirely outside the frustum.
    Culled,
    /// Settled with nothing to render (no content, or failed).
    Empty,
}

/// A load that completed on a worker task.
struct LoadCompletion {
    key: TileKey,
    generation: u64,
    outcome: Result<LoadResult, LoadError>,
}

struct InFlight {
    generation: u64,
    token: CancellationToken,
}

/// Per-frame working state, separate from the engine so recursive
/// visits can borrow both.
struct FrameScratch {
    selected: Vec<TileKey>,
    candidates: Vec<(TileKey, LoadPriority)>,
    stats: FrameStats,
}

/// Owns a tileset and drives its streaming.
pub struct TilesetEngine {
    tileset: Tileset,
    options: EngineOptions,
    fetcher: Arc<dyn AssetFetcher>,
    registry: Arc<LoaderRegistry>,
    handle: Handle,
    completion_tx: mpsc::UnboundedSender<LoadCompletion>,
    completion_rx: mpsc::UnboundedReceiver<LoadCompletion>,
    in_flight: HashMap<TileKey, InFlight>,
    frame_number: u64,
    result: SelectionResult,
}

impl TilesetEngine {
    pub fn new(
        tileset: Tileset,
        options: EngineOptions,
        fetcher: Arc<dyn AssetFetcher>,
        registry: LoaderRegistry,
        handle: Handle,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            tileset,
            options,
            fetcher,
            registry: Arc::new(registry),
            handle,
            completion_tx,
            completion_rx,
            in_flight: HashMap::new(),
            frame_number: 0,
            result: SelectionResult::default(),
        }
    }

    pub fn tileset(&self) -> &Tileset {
        &self.tileset
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// The resolved content of a loaded tile.
    pub fn content(&self, key: TileKey) -> Option<&LoadResult> {
        self.tileset.tile(key).content.as_ref()
    }

    /// The previous frame's selection, untouched until the next
    /// `update_view`.
    pub fn last_result(&self) -> &SelectionResult {
        &self.result
    }

    /// Runs one frame: returns the tiles to render for `view`.
    pub fn update_view(&mut self, view: &ViewState) -> &SelectionResult {
        self.frame_number += 1;

        self.apply_completions();

        let mut scratch = FrameScratch {
            selected: Vec::new(),
            candidates: Vec::new(),
            stats: FrameStats {
                frame_number: self.frame_number,
                ..FrameStats::default()
            },
        };
        self.visit(self.tileset.root(), view, 0, &mut scratch);

        self.admit_loads(&mut scratch);
        self.cancel_unselected(&mut scratch.stats);
        self.evict(&mut scratch.stats);

        scratch.stats.selected = scratch.selected.len();
        scratch.stats.loads_in_flight = self.in_flight.len();
        debug!(
            frame = scratch.stats.frame_number,
            visited = scratch.stats.visited,
            culled = scratch.stats.culled,
            selected = scratch.stats.selected,
            loads_issued = scratch.stats.loads_issued,
            in_flight = scratch.stats.loads_in_flight,
            "frame complete"
        );

        self.result = SelectionResult {
            tiles: scratch.selected,
            stats: scratch.stats,
        };
        &self.result
    }

    /// Resets every `Failed` tile to `Unloaded` so the next frame may
    /// request it again.
    pub fn retry_failed(&mut self) -> usize {
        let mut reset = 0;
        for key in self.tileset.keys().collect::<Vec<_>>() {
            let tile = self.tileset.tile_mut(key);
            if tile.state == TileContentState::Failed {
                tile.state = TileContentState::Unloaded;
                tile.load_generation += 1;
                reset += 1;
            }
        }
        if reset > 0 {
            debug!(reset, "failed tiles queued for retry");
        }
        reset
    }

    // ========================================================================
    // Completions
    // ========================================================================

    /// Applies every completion that arrived since the last frame.
    /// A completion whose generation no longer matches belongs to a
    /// cancelled load and is discarded without touching cache state.
    fn apply_completions(&mut self) {
        while let Ok(completion) = self.completion_rx.try_recv() {
            // The tile may have been cancelled and re-admitted since
            // this completion was sent; a newer generation's entry must
            // stay tracked or its token and concurrency slot leak.
            if self
                .in_flight
                .get(&completion.key)
                .is_some_and(|in_flight| in_flight.generation == completion.generation)
            {
                self.in_flight.remove(&completion.key);
            }
            let tile = self.tileset.tile_mut(completion.key);
            if tile.state != TileContentState::Loading
                || tile.load_generation != completion.generation
            {
                trace!(key = completion.key.0, "discarding stale load completion");
                continue;
            }
            debug_assert!(tile.state.can_transition_to(TileContentState::Loaded));
            match completion.outcome {
                Ok(result) => {
                    if !result.diagnostics.is_empty() {
                        warn!(
                            key = completion.key.0,
                            diagnostics = ?result.diagnostics,
                            "tile content loaded with diagnostics"
                        );
                    }
                    tile.content = Some(result);
                    tile.state = TileContentState::Loaded;
                }
                Err(error) => {
                    warn!(key = completion.key.0, %error, "tile content load failed");
                    tile.content = None;
                    tile.state = TileContentState::Failed;
                }
            }
        }
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    fn visit(
        &mut self,
        key: TileKey,
        view: &ViewState,
        depth: u32,
        scratch: &mut FrameScratch,
    ) -> VisitOutcome {
        scratch.stats.visited += 1;

        let tile = self.tileset.tile(key);
        if self.options.enable_frustum_culling && !view.is_visible(&tile.bounding_volume) {
            scratch.stats.culled += 1;
            return VisitOutcome::Culled;
        }

        let distance = view.distance_to(&tile.bounding_volume);
        let sse = view.screen_space_error(tile.geometric_error, distance);
        let refine = tile.refine;
        let depth_capped = self.options.max_depth.is_some_and(|max| depth >= max);
        let refines = sse > self.options.maximum_screen_space_error
            && !tile.children.is_empty()
            && !depth_capped;

        if !refines {
            return self.select_tile(key, distance, sse, scratch);
        }

        match refine {
            TileRefine::Add => {
                // Parent renders alongside its children.
                let parent_outcome = self.select_tile(key, distance, sse, scratch);
                let mut any_rendered = parent_outcome == VisitOutcome::Rendered;
                let mut any_pending = parent_outcome == VisitOutcome::Pending;
                for child in self.tileset.tile(key).children.clone() {
                    match self.visit(child, view, depth + 1, scratch) {
                        VisitOutcome::Rendered => any_rendered = true,
                        VisitOutcome::Pending => any_pending = true,
                        VisitOutcome::Culled | VisitOutcome::Empty => {}
                    }
                }
                if any_rendered {
                    VisitOutcome::Rendered
                } else if any_pending {
                    VisitOutcome::Pending
                } else {
                    VisitOutcome::Empty
                }
            }
            TileRefine::Replace => {
                // Children supersede the parent, but only once every
                // required child is settled; until then the parent
                // stands in so the screen shows no hole.
                let mark = scratch.selected.len();
                let mut any_pending = false;
                let mut any_rendered = false;
                for child in self.tileset.tile(key).children.clone() {
                    match self.visit(child, view, depth + 1, scratch) {
                        VisitOutcome::Pending => any_pending = true,
                        VisitOutcome::Rendered => any_rendered = true,
                        VisitOutcome::Culled | VisitOutcome::Empty => {}
                    }
                }

                if !any_pending {
                    return if any_rendered {
                        VisitOutcome::Rendered
                    } else {
                        VisitOutcome::Empty
                    };
                }

                if self.tileset.tile(key).has_content() {
                    // Drop the partial children from the render set;
                    // their loads stay requested so refinement finishes
                    // in a later frame.
                    scratch.selected.truncate(mark);
                    self.select_tile(key, distance, sse, scratch)
                } else {
                    // Nothing to stand in with; keep whatever children
                    // already render and report the gap upward.
                    VisitOutcome::Pending
                }
            }
        }
    }

    /// Selects `key` as its subtree's representative: marks it in use,
    /// requests content when needed, and adds it to the render set if
    /// resident.
    fn select_tile(
        &mut self,
        key: TileKey,
        distance: f64,
        sse: f64,
        scratch: &mut FrameScratch,
    ) -> VisitOutcome {
        let frame = self.frame_number;
        let tile = self.tileset.tile_mut(key);
        tile.last_selected_frame = frame;

        if !tile.has_content() {
            return VisitOutcome::Empty;
        }
        match tile.state {
            TileContentState::Loaded => {
                scratch.selected.push(key);
                VisitOutcome::Rendered
            }
            TileContentState::Loading => VisitOutcome::Pending,
            TileContentState::Unloaded => {
                scratch.candidates.push((
                    key,
                    LoadPriority {
                        distance,
                        screen_space_error: sse,
                    },
                ));
                VisitOutcome::Pending
            }
            TileContentState::Failed => VisitOutcome::Empty,
        }
    }

    // ========================================================================
    // Load admission & cancellation
    // ========================================================================

    /// Starts the highest-priority candidate loads up to the
    /// concurrency cap. Everything past the cap stays `Unloaded` and
    /// is retried next frame if still selected.
    fn admit_loads(&mut self, scratch: &mut FrameScratch) {
        let available = self
            .options
            .max_concurrent_loads
            .saturating_sub(self.in_flight.len());
        if available == 0 || scratch.candidates.is_empty() {
            return;
        }

        scratch.candidates.sort_by_key(|(_, priority)| *priority);
        let admitted: Vec<TileKey> = scratch
            .candidates
            .iter()
            .take(available)
            .map(|(key, _)| *key)
            .collect();
        for key in admitted {
            self.start_load(key);
            scratch.stats.loads_issued += 1;
        }
    }

    fn start_load(&mut self, key: TileKey) {
        let up_axis = self.tileset.up_axis;
        let tile = self.tileset.tile_mut(key);
        debug_assert!(tile.state.can_transition_to(TileContentState::Loading));
        tile.state = TileContentState::Loading;
        tile.load_generation += 1;
        let generation = tile.load_generation;

        let input = LoadInput {
            url: tile.content_url.clone().unwrap_or_default(),
            headers: Vec::new(),
            bytes: None,
            transform: tile.transform,
            options: ContentOptions {
                up_axis,
                generate_bounding_region: true,
                overlay_projections: self.options.overlay_projections.clone(),
                overlay_first_channel: 0,
            },
        };

        let token = CancellationToken::new();
        self.in_flight.insert(
            key,
            InFlight {
                generation,
                token: token.clone(),
            },
        );

        let registry = self.registry.clone();
        let fetcher = self.fetcher.clone();
        let tx = self.completion_tx.clone();
        trace!(key = key.0, url = %input.url, "starting load");
        self.handle.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                outcome = registry.dispatch(LoadContext { fetcher: fetcher.as_ref() }, input) => {
                    let _ = tx.send(LoadCompletion { key, generation, outcome });
                }
            }
        });
    }

    /// Cancels loads for tiles the traversal no longer wants. The
    /// token stops the worker cooperatively; the generation bump makes
    /// any already-sent completion stale.
    fn cancel_unselected(&mut self, stats: &mut FrameStats) {
        let frame = self.frame_number;
        let stale: Vec<TileKey> = self
            .in_flight
            .keys()
            .copied()
            .filter(|key| self.tileset.tile(*key).last_selected_frame != frame)
            .collect();
        for key in stale {
            if let Some(in_flight) = self.in_flight.remove(&key) {
                in_flight.token.cancel();
            }
            let tile = self.tileset.tile_mut(key);
            tile.load_generation += 1;
            tile.state = TileContentState::Unloaded;
            stats.loads_cancelled += 1;
            trace!(key = key.0, "cancelled load for deselected tile");
        }
    }

    // ========================================================================
    // Eviction
    // ========================================================================

    /// Two-stage eviction: content unselected for `frames_before_eviction`
    /// frames goes first; if the cache still exceeds `max_cached_tiles`,
    /// least-recently-selected content goes until it fits. Ties break
    /// on ascending key so the policy is deterministic.
    fn evict(&mut self, stats: &mut FrameStats) {
        let frame = self.frame_number;
        let threshold = self.options.frames_before_eviction;

        let mut resident: Vec<(u64, TileKey)> = Vec::new();
        for key in self.tileset.keys().collect::<Vec<_>>() {
            let tile = self.tileset.tile_mut(key);
            if tile.state != TileContentState::Loaded {
                continue;
            }
            if frame.saturating_sub(tile.last_selected_frame) >= threshold {
                tile.state = TileContentState::Unloaded;
                tile.content = None;
                stats.evicted += 1;
            } else {
                resident.push((tile.last_selected_frame, key));
            }
        }

        let over = resident.len().saturating_sub(self.options.max_cached_tiles);
        if over == 0 {
            return;
        }
        resident.sort();
        for (selected_frame, key) in resident.into_iter().take(over) {
            // Never evict content the current frame is rendering.
            if selected_frame == frame {
                break;
            }
            let tile = self.tileset.tile_mut(key);
            tile.state = TileContentState::Unloaded;
            tile.content = None;
            stats.evicted += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::testutil::InMemoryFetcher;
    use crate::asset::{AssetError, AssetResponse};
    use crate::geometry::{BoundingSphere, BoundingVolume};
    use crate::gltf::testutil::make_glb;
    use crate::tileset::Tile;
    use futures::future::BoxFuture;
    use glam::DVec3;
    use std::f64::consts::FRAC_PI_2;
    use std::time::Duration;
    use tokio::sync::watch;

    /// Holds every fetch until the gate is opened.
    struct GatedFetcher {
        inner: InMemoryFetcher,
        gate: watch::Receiver<bool>,
    }

    impl AssetFetcher for GatedFetcher {
        fn fetch<'a>(
            &'a self,
            url: &'a str,
            headers: &'a [(String, String)],
        ) -> BoxFuture<'a, Result<AssetResponse, AssetError>> {
            let mut gate = self.gate.clone();
            Box::pin(async move {
                while !*gate.borrow() {
                    if gate.changed().await.is_err() {
                        break;
                    }
                }
                self.inner.fetch(url, headers).await
            })
        }
    }

    fn sphere(x: f64, radius: f64) -> BoundingVolume {
        BoundingVolume::Sphere(BoundingSphere::new(DVec3::new(x, 0.0, 0.0), radius))
    }

    /// A root that always refines plus `child_count` leaf children at
    /// increasing distance from the camera at the origin.
    fn make_tree(refine: TileRefine, child_count: usize, root_has_content: bool) -> Tileset {
        let mut root = Tile::new(sphere(100.0, 200.0), 1e9, refine);
        if root_has_content {
            root.content_url = Some("mem://root".to_string());
        }
        let mut tiles = vec![root];
        let mut children = Vec::new();
        for i in 0..child_count {
            let mut child = Tile::new(sphere(60.0 + 20.0 * i as f64, 10.0), 0.0, refine);
            child.content_url = Some(format!("mem://child{}", i));
            children.push(TileKey(tiles.len()));
            tiles.push(child);
        }
        tiles[0].children = children;
        Tileset::from_tiles(tiles, 1e9)
    }

    fn populate(fetcher: &InMemoryFetcher, child_count: usize) {
        fetcher.insert("mem://root", make_glb(&[[0.0, 0.0, 0.0]], None));
        for i in 0..child_count {
            fetcher.insert(
                format!("mem://child{}", i),
                make_glb(&[[i as f32, 0.0, 0.0]], None),
            );
        }
    }

    fn forward_view() -> ViewState {
        ViewState::new(DVec3::ZERO, DVec3::X, DVec3::Z, 1000.0, 1000.0, FRAC_PI_2)
    }

    fn backward_view() -> ViewState {
        ViewState::new(DVec3::ZERO, -DVec3::X, DVec3::Z, 1000.0, 1000.0, FRAC_PI_2)
    }

    fn test_options() -> EngineOptions {
        EngineOptions {
            enable_frustum_culling: false,
            frames_before_eviction: 100,
            ..EngineOptions::default()
        }
    }

    fn engine(
        tileset: Tileset,
        options: EngineOptions,
        fetcher: Arc<dyn AssetFetcher>,
    ) -> TilesetEngine {
        TilesetEngine::new(
            tileset,
            options,
            fetcher,
            LoaderRegistry::with_default_loaders(),
            Handle::current(),
        )
    }

    /// Runs a few frames with small pauses so spawned loads can finish.
    async fn settle(target: &mut TilesetEngine, view: &ViewState, frames: usize) {
        for _ in 0..frames {
            tokio::time::sleep(Duration::from_millis(3)).await;
            target.update_view(view);
        }
    }

    fn state_of(target: &TilesetEngine, key: TileKey) -> TileContentState {
        target.tileset().tile(key).state
    }

    #[tokio::test]
    async fn test_admission_respects_concurrency_cap() {
        let (_gate_tx, gate_rx) = watch::channel(false);
        let fetcher = GatedFetcher {
            inner: InMemoryFetcher::new(),
            gate: gate_rx,
        };
        let options = EngineOptions {
            max_concurrent_loads: 2,
            ..test_options()
        };
        let mut target = engine(make_tree(TileRefine::Replace, 3, false), options, Arc::new(fetcher));

        let result = target.update_view(&forward_view());
        assert_eq!(result.stats.loads_issued, 2, "cap of 2 must admit exactly 2 of 3");

        // The two nearest children load; the farthest waits.
        assert_eq!(state_of(&target, TileKey(1)), TileContentState::Loading);
        assert_eq!(state_of(&target, TileKey(2)), TileContentState::Loading);
        assert_eq!(state_of(&target, TileKey(3)), TileContentState::Unloaded);
    }

    #[tokio::test]
    async fn test_tiles_beyond_cap_are_retried_next_frame() {
        let (gate_tx, gate_rx) = watch::channel(false);
        let inner = InMemoryFetcher::new();
        populate(&inner, 3);
        let fetcher = GatedFetcher { inner, gate: gate_rx };
        let options = EngineOptions {
            max_concurrent_loads: 2,
            ..test_options()
        };
        let mut target = engine(make_tree(TileRefine::Replace, 3, false), options, Arc::new(fetcher));

        target.update_view(&forward_view());
        assert_eq!(state_of(&target, TileKey(3)), TileContentState::Unloaded);

        gate_tx.send(true).unwrap();
        settle(&mut target, &forward_view(), 6).await;

        for key in [TileKey(1), TileKey(2), TileKey(3)] {
            assert_eq!(state_of(&target, key), TileContentState::Loaded);
        }
        assert_eq!(target.last_result().tiles.len(), 3);
    }

    #[tokio::test]
    async fn test_loading_tile_is_not_fetched_twice() {
        let (gate_tx, gate_rx) = watch::channel(false);
        let inner = InMemoryFetcher::new();
        populate(&inner, 1);
        let fetcher = Arc::new(GatedFetcher { inner, gate: gate_rx });
        let mut target = engine(
            make_tree(TileRefine::Replace, 1, false),
            test_options(),
            fetcher.clone(),
        );

        // Re-select the tile across several frames while its load is
        // still in flight.
        target.update_view(&forward_view());
        tokio::time::sleep(Duration::from_millis(3)).await;
        target.update_view(&forward_view());
        assert_eq!(state_of(&target, TileKey(1)), TileContentState::Loading);

        gate_tx.send(true).unwrap();
        settle(&mut target, &forward_view(), 3).await;
        assert_eq!(state_of(&target, TileKey(1)), TileContentState::Loaded);
        assert_eq!(fetcher.inner.fetches(), 1, "re-selection must not reissue the fetch");
    }

    #[tokio::test]
    async fn test_completed_load_enters_the_selection() {
        let fetcher = InMemoryFetcher::new();
        fetcher.insert("mem://root", make_glb(&[[1.0, 2.0, 3.0]], None));
        let mut root = Tile::new(sphere(100.0, 10.0), 0.0, TileRefine::Replace);
        root.content_url = Some("mem://root".to_string());
        let tileset = Tileset::from_tiles(vec![root], 1e9);
        let mut target = engine(tileset, test_options(), Arc::new(fetcher));

        let first = target.update_view(&forward_view());
        assert!(first.is_empty());
        assert_eq!(state_of(&target, TileKey(0)), TileContentState::Loading);

        settle(&mut target, &forward_view(), 4).await;
        assert_eq!(state_of(&target, TileKey(0)), TileContentState::Loaded);
        assert!(target.last_result().contains(TileKey(0)));
        let content = target.content(TileKey(0)).unwrap();
        assert!(content.model.is_some(), "Loaded implies a well-formed result");
    }

    #[tokio::test]
    async fn test_failed_load_is_excluded_until_retry() {
        // Empty fetcher: every URL 404s, which dispatch surfaces as a
        // fetch failure.
        let fetcher = Arc::new(InMemoryFetcher::new());
        let mut target = engine(
            make_tree(TileRefine::Replace, 1, false),
            test_options(),
            fetcher.clone(),
        );

        settle(&mut target, &forward_view(), 4).await;
        assert_eq!(state_of(&target, TileKey(1)), TileContentState::Failed);
        assert!(target.content(TileKey(1)).is_none(), "Failed implies no model");
        assert!(target.last_result().is_empty());

        let fetches_after_failure = fetcher.fetches();
        settle(&mut target, &forward_view(), 3).await;
        assert_eq!(
            fetcher.fetches(),
            fetches_after_failure,
            "failed tiles must not be re-requested without an explicit retry"
        );

        assert_eq!(target.retry_failed(), 1);
        target.update_view(&forward_view());
        assert_eq!(state_of(&target, TileKey(1)), TileContentState::Loading);
        // Let the reissued load's task actually reach the fetcher.
        settle(&mut target, &forward_view(), 2).await;
        assert!(fetcher.fetches() > fetches_after_failure);
    }

    #[tokio::test]
    async fn test_replace_parent_stands_in_until_children_settle() {
        let (gate_tx, gate_rx) = watch::channel(false);
        let inner = InMemoryFetcher::new();
        populate(&inner, 2);
        let fetcher = GatedFetcher { inner, gate: gate_rx };
        let options = EngineOptions {
            max_concurrent_loads: 1,
            ..test_options()
        };
        let mut target = engine(make_tree(TileRefine::Replace, 2, true), options, Arc::new(fetcher));

        // The stand-in parent is nearest, so the cap of 1 goes to it.
        target.update_view(&forward_view());
        assert_eq!(state_of(&target, TileKey(0)), TileContentState::Loading);

        // Let the parent finish, then close the gate again so the
        // children stay pending.
        gate_tx.send(true).unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        gate_tx.send(false).unwrap();

        let result = target.update_view(&forward_view());
        assert_eq!(
            result.tiles,
            vec![TileKey(0)],
            "parent must stand in while children are pending"
        );

        gate_tx.send(true).unwrap();
        settle(&mut target, &forward_view(), 8).await;
        let result = target.last_result();
        assert!(result.contains(TileKey(1)));
        assert!(result.contains(TileKey(2)));
        assert!(
            !result.contains(TileKey(0)),
            "loaded children supersede the parent under Replace"
        );
    }

    #[tokio::test]
    async fn test_add_refinement_renders_parent_and_children() {
        let fetcher = InMemoryFetcher::new();
        populate(&fetcher, 2);
        let mut target = engine(
            make_tree(TileRefine::Add, 2, true),
            test_options(),
            Arc::new(fetcher),
        );

        settle(&mut target, &forward_view(), 6).await;
        let result = target.last_result();
        assert!(result.contains(TileKey(0)), "Add keeps the parent rendered");
        assert!(result.contains(TileKey(1)));
        assert!(result.contains(TileKey(2)));
    }

    #[tokio::test]
    async fn test_stale_completion_does_not_untrack_live_load() {
        let (_gate_tx, gate_rx) = watch::channel(false);
        let inner = InMemoryFetcher::new();
        populate(&inner, 1);
        let fetcher = GatedFetcher { inner, gate: gate_rx };
        let mut target = engine(
            make_tree(TileRefine::Replace, 1, false),
            test_options(),
            Arc::new(fetcher),
        );

        target.update_view(&forward_view());
        assert_eq!(state_of(&target, TileKey(1)), TileContentState::Loading);
        let live_generation = target.in_flight[&TileKey(1)].generation;

        // A completion from an earlier, superseded generation of the
        // same tile arrives late.
        target
            .completion_tx
            .send(LoadCompletion {
                key: TileKey(1),
                generation: live_generation - 1,
                outcome: Ok(LoadResult::malformed(Vec::new(), glam::DMat4::IDENTITY)),
            })
            .unwrap();

        let result = target.update_view(&forward_view()).clone();
        assert_eq!(state_of(&target, TileKey(1)), TileContentState::Loading);
        assert!(
            target.in_flight.contains_key(&TileKey(1)),
            "live load must stay tracked for cancellation and admission"
        );
        assert_eq!(result.stats.loads_in_flight, 1);
    }

    #[tokio::test]
    async fn test_deselected_loading_tile_is_cancelled_and_completion_discarded() {
        let (gate_tx, gate_rx) = watch::channel(false);
        let inner = InMemoryFetcher::new();
        populate(&inner, 1);
        let fetcher = GatedFetcher { inner, gate: gate_rx };
        let options = EngineOptions {
            enable_frustum_culling: true,
            frames_before_eviction: 100,
            ..EngineOptions::default()
        };
        let mut target = engine(make_tree(TileRefine::Replace, 1, false), options, Arc::new(fetcher));

        target.update_view(&forward_view());
        assert_eq!(state_of(&target, TileKey(1)), TileContentState::Loading);

        // Look away: the child is culled, its load cancelled.
        let result = target.update_view(&backward_view());
        assert_eq!(result.stats.loads_cancelled, 1);
        assert_eq!(state_of(&target, TileKey(1)), TileContentState::Unloaded);

        // Release the fetch; whatever the worker does now is stale.
        gate_tx.send(true).unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        target.update_view(&backward_view());

        assert_eq!(state_of(&target, TileKey(1)), TileContentState::Unloaded);
        assert!(
            target.content(TileKey(1)).is_none(),
            "late completion must not mutate cache state"
        );
    }

    #[tokio::test]
    async fn test_stale_content_is_evicted_after_configured_frames() {
        let fetcher = InMemoryFetcher::new();
        populate(&fetcher, 2);
        let options = EngineOptions {
            enable_frustum_culling: true,
            frames_before_eviction: 2,
            ..EngineOptions::default()
        };
        let mut target = engine(make_tree(TileRefine::Replace, 2, false), options, Arc::new(fetcher));

        settle(&mut target, &forward_view(), 5).await;
        assert_eq!(state_of(&target, TileKey(1)), TileContentState::Loaded);

        // The children fall out of view; after the threshold their
        // content is dropped.
        settle(&mut target, &backward_view(), 4).await;
        assert_eq!(state_of(&target, TileKey(1)), TileContentState::Unloaded);
        assert_eq!(state_of(&target, TileKey(2)), TileContentState::Unloaded);
        assert!(target.content(TileKey(1)).is_none());
    }

    #[tokio::test]
    async fn test_cache_pressure_evicts_least_recently_selected_first() {
        let fetcher = InMemoryFetcher::new();
        populate(&fetcher, 2);
        let options = EngineOptions {
            enable_frustum_culling: true,
            frames_before_eviction: 100,
            max_cached_tiles: 1,
            ..EngineOptions::default()
        };
        let mut target = engine(make_tree(TileRefine::Replace, 2, false), options, Arc::new(fetcher));

        settle(&mut target, &forward_view(), 5).await;
        assert_eq!(state_of(&target, TileKey(1)), TileContentState::Loaded);
        assert_eq!(state_of(&target, TileKey(2)), TileContentState::Loaded);

        // Look away so nothing is selected; the pressure pass trims to
        // the cap. Both were last selected the same earlier frame, so
        // the tie breaks on ascending key.
        target.update_view(&backward_view());
        assert_eq!(state_of(&target, TileKey(1)), TileContentState::Unloaded);
        assert_eq!(state_of(&target, TileKey(2)), TileContentState::Loaded);
    }
}

//! Screen-space-error driven tile selection.
//!
//! [`TilesetEngine`] is the entry point: feed it a [`ViewState`] once
//! per frame and it returns the set of tiles to render, while driving
//! content loads, cancellation, and eviction in the background.

mod engine;
mod options;
mod priority;
mod result;
mod view;

pub use engine::TilesetEngine;
pub use options::EngineOptions;
pub use priority::LoadPriority;
pub use result::{FrameStats, SelectionResult};
pub use view::ViewState;

//! The content-loader abstraction: raw tile payloads in, structured
//! scene graphs out.
//!
//! Loaders are polymorphic over content format; the [`LoaderRegistry`]
//! picks one by inspecting the payload's leading signature bytes. The
//! error contract matters here: a malformed payload produces a
//! *completed* [`LoadResult`] with `model: None` plus diagnostics,
//! while a transport failure (including an unresolvable nested
//! resource) produces a failed future. The traversal layer maps the
//! latter to tile state `Failed` and keeps going.

mod b3dm;
mod gltf;
mod registry;

pub use b3dm::B3dmLoader;
pub use gltf::GltfLoader;
pub use registry::LoaderRegistry;

use bytes::Bytes;
use futures::future::BoxFuture;
use glam::DMat4;
use thiserror::Error;

use crate::asset::{AssetError, AssetFetcher};
use crate::geometry::{BoundingRegion, Projection, UpAxis};
use crate::gltf::{Model, OverlayDetails};

/// Errors that fail a load outright.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Fetching the payload itself failed.
    #[error(transparent)]
    Fetch(#[from] AssetError),

    /// A referenced external buffer or image could not be resolved.
    #[error("failed to resolve external resource {uri}: {source}")]
    ExternalResource { uri: String, source: AssetError },
}

/// Format-specific knobs for a load.
#[derive(Debug, Clone)]
pub struct ContentOptions {
    /// Up-axis convention the content was authored in, declared at the
    /// tileset level.
    pub up_axis: UpAxis,
    /// Whether to derive a tight bounding region from the vertex data.
    pub generate_bounding_region: bool,
    /// Projections to generate overlay texture coordinates for, one
    /// channel each starting at [`overlay_first_channel`].
    ///
    /// [`overlay_first_channel`]: ContentOptions::overlay_first_channel
    pub overlay_projections: Vec<Projection>,
    pub overlay_first_channel: u32,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            up_axis: UpAxis::Y,
            generate_bounding_region: true,
            overlay_projections: Vec::new(),
            overlay_first_channel: 0,
        }
    }
}

/// One load request. Consumed by value; nothing here outlives the call.
#[derive(Debug, Clone)]
pub struct LoadInput {
    /// Source identifier, also the fetch URL when `bytes` is absent
    /// and the base for resolving relative external resources.
    pub url: String,
    /// Request headers for the payload and any nested fetches.
    pub headers: Vec<(String, String)>,
    /// The payload, when already fetched.
    pub bytes: Option<Bytes>,
    /// The tile's composed tile-to-global transform.
    pub transform: DMat4,
    pub options: ContentOptions,
}

impl LoadInput {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            bytes: None,
            transform: DMat4::IDENTITY,
            options: ContentOptions::default(),
        }
    }
}

/// The outcome of a completed (not failed) load.
#[derive(Debug, Clone, Default)]
pub struct LoadResult {
    /// The decoded scene graph; `None` for malformed payloads.
    pub model: Option<Model>,
    /// Parse errors and warnings, human-readable.
    pub diagnostics: Vec<String>,
    /// The model-to-global transform after origin-translation and
    /// up-axis normalization.
    pub transform: DMat4,
    /// Bounding region derived from the vertex data, when requested.
    pub computed_region: Option<BoundingRegion>,
    /// Overlay texture-coordinate details, when projections were given.
    pub overlay: Option<OverlayDetails>,
}

impl LoadResult {
    /// A completed-but-empty result carrying only diagnostics.
    pub fn malformed(diagnostics: Vec<String>, transform: DMat4) -> Self {
        Self {
            model: None,
            diagnostics,
            transform,
            computed_region: None,
            overlay: None,
        }
    }
}

/// Shared services a loader may call back into, chiefly the asset
/// fetcher for nested external resources.
#[derive(Clone, Copy)]
pub struct LoadContext<'a> {
    pub fetcher: &'a dyn AssetFetcher,
}

/// Capability to turn raw payload bytes plus context into a scene graph.
pub trait ContentLoader: Send + Sync {
    fn load<'a>(
        &'a self,
        ctx: LoadContext<'a>,
        input: LoadInput,
    ) -> BoxFuture<'a, Result<LoadResult, LoadError>>;
}

/// Resolves a possibly-relative URI against a base URL.
///
/// Absolute URIs (scheme or leading slash) pass through; relative ones
/// replace everything after the base's final `/`.
pub(crate) fn resolve_relative(base: &str, uri: &str) -> String {
    if uri.contains("://") || uri.starts_with('/') {
        return uri.to_string();
    }
    match base.rfind('/') {
        Some(at) => format!("{}/{}", &base[..at], uri),
        None => uri.to_string(),
    }
}

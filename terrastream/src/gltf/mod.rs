//! Decoded scene-graph model, the glTF transcoder, and the content
//! math that runs on loaded models.
//!
//! The transcoder ([`reader`]) is deliberately narrow: it decodes the
//! structure the engine needs (node hierarchy, mesh positions, buffer
//! and image references) and reports anything else as a warning. The
//! contract for malformed payloads is load-bearing: a bad payload
//! yields a result with `model: None` plus diagnostics, never an
//! error, so one corrupt tile cannot abort a frame.

mod model;
mod overlay;
pub mod reader;
mod transform;

pub use model::{Buffer, Image, Mesh, Model, Node, OverlayUvSet, Primitive};
pub use overlay::{generate_overlay_texture_coordinates, OverlayDetails, OVERLAY_ATTRIBUTE_PREFIX};
pub use reader::{GltfDocument, GltfReadResult};
pub use transform::{apply_rtc_center, apply_up_axis_transform, compute_bounding_region};

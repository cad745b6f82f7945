//! Transform normalization and bounding-region derivation for loaded
//! models.

use glam::DMat4;

use super::model::Model;
use crate::geometry::{BoundingRegion, BoundingRegionBuilder, Ellipsoid};

/// Composes the model's local-origin offset into a root transform.
///
/// Models far from the global origin declare an "RTC center" so their
/// vertex data stays near zero for float precision. A model without an
/// offset (or with a zero offset) leaves the transform unchanged.
pub fn apply_rtc_center(model: &Model, root_transform: &DMat4) -> DMat4 {
    match model.rtc_center {
        Some(center) if center.length_squared() > 0.0 => {
            *root_transform * DMat4::from_translation(center)
        }
        _ => *root_transform,
    }
}

/// Composes the model's declared up-axis correction into a root
/// transform. A Z-up model needs no correction.
pub fn apply_up_axis_transform(model: &Model, root_transform: &DMat4) -> DMat4 {
    *root_transform * model.up_axis.to_z_up()
}

/// Scans every vertex position reachable from the default scene,
/// projects it through `transform` into the geodetic frame, and
/// returns the tightest bounding region.
///
/// `transform` is the fully composed model-to-global matrix; callers
/// normally build it with [`apply_rtc_center`] and
/// [`apply_up_axis_transform`] first. For vertex data straddling the
/// ±180° meridian the returned region has `east < west`.
///
/// Returns `None` when the model has no positional data.
pub fn compute_bounding_region(model: &Model, transform: &DMat4) -> Option<BoundingRegion> {
    let builder = BoundingRegionBuilder::new();
    scan_positions(model, transform, builder)
}

/// [`compute_bounding_region`] with an explicit pole tolerance (in
/// radians of latitude) for the longitude scan. Callers that know the
/// latitude extent of the data scale the tolerance with it so
/// pole-adjacent vertices cannot blow the longitude span up.
pub fn compute_bounding_region_with_tolerance(
    model: &Model,
    transform: &DMat4,
    pole_tolerance: f64,
) -> Option<BoundingRegion> {
    let mut builder = BoundingRegionBuilder::new();
    builder.set_pole_tolerance(pole_tolerance);
    scan_positions(model, transform, builder)
}

fn scan_positions(
    model: &Model,
    transform: &DMat4,
    mut builder: BoundingRegionBuilder,
) -> Option<BoundingRegion> {
    model.for_each_primitive(|primitive, node_transform| {
        let full = *transform * *node_transform;
        for &position in &primitive.positions {
            let global = full.transform_point3(position);
            if let Some(cartographic) = Ellipsoid::WGS84.cartesian_to_cartographic(global) {
                builder.expand_to_include(&cartographic);
            }
        }
    });
    builder.to_region()
}

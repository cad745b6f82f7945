//! Raster-overlay texture-coordinate generation.
//!
//! Drapes externally projected imagery over loaded geometry by giving
//! every vertex a `(u, v)` coordinate inside a target rectangle, one
//! new attribute channel per projection.

use std::f64::consts::PI;

use glam::{DMat4, DVec2};
use tracing::debug;

use super::model::{Model, OverlayUvSet};
use super::transform::{compute_bounding_region, compute_bounding_region_with_tolerance};
use crate::geometry::{BoundingRegion, Ellipsoid, GlobeRectangle, Projection, Rectangle};

/// Prefix of generated attribute channels; the full name is
/// `_OVERLAY_{index}`.
pub const OVERLAY_ATTRIBUTE_PREFIX: &str = "_OVERLAY_";

/// What the generator actually used, returned for further processing.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayDetails {
    /// The rectangle UVs were interpolated within, with the height
    /// range observed during the vertex scan.
    pub region: BoundingRegion,
    /// The planar rectangle per projection, in input order.
    pub projected_rectangles: Vec<Rectangle>,
}

/// Generates overlay texture coordinates for every primitive in the
/// model's default scene.
///
/// For each vertex the global-frame position (under `transform`
/// composed with the node transforms) is projected by each entry of
/// `projections` and linearly interpolated within `rectangle`:
/// `(0,0)` at the minimum corner, `(1,1)` at the maximum, clamped so
/// the output never leaves the unit square. Projection `i` lands in a
/// new attribute channel `_OVERLAY_{first_channel + i}`.
///
/// When `rectangle` is absent it is computed from the model via
/// [`compute_bounding_region`]. Primitives that already carry the
/// first target channel are left untouched, so a mesh instanced by
/// several nodes is only processed once.
///
/// Returns `None` when the model has no positional data.
pub fn generate_overlay_texture_coordinates(
    model: &mut Model,
    transform: &DMat4,
    first_channel: u32,
    rectangle: Option<GlobeRectangle>,
    projections: &[Projection],
) -> Option<OverlayDetails> {
    let rectangle = match rectangle {
        Some(rectangle) => rectangle,
        None => {
            // Two passes: a coarse scan establishes the latitude
            // extent, then the longitude scan reruns with a pole
            // tolerance scaled to it, so a vertex sitting almost on a
            // pole cannot widen the span to the full globe.
            let coarse = compute_bounding_region(model, transform)?;
            let tolerance = 0.001 * coarse.rectangle.height();
            compute_bounding_region_with_tolerance(model, transform, tolerance)?.rectangle
        }
    };

    let projected_rectangles: Vec<Rectangle> = projections
        .iter()
        .map(|p| p.project_rectangle(&rectangle))
        .collect();

    let first_attribute = format!("{}{}", OVERLAY_ATTRIBUTE_PREFIX, first_channel);
    let instances = model.mesh_instances();

    let mut minimum_height = f64::MAX;
    let mut maximum_height = f64::MIN;
    let mut vertices_seen = 0usize;

    for (mesh_index, node_transform) in instances {
        let full = *transform * node_transform;
        for primitive in &mut model.meshes[mesh_index].primitives {
            if primitive.positions.is_empty() || primitive.attributes.contains(&first_attribute) {
                continue;
            }

            let mut uv_sets: Vec<Vec<DVec2>> = projections
                .iter()
                .map(|_| Vec::with_capacity(primitive.positions.len()))
                .collect();

            for &position in &primitive.positions {
                let global = full.transform_point3(position);
                let Some(cartographic) = Ellipsoid::WGS84.cartesian_to_cartographic(global)
                else {
                    for uvs in &mut uv_sets {
                        uvs.push(DVec2::ZERO);
                    }
                    continue;
                };
                vertices_seen += 1;
                minimum_height = minimum_height.min(cartographic.height);
                maximum_height = maximum_height.max(cartographic.height);

                for (projection, (uvs, projected_rectangle)) in projections
                    .iter()
                    .zip(uv_sets.iter_mut().zip(&projected_rectangles))
                {
                    let projected = project_near_rectangle(
                        projection,
                        &cartographic,
                        &rectangle,
                        projected_rectangle,
                    );
                    uvs.push(interpolate_clamped(projected, projected_rectangle));
                }
            }

            for (i, uvs) in uv_sets.into_iter().enumerate() {
                let attribute =
                    format!("{}{}", OVERLAY_ATTRIBUTE_PREFIX, first_channel + i as u32);
                primitive.attributes.insert(attribute.clone());
                primitive.overlay_uvs.push(OverlayUvSet { attribute, uv: uvs });
            }
        }
    }

    if vertices_seen == 0 {
        return None;
    }

    debug!(
        vertices = vertices_seen,
        channels = projections.len(),
        "generated overlay texture coordinates"
    );

    Some(OverlayDetails {
        region: BoundingRegion::new(rectangle, minimum_height, maximum_height),
        projected_rectangles,
    })
}

/// Projects a position, disambiguating the longitude convention for
/// rectangles that cross the antimeridian: both the wrapped and
/// unwrapped longitudes are tried and the projection closer to the
/// target rectangle wins.
fn project_near_rectangle(
    projection: &Projection,
    cartographic: &crate::geometry::Cartographic,
    rectangle: &GlobeRectangle,
    projected_rectangle: &Rectangle,
) -> DVec2 {
    let plain = projection.project_position(cartographic);
    if !rectangle.crosses_antimeridian() {
        return plain;
    }

    let shifted_longitude = if cartographic.longitude < 0.0 {
        cartographic.longitude + 2.0 * PI
    } else {
        cartographic.longitude - 2.0 * PI
    };
    let shifted = projection.project_position(&crate::geometry::Cartographic::new(
        shifted_longitude,
        cartographic.latitude,
        cartographic.height,
    ));

    if projected_rectangle.distance_to(shifted.x, shifted.y)
        < projected_rectangle.distance_to(plain.x, plain.y)
    {
        shifted
    } else {
        plain
    }
}

/// Interpolates a projected position within the rectangle, clamped to
/// the unit square. Degenerate rectangles map everything to zero.
fn interpolate_clamped(projected: DVec2, rectangle: &Rectangle) -> DVec2 {
    let u = if rectangle.width() > 0.0 {
        ((projected.x - rectangle.minimum_x) / rectangle.width()).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let v = if rectangle.height() > 0.0 {
        ((projected.y - rectangle.minimum_y) / rectangle.height()).clamp(0.0, 1.0)
    } else {
        0.0
    };
    DVec2::new(u, v)
}

//! Geometry primitives for tile selection and content math.
//!
//! Provides the bounding volumes, geodetic conversions, and transform
//! helpers that the traversal engine and content loaders depend on:
//!
//! - [`Cartographic`] / [`Ellipsoid`] - WGS84 geodetic conversions
//! - [`GlobeRectangle`] - antimeridian-aware longitude/latitude extent
//! - [`BoundingRegion`] / [`BoundingRegionBuilder`] - geodetic bounds
//!   accumulated from vertex positions
//! - [`BoundingVolume`] - the tagged box/sphere/region variant carried
//!   by every tile
//! - [`UpAxis`] - glTF up-axis correction matrices
//! - [`Projection`] - the projections raster overlays are draped with
//!
//! Everything here is pure math with no I/O.

mod axis;
mod cartographic;
mod projection;
mod rectangle;
mod region;
mod volume;

pub use axis::UpAxis;
pub use cartographic::{Cartographic, Ellipsoid};
pub use projection::Projection;
pub use rectangle::{GlobeRectangle, Rectangle};
pub use region::{BoundingRegion, BoundingRegionBuilder};
pub use volume::{BoundingSphere, BoundingVolume, OrientedBox};

/// Wraps a longitude into the `[-PI, PI]` range.
pub(crate) fn negative_pi_to_pi(angle: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    if (-PI..=PI).contains(&angle) {
        return angle;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    // rem_euclid maps exact PI multiples onto -PI
    if wrapped == -PI && angle > 0.0 {
        PI
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_negative_pi_to_pi_in_range() {
        assert_eq!(negative_pi_to_pi(0.0), 0.0);
        assert_eq!(negative_pi_to_pi(1.0), 1.0);
        assert_eq!(negative_pi_to_pi(-PI), -PI);
        assert_eq!(negative_pi_to_pi(PI), PI);
    }

    #[test]
    fn test_negative_pi_to_pi_wraps() {
        assert!((negative_pi_to_pi(PI + 0.1) - (-PI + 0.1)).abs() < 1e-12);
        assert!((negative_pi_to_pi(-PI - 0.1) - (PI - 0.1)).abs() < 1e-12);
        assert!((negative_pi_to_pi(3.0 * PI) - PI).abs() < 1e-12);
    }
}

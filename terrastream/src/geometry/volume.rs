//! Bounding volume variants carried by tiles.

use glam::{DMat4, DVec3};

use super::{BoundingRegion, Cartographic, Ellipsoid};

/// A sphere in earth-centered coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: DVec3,
    pub radius: f64,
}

impl BoundingSphere {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }
}

/// An oriented bounding box: a center plus three half-axis vectors.
///
/// The half-axes are the columns of the orientation-and-scale part of
/// the box, so each axis vector runs from the center to a face center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    pub center: DVec3,
    pub half_axes: [DVec3; 3],
}

impl OrientedBox {
    pub fn new(center: DVec3, half_axes: [DVec3; 3]) -> Self {
        Self { center, half_axes }
    }

    /// Radius of the tightest sphere centered at the box center that
    /// contains the box: the farthest of the eight corners. When the
    /// half-axes are skewed (non-orthogonal), a corner other than
    /// `+h0 + h1 + h2` can be the farthest, so every sign combination
    /// is checked.
    pub fn bounding_radius(&self) -> f64 {
        let [h0, h1, h2] = self.half_axes;
        let mut radius: f64 = 0.0;
        for s1 in [-1.0, 1.0] {
            for s2 in [-1.0, 1.0] {
                // Negating all three signs mirrors a corner through the
                // center, so fixing h0's sign covers all eight.
                radius = radius.max((h0 + s1 * h1 + s2 * h2).length());
            }
        }
        radius
    }
}

/// The tagged bounding-volume variant every tile carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundingVolume {
    Box(OrientedBox),
    Sphere(BoundingSphere),
    Region(BoundingRegion),
}

impl BoundingVolume {
    /// Center of the volume in earth-centered coordinates.
    pub fn center(&self) -> DVec3 {
        match self {
            BoundingVolume::Box(b) => b.center,
            BoundingVolume::Sphere(s) => s.center,
            BoundingVolume::Region(r) => {
                let c = r.rectangle.center();
                let mid = Cartographic::new(
                    c.longitude,
                    c.latitude,
                    (r.minimum_height + r.maximum_height) / 2.0,
                );
                Ellipsoid::WGS84.cartographic_to_cartesian(&mid)
            }
        }
    }

    /// Radius of a sphere centered at [`center`] that contains the
    /// whole volume. Used as a conservative proxy for culling and
    /// distance estimates.
    ///
    /// [`center`]: BoundingVolume::center
    pub fn bounding_radius(&self) -> f64 {
        match self {
            BoundingVolume::Box(b) => b.bounding_radius(),
            BoundingVolume::Sphere(s) => s.radius,
            BoundingVolume::Region(r) => {
                let center = self.center();
                region_corners(r)
                    .iter()
                    .map(|corner| (*corner - center).length())
                    .fold(0.0, f64::max)
            }
        }
    }

    /// Applies an affine transform to the volume.
    ///
    /// Regions are geodetic and therefore unaffected by model
    /// transforms; boxes and spheres transform in cartesian space.
    /// Sphere radii scale by the largest axis scale so the result
    /// stays conservative under non-uniform scaling.
    pub fn transform(&self, matrix: &DMat4) -> BoundingVolume {
        match self {
            BoundingVolume::Box(b) => {
                let center = matrix.transform_point3(b.center);
                let half_axes = [
                    matrix.transform_vector3(b.half_axes[0]),
                    matrix.transform_vector3(b.half_axes[1]),
                    matrix.transform_vector3(b.half_axes[2]),
                ];
                BoundingVolume::Box(OrientedBox::new(center, half_axes))
            }
            BoundingVolume::Sphere(s) => {
                let center = matrix.transform_point3(s.center);
                let scale = matrix
                    .transform_vector3(DVec3::X)
                    .length()
                    .max(matrix.transform_vector3(DVec3::Y).length())
                    .max(matrix.transform_vector3(DVec3::Z).length());
                BoundingVolume::Sphere(BoundingSphere::new(center, s.radius * scale))
            }
            BoundingVolume::Region(r) => BoundingVolume::Region(*r),
        }
    }

    /// Distance from a point to the surface of the bounding sphere
    /// proxy, clamped at zero when the point is inside.
    pub fn distance_to(&self, position: DVec3) -> f64 {
        ((position - self.center()).length() - self.bounding_radius()).max(0.0)
    }
}

/// The eight corners of a region, in earth-centered coordinates.
fn region_corners(region: &BoundingRegion) -> [DVec3; 8] {
    let r = &region.rectangle;
    // For antimeridian-crossing regions the raw east/west ordering does
    // not matter here; each corner is still a valid surface position.
    let lons = [r.west, r.east];
    let lats = [r.south, r.north];
    let heights = [region.minimum_height, region.maximum_height];

    let mut corners = [DVec3::ZERO; 8];
    let mut i = 0;
    for lon in lons {
        for lat in lats {
            for height in heights {
                corners[i] = Ellipsoid::WGS84
                    .cartographic_to_cartesian(&Cartographic::new(lon, lat, height));
                i += 1;
            }
        }
    }
    corners
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GlobeRectangle;

    #[test]
    fn test_box_bounding_radius() {
        let b = OrientedBox::new(
            DVec3::ZERO,
            [DVec3::X * 3.0, DVec3::Y * 4.0, DVec3::Z * 0.0],
        );
        assert!((b.bounding_radius() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_skewed_box_bounding_radius_contains_every_corner() {
        // Non-orthogonal half-axes: the farthest corner is h0 - h1,
        // not the plain sum (which has length 1 here).
        let b = OrientedBox::new(
            DVec3::ZERO,
            [DVec3::X, DVec3::new(-1.0, 1.0, 0.0), DVec3::ZERO],
        );
        let radius = b.bounding_radius();
        assert!((radius - 5.0f64.sqrt()).abs() < 1e-12, "radius {}", radius);
        let [h0, h1, h2] = b.half_axes;
        for s0 in [-1.0, 1.0] {
            for s1 in [-1.0, 1.0] {
                for s2 in [-1.0, 1.0] {
                    let corner = s0 * h0 + s1 * h1 + s2 * h2;
                    assert!(
                        corner.length() <= radius + 1e-12,
                        "corner outside bounding radius"
                    );
                }
            }
        }
    }

    #[test]
    fn test_sphere_transform_scales_radius_conservatively() {
        let v = BoundingVolume::Sphere(BoundingSphere::new(DVec3::ZERO, 2.0));
        let m = DMat4::from_scale(DVec3::new(1.0, 3.0, 1.0));
        match v.transform(&m) {
            BoundingVolume::Sphere(s) => {
                assert!((s.radius - 6.0).abs() < 1e-12, "radius should scale by max axis");
            }
            other => panic!("expected sphere, got {:?}", other),
        }
    }

    #[test]
    fn test_box_transform_moves_center() {
        let v = BoundingVolume::Box(OrientedBox::new(DVec3::ZERO, [DVec3::X, DVec3::Y, DVec3::Z]));
        let m = DMat4::from_translation(DVec3::new(10.0, 0.0, 0.0));
        assert_eq!(v.transform(&m).center(), DVec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_region_center_is_on_surface_between_heights() {
        let region = BoundingRegion::new(
            GlobeRectangle::from_degrees(-1.0, -1.0, 1.0, 1.0),
            0.0,
            2000.0,
        );
        let v = BoundingVolume::Region(region);
        let center = v.center();
        let back = Ellipsoid::WGS84.cartesian_to_cartographic(center).unwrap();
        assert!(back.longitude.abs() < 1e-9);
        assert!(back.latitude.abs() < 1e-9);
        assert!((back.height - 1000.0).abs() < 1e-3);
    }

    #[test]
    fn test_region_bounding_radius_contains_corners() {
        let region = BoundingRegion::new(
            GlobeRectangle::from_degrees(10.0, 40.0, 12.0, 42.0),
            -50.0,
            3000.0,
        );
        let v = BoundingVolume::Region(region);
        let center = v.center();
        let radius = v.bounding_radius();
        for corner in super::region_corners(&region) {
            assert!(
                (corner - center).length() <= radius + 1e-6,
                "corner outside bounding radius"
            );
        }
    }

    #[test]
    fn test_distance_to_is_zero_inside() {
        let v = BoundingVolume::Sphere(BoundingSphere::new(DVec3::ZERO, 10.0));
        assert_eq!(v.distance_to(DVec3::new(1.0, 2.0, 3.0)), 0.0);
        assert!((v.distance_to(DVec3::new(20.0, 0.0, 0.0)) - 10.0).abs() < 1e-12);
    }
}

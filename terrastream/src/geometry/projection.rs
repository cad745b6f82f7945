//! Map projections used to drape raster overlays.

use glam::DVec2;

use super::{Cartographic, Ellipsoid, GlobeRectangle, Rectangle};

/// Web Mercator is undefined at the poles; latitudes are clamped to
/// the conventional square-map limit.
const WEB_MERCATOR_MAX_LATITUDE: f64 = 1.4844222297453324; // 85.05112878 degrees

/// The projections overlay imagery may be delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Plate carrée: x = longitude * a, y = latitude * a.
    Geographic,
    /// Spherical web mercator on the WGS84 semi-major axis.
    WebMercator,
}

impl Projection {
    /// Projects a geodetic position into the projection's planar frame.
    pub fn project_position(&self, position: &Cartographic) -> DVec2 {
        let a = Ellipsoid::WGS84.semi_major;
        match self {
            Projection::Geographic => DVec2::new(position.longitude * a, position.latitude * a),
            Projection::WebMercator => {
                let lat = position
                    .latitude
                    .clamp(-WEB_MERCATOR_MAX_LATITUDE, WEB_MERCATOR_MAX_LATITUDE);
                DVec2::new(position.longitude * a, lat.tan().asinh() * a)
            }
        }
    }

    /// Projects a globe rectangle into a planar rectangle.
    ///
    /// For an antimeridian-crossing rectangle the east edge is unwrapped
    /// past +180° so the planar rectangle stays contiguous; callers
    /// projecting individual vertices near the seam must pick the
    /// longitude convention closest to this rectangle (see the overlay
    /// generator).
    pub fn project_rectangle(&self, rectangle: &GlobeRectangle) -> Rectangle {
        let east = if rectangle.crosses_antimeridian() {
            rectangle.east + 2.0 * std::f64::consts::PI
        } else {
            rectangle.east
        };
        let min = self.project_position(&Cartographic::new(rectangle.west, rectangle.south, 0.0));
        let max = self.project_position(&Cartographic::new(east, rectangle.north, 0.0));
        Rectangle::new(min.x, min.y, max.x, max.y)
    }

    /// Inverse of [`project_position`], height always zero.
    ///
    /// [`project_position`]: Projection::project_position
    pub fn unproject(&self, projected: DVec2) -> Cartographic {
        let a = Ellipsoid::WGS84.semi_major;
        match self {
            Projection::Geographic => Cartographic::new(projected.x / a, projected.y / a, 0.0),
            Projection::WebMercator => {
                Cartographic::new(projected.x / a, (projected.y / a).sinh().atan(), 0.0)
            }
        }
    }
}

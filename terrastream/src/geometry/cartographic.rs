//! Geodetic coordinates and the WGS84 ellipsoid.

use glam::DVec3;

/// A geodetic position: longitude/latitude in radians, height in meters
/// above the ellipsoid surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cartographic {
    /// Longitude in radians, in `[-PI, PI]`.
    pub longitude: f64,
    /// Latitude in radians, in `[-PI/2, PI/2]`.
    pub latitude: f64,
    /// Height in meters above the ellipsoid.
    pub height: f64,
}

impl Cartographic {
    /// Creates a cartographic position from radians.
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            longitude,
            latitude,
            height,
        }
    }

    /// Creates a cartographic position from degrees.
    pub fn from_degrees(longitude_deg: f64, latitude_deg: f64, height: f64) -> Self {
        Self {
            longitude: longitude_deg.to_radians(),
            latitude: latitude_deg.to_radians(),
            height,
        }
    }
}

/// An ellipsoid of revolution centered at the origin.
///
/// The only instance the engine uses is [`Ellipsoid::WGS84`], but the
/// radii are kept as data so tests can use a unit sphere.
#[derive(Debug, Clone, Copy)]
pub struct Ellipsoid {
    /// Semi-major (equatorial) radius in meters.
    pub semi_major: f64,
    /// Semi-minor (polar) radius in meters.
    pub semi_minor: f64,
}

impl Ellipsoid {
    /// The WGS84 ellipsoid.
    pub const WGS84: Ellipsoid = Ellipsoid {
        semi_major: 6378137.0,
        semi_minor: 6356752.314245179,
    };

    /// First eccentricity squared.
    fn e_sq(&self) -> f64 {
        let a = self.semi_major;
        let b = self.semi_minor;
        (a * a - b * b) / (a * a)
    }

    /// Second eccentricity squared.
    fn e_prime_sq(&self) -> f64 {
        let a = self.semi_major;
        let b = self.semi_minor;
        (a * a - b * b) / (b * b)
    }

    /// Converts a geodetic position to earth-centered cartesian coordinates.
    pub fn cartographic_to_cartesian(&self, c: &Cartographic) -> DVec3 {
        let sin_lat = c.latitude.sin();
        let cos_lat = c.latitude.cos();
        let n = self.semi_major / (1.0 - self.e_sq() * sin_lat * sin_lat).sqrt();

        DVec3::new(
            (n + c.height) * cos_lat * c.longitude.cos(),
            (n + c.height) * cos_lat * c.longitude.sin(),
            (n * (1.0 - self.e_sq()) + c.height) * sin_lat,
        )
    }

    /// Converts an earth-centered cartesian position to geodetic
    /// coordinates using Bowring's method.
    ///
    /// Returns `None` for positions too close to the ellipsoid center,
    /// where longitude and latitude are undefined.
    pub fn cartesian_to_cartographic(&self, position: DVec3) -> Option<Cartographic> {
        let p = (position.x * position.x + position.y * position.y).sqrt();
        if p < 1e-9 && position.z.abs() < 1e-9 {
            return None;
        }

        let a = self.semi_major;
        let b = self.semi_minor;
        let e_sq = self.e_sq();
        let ep_sq = self.e_prime_sq();

        let longitude = position.y.atan2(position.x);

        let u = (position.z * a).atan2(p * b);
        let sin_u = u.sin();
        let cos_u = u.cos();
        let latitude = (position.z + ep_sq * b * sin_u * sin_u * sin_u)
            .atan2(p - e_sq * a * cos_u * cos_u * cos_u);

        let sin_lat = latitude.sin();
        let cos_lat = latitude.cos();
        let n = a / (1.0 - e_sq * sin_lat * sin_lat).sqrt();

        // p / cos(lat) degenerates at the poles; fall back to the polar form.
        let height = if cos_lat.abs() > 1e-10 {
            p / cos_lat - n
        } else {
            position.z / sin_lat - n * (1.0 - e_sq)
        };

        Some(Cartographic::new(longitude, latitude, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_equator_prime_meridian_on_surface() {
        let c = Cartographic::new(0.0, 0.0, 0.0);
        let p = Ellipsoid::WGS84.cartographic_to_cartesian(&c);
        assert!((p.x - 6378137.0).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
        assert!(p.z.abs() < 1e-6);
    }

    #[test]
    fn test_north_pole_on_surface() {
        let c = Cartographic::new(0.0, FRAC_PI_2, 0.0);
        let p = Ellipsoid::WGS84.cartographic_to_cartesian(&c);
        assert!(p.x.abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
        assert!((p.z - 6356752.314245179).abs() < 1e-6);
    }

    #[test]
    fn test_center_is_undefined() {
        assert!(Ellipsoid::WGS84
            .cartesian_to_cartographic(DVec3::ZERO)
            .is_none());
    }

    #[test]
    fn test_roundtrip_at_known_location() {
        // Philadelphia, 100m up
        let c = Cartographic::from_degrees(-75.1652, 39.9526, 100.0);
        let p = Ellipsoid::WGS84.cartographic_to_cartesian(&c);
        let back = Ellipsoid::WGS84.cartesian_to_cartographic(p).unwrap();

        assert!((back.longitude - c.longitude).abs() < 1e-10);
        assert!((back.latitude - c.latitude).abs() < 1e-10);
        assert!((back.height - c.height).abs() < 1e-4);
    }

    proptest! {
        #[test]
        fn test_roundtrip_property(
            lon_deg in -179.9..179.9_f64,
            lat_deg in -89.9..89.9_f64,
            height in -5000.0..50000.0_f64,
        ) {
            let c = Cartographic::from_degrees(lon_deg, lat_deg, height);
            let p = Ellipsoid::WGS84.cartographic_to_cartesian(&c);
            let back = Ellipsoid::WGS84.cartesian_to_cartographic(p).unwrap();

            prop_assert!((back.longitude - c.longitude).abs() < 1e-9,
                "longitude roundtrip failed: {} -> {}", c.longitude, back.longitude);
            prop_assert!((back.latitude - c.latitude).abs() < 1e-9,
                "latitude roundtrip failed: {} -> {}", c.latitude, back.latitude);
            prop_assert!((back.height - c.height).abs() < 1e-3,
                "height roundtrip failed: {} -> {}", c.height, back.height);
        }

        #[test]
        fn test_surface_points_are_on_ellipsoid(
            lon_deg in -180.0..180.0_f64,
            lat_deg in -90.0..90.0_f64,
        ) {
            let c = Cartographic::from_degrees(lon_deg, lat_deg, 0.0);
            let p = Ellipsoid::WGS84.cartographic_to_cartesian(&c);

            let a = Ellipsoid::WGS84.semi_major;
            let b = Ellipsoid::WGS84.semi_minor;
            let implicit = (p.x / a).powi(2) + (p.y / a).powi(2) + (p.z / b).powi(2);
            prop_assert!((implicit - 1.0).abs() < 1e-10,
                "surface point not on ellipsoid: {}", implicit);
        }
    }
}

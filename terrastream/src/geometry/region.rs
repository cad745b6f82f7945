//! Geodetic bounding regions and the incremental builder that computes
//! them from vertex scans.

use std::f64::consts::{FRAC_PI_2, PI};

use super::{negative_pi_to_pi, Cartographic, GlobeRectangle};

/// A geodetic bounding box: a [`GlobeRectangle`] plus a height range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingRegion {
    pub rectangle: GlobeRectangle,
    pub minimum_height: f64,
    pub maximum_height: f64,
}

impl BoundingRegion {
    pub fn new(rectangle: GlobeRectangle, minimum_height: f64, maximum_height: f64) -> Self {
        Self {
            rectangle,
            minimum_height,
            maximum_height,
        }
    }
}

/// Accumulates geodetic positions into the tightest [`BoundingRegion`].
///
/// Longitudes are tracked in two conventions at once: the usual
/// `[-PI, PI]` range and a wrapped `[0, 2*PI)` range. After all
/// positions are added, whichever convention produced the narrower
/// span wins. When the wrapped convention wins, the resulting
/// rectangle has `east < west`, which is the caller-understood signal
/// that the region crosses the antimeridian.
#[derive(Debug, Clone)]
pub struct BoundingRegionBuilder {
    west: f64,
    south: f64,
    east: f64,
    north: f64,
    // Same span tracked with longitudes wrapped to [0, 2*PI).
    wrapped_west: f64,
    wrapped_east: f64,
    minimum_height: f64,
    maximum_height: f64,
    pole_tolerance: f64,
    empty: bool,
}

impl Default for BoundingRegionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundingRegionBuilder {
    pub fn new() -> Self {
        Self {
            west: f64::MAX,
            south: f64::MAX,
            east: f64::MIN,
            north: f64::MIN,
            wrapped_west: f64::MAX,
            wrapped_east: f64::MIN,
            minimum_height: f64::MAX,
            maximum_height: f64::MIN,
            pole_tolerance: 1e-6,
            empty: true,
        }
    }

    /// Sets how close to a pole (in radians of latitude) a position must
    /// be before its longitude is ignored. At the poles longitude is
    /// numerically meaningless and would otherwise blow the span up to
    /// the full globe.
    pub fn set_pole_tolerance(&mut self, tolerance: f64) {
        self.pole_tolerance = tolerance;
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Expands the region to include the given position.
    pub fn expand_to_include(&mut self, position: &Cartographic) {
        self.empty = false;

        self.south = self.south.min(position.latitude);
        self.north = self.north.max(position.latitude);
        self.minimum_height = self.minimum_height.min(position.height);
        self.maximum_height = self.maximum_height.max(position.height);

        let near_pole = FRAC_PI_2 - position.latitude.abs() <= self.pole_tolerance;
        if near_pole {
            return;
        }

        let lon = negative_pi_to_pi(position.longitude);
        self.west = self.west.min(lon);
        self.east = self.east.max(lon);

        let wrapped = if lon < 0.0 { lon + 2.0 * PI } else { lon };
        self.wrapped_west = self.wrapped_west.min(wrapped);
        self.wrapped_east = self.wrapped_east.max(wrapped);
    }

    /// Produces the accumulated region.
    ///
    /// Returns `None` when no positions were added. If every added
    /// position was within the pole tolerance the longitude span
    /// degenerates to a point at longitude zero.
    pub fn to_region(&self) -> Option<BoundingRegion> {
        if self.empty {
            return None;
        }

        let (west, east) = if self.west > self.east {
            // Only pole-adjacent positions were seen.
            (0.0, 0.0)
        } else {
            let plain_width = self.east - self.west;
            let wrapped_width = self.wrapped_east - self.wrapped_west;
            if wrapped_width < plain_width {
                (
                    negative_pi_to_pi(self.wrapped_west),
                    negative_pi_to_pi(self.wrapped_east),
                )
            } else {
                (self.west, self.east)
            }
        };

        Some(BoundingRegion::new(
            GlobeRectangle::new(west, self.south, east, self.north),
            self.minimum_height,
            self.maximum_height,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deg(lon: f64, lat: f64, height: f64) -> Cartographic {
        Cartographic::from_degrees(lon, lat, height)
    }

    #[test]
    fn test_empty_builder_yields_none() {
        assert!(BoundingRegionBuilder::new().to_region().is_none());
    }

    #[test]
    fn test_symmetric_positions_produce_antipodal_extremes() {
        let mut builder = BoundingRegionBuilder::new();
        builder.expand_to_include(&deg(-30.0, -20.0, -100.0));
        builder.expand_to_include(&deg(30.0, 20.0, 100.0));

        let region = builder.to_region().unwrap();
        assert!((region.rectangle.west.to_degrees() + 30.0).abs() < 1e-9);
        assert!((region.rectangle.east.to_degrees() - 30.0).abs() < 1e-9);
        assert!((region.rectangle.south.to_degrees() + 20.0).abs() < 1e-9);
        assert!((region.rectangle.north.to_degrees() - 20.0).abs() < 1e-9);
        assert_eq!(region.minimum_height, -100.0);
        assert_eq!(region.maximum_height, 100.0);
        assert!(!region.rectangle.crosses_antimeridian());
    }

    #[test]
    fn test_antimeridian_straddling_positions_yield_east_less_than_west() {
        let mut builder = BoundingRegionBuilder::new();
        builder.expand_to_include(&deg(178.0, 0.0, 0.0));
        builder.expand_to_include(&deg(-179.0, 1.0, 0.0));

        let region = builder.to_region().unwrap();
        assert!(
            region.rectangle.crosses_antimeridian(),
            "narrow span across the antimeridian must be encoded as east < west"
        );
        assert!((region.rectangle.west.to_degrees() - 178.0).abs() < 1e-9);
        assert!((region.rectangle.east.to_degrees() + 179.0).abs() < 1e-9);
        assert!((region.rectangle.width().to_degrees() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_wide_span_not_misread_as_antimeridian_crossing() {
        // Positions at -90 and 90 have a 180-degree span either way;
        // the non-wrapping convention must win ties.
        let mut builder = BoundingRegionBuilder::new();
        builder.expand_to_include(&deg(-90.0, 0.0, 0.0));
        builder.expand_to_include(&deg(90.0, 0.0, 0.0));

        let region = builder.to_region().unwrap();
        assert!(!region.rectangle.crosses_antimeridian());
        assert!((region.rectangle.west.to_degrees() + 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_pole_positions_do_not_widen_longitude_span() {
        let mut builder = BoundingRegionBuilder::new();
        builder.expand_to_include(&deg(10.0, 10.0, 0.0));
        builder.expand_to_include(&deg(11.0, 11.0, 0.0));
        // Longitude at the pole is arbitrary; must not expand the span.
        builder.expand_to_include(&deg(-170.0, 89.9999999, 0.0));

        let region = builder.to_region().unwrap();
        assert!((region.rectangle.west.to_degrees() - 10.0).abs() < 1e-9);
        assert!((region.rectangle.east.to_degrees() - 11.0).abs() < 1e-9);
        assert!((region.rectangle.north.to_degrees() - 89.9999999).abs() < 1e-6);
    }

    #[test]
    fn test_only_pole_positions_degenerate_to_zero_longitude() {
        let mut builder = BoundingRegionBuilder::new();
        builder.expand_to_include(&deg(45.0, 90.0, 0.0));
        let region = builder.to_region().unwrap();
        assert_eq!(region.rectangle.west, 0.0);
        assert_eq!(region.rectangle.east, 0.0);
    }
}

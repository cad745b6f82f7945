//! Longitude/latitude and projected rectangle types.

use std::f64::consts::PI;

use super::{negative_pi_to_pi, Cartographic};

/// A longitude/latitude extent on the globe, in radians.
///
/// The rectangle may cross the antimeridian, in which case `east < west`.
/// All width and containment math accounts for the wrap, so callers
/// should use the methods here rather than comparing the raw fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobeRectangle {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GlobeRectangle {
    /// The whole globe.
    pub const MAXIMUM: GlobeRectangle = GlobeRectangle {
        west: -PI,
        south: -PI / 2.0,
        east: PI,
        north: PI / 2.0,
    };

    /// An empty rectangle, suitable as the identity for [`union`].
    ///
    /// [`union`]: GlobeRectangle::union
    pub const EMPTY: GlobeRectangle = GlobeRectangle {
        west: PI,
        south: PI / 2.0,
        east: -PI,
        north: -PI / 2.0,
    };

    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Builds a rectangle from degree bounds.
    pub fn from_degrees(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self::new(
            west.to_radians(),
            south.to_radians(),
            east.to_radians(),
            north.to_radians(),
        )
    }

    /// Whether this rectangle crosses the ±180° meridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.east < self.west
    }

    /// Longitudinal extent in radians, never negative.
    pub fn width(&self) -> f64 {
        if self.crosses_antimeridian() {
            self.east + 2.0 * PI - self.west
        } else {
            self.east - self.west
        }
    }

    /// Latitudinal extent in radians.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Center of the rectangle, wrap-aware in longitude.
    pub fn center(&self) -> Cartographic {
        let longitude = negative_pi_to_pi(self.west + self.width() / 2.0);
        Cartographic::new(longitude, (self.south + self.north) / 2.0, 0.0)
    }

    /// Whether the position lies inside the rectangle (inclusive).
    pub fn contains(&self, position: &Cartographic) -> bool {
        if position.latitude < self.south || position.latitude > self.north {
            return false;
        }
        let lon = negative_pi_to_pi(position.longitude);
        if self.crosses_antimeridian() {
            lon >= self.west || lon <= self.east
        } else {
            lon >= self.west && lon <= self.east
        }
    }

    /// Smallest rectangle covering both inputs.
    ///
    /// When either side crosses the antimeridian the union is computed
    /// in the unwrapped longitude frame and re-wrapped, so the result
    /// again carries the `east < west` encoding where appropriate.
    pub fn union(&self, other: &GlobeRectangle) -> GlobeRectangle {
        let south = self.south.min(other.south);
        let north = self.north.max(other.north);

        if !self.crosses_antimeridian() && !other.crosses_antimeridian() {
            return GlobeRectangle::new(
                self.west.min(other.west),
                south,
                self.east.max(other.east),
                north,
            );
        }

        // Unwrap both spans onto [west, west + width] and compare there.
        let unwrap = |r: &GlobeRectangle| {
            let east = if r.crosses_antimeridian() {
                r.east + 2.0 * PI
            } else {
                r.east
            };
            (r.west, east)
        };
        let (w1, e1) = unwrap(self);
        let (w2, e2) = unwrap(other);
        let west = w1.min(w2);
        let east = e1.max(e2);
        GlobeRectangle::new(negative_pi_to_pi(west), south, negative_pi_to_pi(east), north)
    }
}

/// An axis-aligned rectangle in a projected (planar) coordinate frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub minimum_x: f64,
    pub minimum_y: f64,
    pub maximum_x: f64,
    pub maximum_y: f64,
}

impl Rectangle {
    pub fn new(minimum_x: f64, minimum_y: f64, maximum_x: f64, maximum_y: f64) -> Self {
        Self {
            minimum_x,
            minimum_y,
            maximum_x,
            maximum_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.maximum_x - self.minimum_x
    }

    pub fn height(&self) -> f64 {
        self.maximum_y - self.minimum_y
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.minimum_x && x <= self.maximum_x && y >= self.minimum_y && y <= self.maximum_y
    }

    /// Distance from a point to the rectangle, zero when inside.
    ///
    /// Used to pick between the two longitude conventions for vertices
    /// near the antimeridian.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        let dx = (self.minimum_x - x).max(0.0).max(x - self.maximum_x);
        let dy = (self.minimum_y - y).max(0.0).max(y - self.maximum_y);
        (dx * dx + dy * dy).sqrt()
    }
}

//! Camera state, frustum culling planes, and the screen-space-error
//! metric.

use glam::DVec3;

use crate::geometry::BoundingVolume;

/// Distance below which screen-space error saturates instead of
/// dividing by (near) zero.
const MINIMUM_DISTANCE: f64 = 1e-7;

/// The view a frame is selected for: camera pose, field of view, and
/// viewport size, with culling planes derived at construction.
#[derive(Debug, Clone)]
pub struct ViewState {
    position: DVec3,
    /// Inward normals of the frustum planes; a sphere entirely behind
    /// any of them is invisible.
    culling_planes: [DVec3; 5],
    fov_y: f64,
    viewport_height: f64,
    /// Precomputed `viewport_height / (2 * tan(fov_y / 2))`.
    sse_factor: f64,
}

impl ViewState {
    /// Builds a view from a camera pose.
    ///
    /// # Arguments
    ///
    /// * `position` - Camera position in global coordinates
    /// * `direction` - Look direction, need not be normalized
    /// * `up` - Approximate up vector, need not be orthogonal
    /// * `viewport_width`, `viewport_height` - In pixels
    /// * `fov_y` - Vertical field of view in radians
    pub fn new(
        position: DVec3,
        direction: DVec3,
        up: DVec3,
        viewport_width: f64,
        viewport_height: f64,
        fov_y: f64,
    ) -> Self {
        let forward = direction.normalize();
        let right = forward.cross(up).normalize();
        let camera_up = right.cross(forward);

        let aspect = viewport_width / viewport_height;
        let half_y = fov_y / 2.0;
        let half_x = (half_y.tan() * aspect).atan();

        let culling_planes = [
            forward,
            forward * half_x.sin() + right * half_x.cos(),
            forward * half_x.sin() - right * half_x.cos(),
            forward * half_y.sin() + camera_up * half_y.cos(),
            forward * half_y.sin() - camera_up * half_y.cos(),
        ];

        Self {
            position,
            culling_planes,
            fov_y,
            viewport_height,
            sse_factor: viewport_height / (2.0 * half_y.tan()),
        }
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn fov_y(&self) -> f64 {
        self.fov_y
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    /// Whether any part of the volume may be inside the frustum,
    /// testing its bounding sphere against each plane. Conservative:
    /// may report visible for volumes slightly outside a corner, never
    /// invisible for a visible one.
    pub fn is_visible(&self, volume: &BoundingVolume) -> bool {
        let center = volume.center() - self.position;
        let radius = volume.bounding_radius();
        self.culling_planes
            .iter()
            .all(|plane| plane.dot(center) >= -radius)
    }

    /// Shortest distance from the camera to the volume, zero inside.
    pub fn distance_to(&self, volume: &BoundingVolume) -> f64 {
        volume.distance_to(self.position)
    }

    /// The screen-space error of a tile with the given geometric error
    /// at the given distance:
    /// `sse = (geometric_error * viewport_height) / (2 * distance * tan(fov_y / 2))`.
    pub fn screen_space_error(&self, geometric_error: f64, distance: f64) -> f64 {
        if geometric_error <= 0.0 {
            return 0.0;
        }
        geometric_error * self.sse_factor / distance.max(MINIMUM_DISTANCE)
    }
}

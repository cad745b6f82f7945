//! Up-axis conventions and the correction matrices between them.

use glam::{DMat4, DVec4};

/// Which axis a scene graph declares as "up".
///
/// The engine's target convention is Z-up. glTF itself is Y-up, so
/// `Y` is the default when a model declares nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpAxis {
    X,
    Y,
    Z,
}

impl Default for UpAxis {
    fn default() -> Self {
        UpAxis::Y
    }
}

/// Maps Y-up coordinates onto Z-up: (x, y, z) -> (x, -z, y).
pub const Y_UP_TO_Z_UP: DMat4 = DMat4::from_cols(
    DVec4::new(1.0, 0.0, 0.0, 0.0),
    DVec4::new(0.0, 0.0, 1.0, 0.0),
    DVec4::new(0.0, -1.0, 0.0, 0.0),
    DVec4::new(0.0, 0.0, 0.0, 1.0),
);

/// Maps X-up coordinates onto Z-up: (x, y, z) -> (-z, y, x).
pub const X_UP_TO_Z_UP: DMat4 = DMat4::from_cols(
    DVec4::new(0.0, 0.0, 1.0, 0.0),
    DVec4::new(0.0, 1.0, 0.0, 0.0),
    DVec4::new(-1.0, 0.0, 0.0, 0.0),
    DVec4::new(0.0, 0.0, 0.0, 1.0),
);

impl UpAxis {
    /// The correction matrix that rotates this convention onto Z-up.
    /// `Z` needs no correction and yields the identity.
    pub fn to_z_up(self) -> DMat4 {
        match self {
            UpAxis::X => X_UP_TO_Z_UP,
            UpAxis::Y => Y_UP_TO_Z_UP,
            UpAxis::Z => DMat4::IDENTITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn test_default_is_y_up() {
        assert_eq!(UpAxis::default(), UpAxis::Y);
    }

    #[test]
    fn test_z_up_is_identity() {
        assert_eq!(UpAxis::Z.to_z_up(), DMat4::IDENTITY);
    }

    #[test]
    fn test_y_up_correction_sends_y_to_z() {
        let m = UpAxis::Y.to_z_up();
        assert_eq!(m.transform_vector3(DVec3::Y), DVec3::Z);
        assert_eq!(m.transform_vector3(DVec3::Z), -DVec3::Y);
        assert_eq!(m.transform_vector3(DVec3::X), DVec3::X);
    }

    #[test]
    fn test_x_up_correction_sends_x_to_z() {
        let m = UpAxis::X.to_z_up();
        assert_eq!(m.transform_vector3(DVec3::X), DVec3::Z);
        assert_eq!(m.transform_vector3(DVec3::Z), -DVec3::X);
        assert_eq!(m.transform_vector3(DVec3::Y), DVec3::Y);
    }

    #[test]
    fn test_corrections_are_rotations() {
        for axis in [UpAxis::X, UpAxis::Y, UpAxis::Z] {
            let m = axis.to_z_up();
            assert!((m.determinant() - 1.0).abs() < 1e-12, "{:?} not a proper rotation", axis);
        }
    }
}

//! Model transform composition and row-major matrix helpers

use nalgebra::{Matrix4 as NMatrix4, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::state::{Matrix4, IDENTITY};

/// Translate / rotate / scale parameters of the model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelTransform {
    pub translate: [f64; 3],
    /// Rotation about X, Y and Z in degrees
    pub rotate_deg: [f64; 3],
    pub scale: [f64; 3],
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            translate: [0.0; 3],
            rotate_deg: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl ModelTransform {
    pub fn new(translate: [f64; 3], rotate_deg: [f64; 3], scale: [f64; 3]) -> Self {
        Self {
            translate,
            rotate_deg,
            scale,
        }
    }

    /// Row-major matrix applying scale, then rotations X, Y, Z, then translation
    pub fn to_matrix(&self) -> Matrix4 {
        let [rx, ry, rz] = self.rotate_deg.map(f64::to_radians);
        let translation = NMatrix4::new_translation(&Vector3::from(self.translate));
        // from_euler_angles(roll, pitch, yaw) == Rz(yaw) * Ry(pitch) * Rx(roll)
        let rotation = Rotation3::from_euler_angles(rx, ry, rz).to_homogeneous();
        let scaling = NMatrix4::new_nonuniform_scaling(&Vector3::from(self.scale));
        to_row_major(&(translation * rotation * scaling))
    }

    /// Shorthand for building and composing in one call
    pub fn compose(translate: [f64; 3], rotate_deg: [f64; 3], scale: [f64; 3]) -> Matrix4 {
        Self::new(translate, rotate_deg, scale).to_matrix()
    }

    pub fn is_identity(&self) -> bool {
        self.to_matrix() == IDENTITY
    }
}

/// Convert an nalgebra matrix into the row-major array layout
pub fn to_row_major(m: &NMatrix4<f64>) -> Matrix4 {
    let mut out = [0.0; 16];
    for row in 0..4 {
        for col in 0..4 {
            out[row * 4 + col] = m[(row, col)];
        }
    }
    out
}

pub fn from_row_major(m: &Matrix4) -> NMatrix4<f64> {
    NMatrix4::from_row_slice(m)
}

/// Inverse of a row-major matrix, `None` when singular
pub fn invert(m: &Matrix4) -> Option<Matrix4> {
    from_row_major(m).try_inverse().map(|inv| to_row_major(&inv))
}

/// Row-major product `a * b`
pub fn multiply(a: &Matrix4, b: &Matrix4) -> Matrix4 {
    to_row_major(&(from_row_major(a) * from_row_major(b)))
}

/// Apply a row-major homogeneous transform to a point
pub fn transform_point(m: &Matrix4, p: [f64; 3]) -> [f64; 3] {
    let out = from_row_major(m).transform_point(&Point3::from(p));
    [out.x, out.y, out.z]
}

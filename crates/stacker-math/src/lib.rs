#![warn(missing_docs)]

//! Math types for stacker.
//!
//! Thin wrappers around nalgebra providing the types shared by the box
//! primitive and the search: points, vectors, directions, Rodrigues
//! rotation, tolerance constants and axis-aligned bounds.

mod aabb;

pub use aabb::Aabb3;

use nalgebra::{Unit, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// Rotate `v` by `angle` radians about the unit `axis` (Rodrigues' formula).
///
/// `v cos θ + (k × v) sin θ + k (k · v)(1 - cos θ)`
pub fn rotate_about_axis(v: &Vec3, angle: f64, axis: &Dir3) -> Vec3 {
    let (s, c) = angle.sin_cos();
    let k = axis.as_ref();
    v * c + k.cross(v) * s + k * (k.dot(v) * (1.0 - c))
}

/// Angle in radians between two vectors.
///
/// The cosine is clamped into `[-1, 1]` before `acos`, so nearly parallel
/// inputs never produce NaN. Returns 0 if either vector has zero length.
pub fn angle_between(a: &Vec3, b: &Vec3) -> f64 {
    let denom = a.norm() * b.norm();
    if denom == 0.0 {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos()
}

/// Normalized rotation axis taking `from` onto `to`, if one is defined.
///
/// `None` when the vectors are (anti)parallel or either is zero.
pub fn rotation_axis(from: &Vec3, to: &Vec3, tol: &Tolerance) -> Option<Dir3> {
    Unit::try_new(from.cross(to), tol.angular)
}

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance.
    pub linear: f64,
    /// Angular tolerance in radians.
    pub angular: f64,
}

impl Tolerance {
    /// Default tolerances (1e-9 linear, 1e-12 rad angular).
    pub const DEFAULT: Self = Self {
        linear: 1e-9,
        angular: 1e-12,
    };

    /// Check if a scalar distance is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() < self.linear
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_rotate_about_z_90() {
        let axis = Dir3::new_normalize(Vec3::z());
        let r = rotate_about_axis(&Vec3::x(), PI / 2.0, &axis);
        assert!(r.x.abs() < 1e-12);
        assert_relative_eq!(r.y, 1.0, epsilon = 1e-12);
        assert!(r.z.abs() < 1e-12);
    }

    #[test]
    fn test_rotate_about_diagonal_180() {
        // Rotate about (1,1,0) normalized by 180° swaps x and y
        let axis = Dir3::new_normalize(Vec3::new(1.0, 1.0, 0.0));
        let r = rotate_about_axis(&Vec3::x(), PI, &axis);
        assert!(r.x.abs() < 1e-12);
        assert_relative_eq!(r.y, 1.0, epsilon = 1e-12);
        assert!(r.z.abs() < 1e-12);
    }

    #[test]
    fn test_rotation_preserves_length() {
        let axis = Dir3::new_normalize(Vec3::new(0.2, 0.9, -0.4));
        let v = Vec3::new(3.0, -4.0, 12.0);
        let r = rotate_about_axis(&v, 2.1, &axis);
        assert_relative_eq!(r.norm(), 13.0, epsilon = 1e-12);
    }

    #[test]
    fn test_angle_between_clamps() {
        let a = Vec3::new(1.0, 1e-17, 0.0);
        let b = Vec3::new(1.0, 0.0, 0.0);
        let angle = angle_between(&a, &b);
        assert!(!angle.is_nan());
        assert!(angle.abs() < 1e-12);

        let opposite = angle_between(&a, &(-b));
        assert_relative_eq!(opposite, PI, epsilon = 1e-12);
        assert_eq!(angle_between(&Vec3::zeros(), &b), 0.0);
    }

    #[test]
    fn test_rotation_axis_parallel_is_none() {
        let tol = Tolerance::DEFAULT;
        let a = Vec3::new(1.0, 0.0, 0.0);
        assert!(rotation_axis(&a, &(a * 3.0), &tol).is_none());
        let axis = rotation_axis(&a, &Vec3::y(), &tol).unwrap();
        assert_relative_eq!(axis.as_ref().z, 1.0, epsilon = 1e-12);
    }
}

//! Deformation parameters for primitives.

use serde::{Deserialize, Serialize};
use stacker_math::Vec3;

use crate::box3::Box3;

/// Deformation of a cuboid primitive: translate, rotate, then scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CuboidParams {
    /// Translation of the box center.
    pub translation: [f64; 3],
    /// Rotation angles in degrees about the box's own X, Y and Z axes.
    pub rotation: [f64; 3],
    /// Factors applied to the three half-extents.
    pub scale: [f64; 3],
}

impl CuboidParams {
    /// The deformation that leaves a box unchanged.
    pub const IDENTITY: Self = Self {
        translation: [0.0; 3],
        rotation: [0.0; 3],
        scale: [1.0; 3],
    };

    /// Pure translation.
    pub fn translation(t: Vec3) -> Self {
        Self {
            translation: t.into(),
            ..Self::IDENTITY
        }
    }

    /// Pure rotation (degrees about local X, Y, Z).
    pub fn rotation(angles: Vec3) -> Self {
        Self {
            rotation: angles.into(),
            ..Self::IDENTITY
        }
    }

    /// Pure anisotropic scale.
    pub fn scale(s: Vec3) -> Self {
        Self {
            scale: s.into(),
            ..Self::IDENTITY
        }
    }

    /// Apply to a box: translate, rotate about local axes, scale extents.
    pub fn apply(&self, b: &Box3) -> Box3 {
        let mut out = *b;
        out.translate(&Vec3::from(self.translation));
        out.rotate_local(&Vec3::from(self.rotation));
        out.scale_extents(&Vec3::from(self.scale));
        out
    }
}

impl Default for CuboidParams {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Parameters accepted by a primitive's `deform`.
///
/// Each primitive kind owns one variant; matching is exhaustive so a
/// primitive cannot silently receive another kind's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeformParams {
    /// Oriented-box primitive.
    Cuboid(CuboidParams),
}

impl From<CuboidParams> for DeformParams {
    fn from(p: CuboidParams) -> Self {
        Self::Cuboid(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stacker_math::Point3;

    #[test]
    fn test_identity_leaves_box() {
        let b = Box3::axis_aligned(Point3::new(1.0, 2.0, 3.0), [1.0, 2.0, 3.0]);
        assert_eq!(CuboidParams::default(), CuboidParams::IDENTITY);
        assert_eq!(CuboidParams::IDENTITY.apply(&b), b);
    }

    #[test]
    fn test_apply_order() {
        let b = Box3::axis_aligned(Point3::origin(), [1.0, 1.0, 1.0]);
        let p = CuboidParams {
            translation: [1.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 90.0],
            scale: [2.0, 1.0, 1.0],
        };
        let out = p.apply(&b);
        assert_eq!(out.center, Point3::new(1.0, 0.0, 0.0));
        // Scale acts on the rotated axis0, which now points along +y
        assert!((out.axes[0] - Vec3::y()).norm() < 1e-12);
        assert_eq!(out.extent, [2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_serde_tagged() {
        let p = DeformParams::from(CuboidParams::translation(Vec3::new(0.0, 1.0, 0.0)));
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"type\":\"Cuboid\""));
        let back: DeformParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}

//! Oriented box value type and its face enumeration.
//!
//! Corner layout (signs along `axis0, axis1, axis2`):
//! ```text
//!     c4----c5        c0 (-,-,+)   c4 (-,+,+)
//!    /|    /|         c1 (+,-,+)   c5 (+,+,+)
//!   c7----c6|         c2 (+,-,-)   c6 (+,+,-)
//!   | c0--|-c1        c3 (-,-,-)   c7 (-,+,-)
//!   |/    |/
//!   c3----c2
//! ```
//! Face `2i` is the `+axis_i` face and face `2i + 1` the `-axis_i` face,
//! so opposite faces always differ in the lowest bit.

use std::fmt;

use nalgebra::Unit;
use stacker_math::{rotate_about_axis, Point3, Tolerance, Vec3};

use crate::error::{PrimitiveError, Result};

/// Corner indices of each face, in winding order.
const FACE_CORNERS: [[usize; 4]; 6] = [
    [1, 2, 6, 5],
    [0, 4, 7, 3],
    [4, 5, 6, 7],
    [0, 3, 2, 1],
    [0, 1, 5, 4],
    [2, 3, 7, 6],
];

/// One of the six faces of a [`Box3`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FaceId(u8);

impl FaceId {
    /// All six faces in enumeration order.
    pub const ALL: [FaceId; 6] = [
        FaceId(0),
        FaceId(1),
        FaceId(2),
        FaceId(3),
        FaceId(4),
        FaceId(5),
    ];

    /// Face from its index, if it is in `0..6`.
    pub fn new(index: usize) -> Result<Self> {
        if index < 6 {
            Ok(Self(index as u8))
        } else {
            Err(PrimitiveError::InvalidFace(index))
        }
    }

    /// The face on the positive (`sign > 0`) or negative side of `axis`.
    pub fn from_axis(axis: usize, positive: bool) -> Self {
        debug_assert!(axis < 3);
        Self((2 * axis + usize::from(!positive)) as u8)
    }

    /// Index in `0..6`.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Box axis this face is perpendicular to.
    pub fn axis(self) -> usize {
        self.index() / 2
    }

    /// `+1.0` for the `+axis` face, `-1.0` for the `-axis` face.
    pub fn sign(self) -> f64 {
        if self.0 % 2 == 0 {
            1.0
        } else {
            -1.0
        }
    }

    /// The face on the other side of the box.
    pub fn opposite(self) -> Self {
        Self(self.0 ^ 1)
    }
}

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 6] = ["+x", "-x", "+y", "-y", "+z", "-z"];
        write!(f, "{}", NAMES[self.index()])
    }
}

/// Oriented box: center, three orthonormal axes, three half-extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Box3 {
    /// Center point.
    pub center: Point3,
    /// Orthonormal, right-handed axes.
    pub axes: [Vec3; 3],
    /// Half-widths along each axis (non-negative).
    pub extent: [f64; 3],
}

impl Box3 {
    /// Build a box, flipping `axes[2]` if the frame is left-handed.
    pub fn new(center: Point3, axes: [Vec3; 3], extent: [f64; 3]) -> Self {
        let mut b = Self {
            center,
            axes,
            extent: extent.map(|e| e.max(0.0)),
        };
        b.make_right_handed();
        b
    }

    /// Axis-aligned box with the given center and half-extents.
    pub fn axis_aligned(center: Point3, extent: [f64; 3]) -> Self {
        Self::new(center, [Vec3::x(), Vec3::y(), Vec3::z()], extent)
    }

    /// True if `axis0 × axis1 · axis2 >= 0`.
    pub fn is_right_handed(&self) -> bool {
        self.axes[0].cross(&self.axes[1]).dot(&self.axes[2]) >= 0.0
    }

    /// Flip `axes[2]` if the frame is left-handed.
    pub fn make_right_handed(&mut self) {
        if !self.is_right_handed() {
            self.axes[2] = -self.axes[2];
        }
    }

    /// Box-local coordinates of `p`: signed fractions of each half-extent.
    ///
    /// An axis whose extent is (effectively) zero maps to 0.
    pub fn coordinates_of(&self, p: &Point3) -> Vec3 {
        let local = p - self.center;
        let tol = Tolerance::DEFAULT;
        Vec3::from_fn(|i, _| {
            if tol.is_zero(self.extent[i]) {
                0.0
            } else {
                local.dot(&self.axes[i]) / self.extent[i]
            }
        })
    }

    /// Inverse of [`Box3::coordinates_of`].
    pub fn position_of(&self, coord: &Vec3) -> Point3 {
        self.center
            + self.axes[0] * (self.extent[0] * coord.x)
            + self.axes[1] * (self.extent[1] * coord.y)
            + self.axes[2] * (self.extent[2] * coord.z)
    }

    /// Volume, `8 * e0 * e1 * e2`.
    pub fn volume(&self) -> f64 {
        8.0 * self.extent[0] * self.extent[1] * self.extent[2]
    }

    /// Translate the center.
    pub fn translate(&mut self, t: &Vec3) {
        self.center += *t;
    }

    /// Rotate about the box's own axes by `angles` degrees: X, then Y, then Z.
    ///
    /// Each step rotates all three axes about the current axis `i`, so the
    /// later rotations act in the already-rotated frame.
    pub fn rotate_local(&mut self, angles: &Vec3) {
        for i in 0..3 {
            let theta = angles[i].to_radians();
            if theta == 0.0 {
                continue;
            }
            let Some(axis) = Unit::try_new(self.axes[i], 0.0) else {
                continue;
            };
            for a in &mut self.axes {
                *a = rotate_about_axis(a, theta, &axis);
            }
        }
    }

    /// Multiply each extent by the matching factor.
    pub fn scale_extents(&mut self, s: &Vec3) {
        for i in 0..3 {
            self.extent[i] = (self.extent[i] * s[i]).max(0.0);
        }
    }

    /// The 8 corners in the fixed layout of this module.
    ///
    /// A left-handed input is corrected first, so the returned corners
    /// always span a right-handed frame.
    pub fn corners(&self) -> [Point3; 8] {
        let mut b = *self;
        b.make_right_handed();
        let a: [Vec3; 3] = std::array::from_fn(|i| b.axes[i] * (2.0 * b.extent[i]));

        let c0 = b.center - a[0] * 0.5 - a[1] * 0.5 + a[2] * 0.5;
        let c1 = c0 + a[0];
        let c2 = c1 - a[2];
        let c3 = c2 - a[0];
        [
            c0,
            c1,
            c2,
            c3,
            c0 + a[1],
            c1 + a[1],
            c2 + a[1],
            c3 + a[1],
        ]
    }

    /// The 6 faces, each as 4 corners in winding order.
    pub fn faces(&self) -> [[Point3; 4]; 6] {
        let corners = self.corners();
        FACE_CORNERS.map(|ids| ids.map(|i| corners[i]))
    }

    /// Corners of one face.
    pub fn face(&self, face: FaceId) -> [Point3; 4] {
        let corners = self.corners();
        FACE_CORNERS[face.index()].map(|i| corners[i])
    }

    /// Center of one face.
    pub fn face_center(&self, face: FaceId) -> Point3 {
        self.center + self.axes[face.axis()] * (face.sign() * self.extent[face.axis()])
    }

    /// Parameter-space distance to another box.
    ///
    /// Sum of the center offset, the extent differences and the axis
    /// differences weighted by extent, so every term is a length.
    pub fn parameter_distance(&self, other: &Box3) -> f64 {
        let mut d = (self.center - other.center).norm();
        for i in 0..3 {
            d += (self.extent[i] - other.extent[i]).abs();
            let weight = 0.5 * (self.extent[i] + other.extent[i]);
            d += weight * (self.axes[i] - other.axes[i]).norm();
        }
        d
    }
}

impl Default for Box3 {
    fn default() -> Self {
        Self::axis_aligned(Point3::origin(), [0.0; 3])
    }
}

//! Axis-aligned bounding boxes.
//!
//! Used for the overall object bounds and the bounding-box tolerance
//! constraint of the search.

use crate::{Point3, Vec3};

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb3 {
    /// Create an AABB from min and max corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Bounds of a set of points. Empty input gives [`Aabb3::empty`].
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.include_point(p);
        }
        aabb
    }

    /// True if no point has been included yet.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Expand this AABB to include another one.
    pub fn include(&mut self, other: &Aabb3) {
        if other.is_empty() {
            return;
        }
        self.include_point(&other.min);
        self.include_point(&other.max);
    }

    /// Center point.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Edge lengths along x, y and z.
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::zeros();
        }
        self.max - self.min
    }

    /// Length of the main diagonal.
    pub fn diagonal(&self) -> f64 {
        self.size().norm()
    }

    /// Largest overflow of `other` beyond `self`, relative to `self`'s size.
    ///
    /// For each axis the distance by which `other` sticks out on either
    /// side is divided by this box's length on that axis (the diagonal is
    /// used for flat axes). Returns 0 when `other` lies inside.
    pub fn relative_overflow(&self, other: &Aabb3) -> f64 {
        if self.is_empty() || other.is_empty() {
            return 0.0;
        }
        let size = self.size();
        let diag = size.norm();
        let mut worst: f64 = 0.0;
        for i in 0..3 {
            let out = (self.min[i] - other.min[i])
                .max(other.max[i] - self.max[i])
                .max(0.0);
            let scale = if size[i] > 0.0 { size[i] } else { diag };
            let rel = if scale > 0.0 { out / scale } else { out };
            worst = worst.max(rel);
        }
        worst
    }
}

impl Default for Aabb3 {
    fn default() -> Self {
        Self::empty()
    }
}

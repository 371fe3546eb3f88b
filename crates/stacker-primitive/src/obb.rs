//! Oriented bounding box fitting.
//!
//! [`ObbFitter`] is the black-box solver a primitive delegates to. Two
//! fitters are provided: a PCA fitter that keeps the smaller of the
//! principal-axis box and the axis-aligned box, and a plain axis-aligned
//! fitter.

use nalgebra::Matrix3;
use stacker_math::{Aabb3, Point3, Vec3};

use crate::box3::Box3;

/// Fits an oriented box around a point set.
pub trait ObbFitter {
    /// Box enclosing `points`. Empty input gives a zero box at the origin.
    fn fit(&self, points: &[Point3]) -> Box3;
}

/// Axis-aligned bounding box of the points.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisAlignedFitter;

impl ObbFitter for AxisAlignedFitter {
    fn fit(&self, points: &[Point3]) -> Box3 {
        if points.is_empty() {
            return Box3::default();
        }
        let aabb = Aabb3::from_points(points);
        let half = aabb.size() * 0.5;
        Box3::axis_aligned(aabb.center(), [half.x, half.y, half.z])
    }
}

/// Principal-axis box, falling back to the axis-aligned box when smaller.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcaObbFitter;

impl ObbFitter for PcaObbFitter {
    fn fit(&self, points: &[Point3]) -> Box3 {
        if points.is_empty() {
            return Box3::default();
        }

        let centroid = centroid(points);
        let cov = covariance(points, &centroid);
        let eigen = cov.symmetric_eigen();

        // Largest variance first
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
        let mut axes: [Vec3; 3] = std::array::from_fn(|i| {
            canonical_sign(eigen.eigenvectors.column(order[i]).into_owned())
        });
        axes[2] = axes[0].cross(&axes[1]);

        let pca = box_in_frame(points, &centroid, axes);
        let aabb = AxisAlignedFitter.fit(points);
        if aabb.volume() <= pca.volume() {
            aabb
        } else {
            pca
        }
    }
}

fn centroid(points: &[Point3]) -> Point3 {
    let sum: Vec3 = points.iter().map(|p| p.coords).sum();
    Point3::from(sum / points.len() as f64)
}

fn covariance(points: &[Point3], centroid: &Point3) -> Matrix3<f64> {
    let mut cov = Matrix3::zeros();
    for p in points {
        let d = p - centroid;
        cov += d * d.transpose();
    }
    cov / points.len() as f64
}

/// Flip `v` so its largest component is positive.
fn canonical_sign(v: Vec3) -> Vec3 {
    let v = v.normalize();
    let i = v.iamax();
    if v[i] < 0.0 {
        -v
    } else {
        v
    }
}

fn box_in_frame(points: &[Point3], origin: &Point3, axes: [Vec3; 3]) -> Box3 {
    let mut lo = Vec3::repeat(f64::INFINITY);
    let mut hi = Vec3::repeat(f64::NEG_INFINITY);
    for p in points {
        let d = p - origin;
        for i in 0..3 {
            let t = d.dot(&axes[i]);
            lo[i] = lo[i].min(t);
            hi[i] = hi[i].max(t);
        }
    }
    let mid = (lo + hi) * 0.5;
    let center = origin + axes[0] * mid.x + axes[1] * mid.y + axes[2] * mid.z;
    let half = (hi - lo) * 0.5;
    Box3::new(center, axes, [half.x, half.y, half.z])
}

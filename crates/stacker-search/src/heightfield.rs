//! Heightfield stackability evaluator.
//!
//! Copies of an object are stacked along +Z. Over a grid of vertical lines
//! through the XY bounds, the lowest copy's top surface and the next copy's
//! bottom surface are sampled. The copy above has to be lifted by the
//! largest `top - bottom` over all lines; that lift is the stacking offset.
//! Stackability is `1 - offset / height`, so 1 means copies nest fully and 0
//! means they only sit on top of each other.

use std::collections::BTreeMap;

use stacker_math::{Aabb3, Point3};
use stacker_primitive::SegMesh;
use tracing::debug;

use crate::controller::Controller;
use crate::error::Result;
use crate::evaluator::{Evaluation, HotSpotProvider, StackabilityEvaluator};
use crate::hotspot::{HotSide, HotSpot};
use crate::settings::HeightfieldSettings;
use crate::state::PartId;

const INSIDE_EPS: f64 = 1e-9;

/// Where a vertical line meets the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Part hit.
    pub part: PartId,
    /// Point on the surface.
    pub point: Point3,
}

/// Top and bottom surface samples over an XY grid.
#[derive(Debug, Clone)]
pub struct Heightfield {
    resolution: usize,
    height: f64,
    top: Vec<Option<Hit>>,
    bottom: Vec<Option<Hit>>,
}

impl Heightfield {
    /// Rasterize `mesh` on a `resolution x resolution` grid over its bounds.
    ///
    /// Returns `None` for a mesh without vertices.
    pub fn rasterize(mesh: &SegMesh, resolution: usize) -> Option<Self> {
        let bounds = mesh.current_bounds();
        if bounds.is_empty() || resolution == 0 {
            return None;
        }
        let size = bounds.size();
        let cell = [size.x / resolution as f64, size.y / resolution as f64];
        let center = |i: usize, axis: usize| bounds.min[axis] + (i as f64 + 0.5) * cell[axis];

        let mut field = Self {
            resolution,
            height: size.z,
            top: vec![None; resolution * resolution],
            bottom: vec![None; resolution * resolution],
        };

        for (segment, [a, b, c]) in mesh.triangles() {
            let part = PartId(segment);
            let lo = [a.x.min(b.x).min(c.x), a.y.min(b.y).min(c.y)];
            let hi = [a.x.max(b.x).max(c.x), a.y.max(b.y).max(c.y)];
            let [(i0, i1), (j0, j1)] = [0, 1].map(|axis| {
                cell_range(lo[axis], hi[axis], bounds.min[axis], cell[axis], resolution)
            });
            for j in j0..=j1 {
                for i in i0..=i1 {
                    let (x, y) = (center(i, 0), center(j, 1));
                    let Some(z) = triangle_height(&a, &b, &c, x, y) else {
                        continue;
                    };
                    let hit = Hit {
                        part,
                        point: Point3::new(x, y, z),
                    };
                    let k = j * resolution + i;
                    if field.top[k].map_or(true, |t| z > t.point.z) {
                        field.top[k] = Some(hit);
                    }
                    if field.bottom[k].map_or(true, |t| z < t.point.z) {
                        field.bottom[k] = Some(hit);
                    }
                }
            }
        }
        Some(field)
    }

    /// Cells along each grid axis.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Height of the object.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Number of cells any triangle covers.
    pub fn covered_cells(&self) -> usize {
        self.top.iter().filter(|t| t.is_some()).count()
    }

    /// `(top, bottom)` hits of every covered cell.
    pub fn columns(&self) -> impl Iterator<Item = (Hit, Hit)> + '_ {
        self.top
            .iter()
            .zip(&self.bottom)
            .filter_map(|(t, b)| Some(((*t)?, (*b)?)))
    }

    /// Lift needed to put a copy on top of another; `None` if nothing is covered.
    pub fn offset(&self) -> Option<f64> {
        self.columns()
            .map(|(t, b)| t.point.z - b.point.z)
            .fold(None, |m: Option<f64>, d| Some(m.map_or(d, |m| m.max(d))))
    }

    /// `1 - offset / height`, or 0 for a flat or uncovered object.
    pub fn stackability(&self) -> f64 {
        match self.offset() {
            Some(offset) if self.height > 0.0 => (1.0 - offset / self.height).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

/// Cell indices whose centers fall in `[lo, hi]`, clamped to the grid.
fn cell_range(lo: f64, hi: f64, origin: f64, cell: f64, resolution: usize) -> (usize, usize) {
    if cell <= 0.0 {
        return (0, resolution - 1);
    }
    let max = (resolution - 1) as f64;
    let first = ((lo - origin) / cell - 0.5).ceil().clamp(0.0, max);
    let last = ((hi - origin) / cell - 0.5).floor().clamp(0.0, max);
    (first as usize, last as usize)
}

/// Height of the triangle above `(x, y)`, if the point lies inside its XY projection.
fn triangle_height(a: &Point3, b: &Point3, c: &Point3, x: f64, y: f64) -> Option<f64> {
    let (v0x, v0y) = (b.x - a.x, b.y - a.y);
    let (v1x, v1y) = (c.x - a.x, c.y - a.y);
    let (v2x, v2y) = (x - a.x, y - a.y);
    let det = v0x * v1y - v0y * v1x;
    // Vertical triangles have no footprint
    let scale = (v0x * v0x + v0y * v0y).max(v1x * v1x + v1y * v1y);
    if det.abs() <= 1e-12 * scale || scale == 0.0 {
        return None;
    }
    let u = (v2x * v1y - v2y * v1x) / det;
    let v = (v0x * v2y - v0y * v2x) / det;
    if u < -INSIDE_EPS || v < -INSIDE_EPS || u + v > 1.0 + INSIDE_EPS {
        return None;
    }
    Some(a.z + u * (b.z - a.z) + v * (c.z - a.z))
}

/// Reference stackability evaluator and hot-spot detector.
#[derive(Debug, Clone)]
pub struct HeightfieldEvaluator {
    settings: HeightfieldSettings,
    reference: Aabb3,
}

impl HeightfieldEvaluator {
    /// Evaluator measuring bounding-box deviation against `reference`.
    pub fn new(settings: HeightfieldSettings, reference: Aabb3) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            reference,
        })
    }

    /// Evaluator whose reference bounds are the current bounds of `mesh`.
    pub fn for_mesh(settings: HeightfieldSettings, mesh: &SegMesh) -> Result<Self> {
        Self::new(settings, mesh.current_bounds())
    }

    /// Settings in use.
    pub fn settings(&self) -> &HeightfieldSettings {
        &self.settings
    }

    /// Bounds deviation is measured against.
    pub fn reference(&self) -> Aabb3 {
        self.reference
    }

    /// Sample `mesh` on this evaluator's grid.
    pub fn heightfield(&self, mesh: &SegMesh) -> Option<Heightfield> {
        Heightfield::rasterize(mesh, self.settings.resolution)
    }
}

impl StackabilityEvaluator for HeightfieldEvaluator {
    fn evaluate(&self, mesh: &SegMesh) -> Evaluation {
        let stackability = self
            .heightfield(mesh)
            .map_or(0.0, |field| field.stackability());
        Evaluation {
            stackability,
            bb_deviation: self.reference.relative_overflow(&mesh.current_bounds()),
        }
    }
}

impl HotSpotProvider for HeightfieldEvaluator {
    fn hot_spots(&self, controller: &Controller, mesh: &SegMesh) -> Vec<HotSpot> {
        let Some(field) = self.heightfield(mesh) else {
            return Vec::new();
        };
        let Some(offset) = field.offset() else {
            return Vec::new();
        };
        let threshold = offset - self.settings.hot_tolerance * field.height();

        let mut groups: BTreeMap<(PartId, HotSide), Vec<Point3>> = BTreeMap::new();
        for (top, bottom) in field.columns() {
            if top.point.z - bottom.point.z < threshold {
                continue;
            }
            groups
                .entry((top.part, HotSide::Upper))
                .or_default()
                .push(top.point);
            groups
                .entry((bottom.part, HotSide::Lower))
                .or_default()
                .push(bottom.point);
        }

        let spots: Vec<HotSpot> = groups
            .into_iter()
            .filter_map(|((part, side), samples)| {
                let face = controller.primitive(part).ok()?.hot_face(&samples)?;
                Some(HotSpot {
                    part,
                    face,
                    side,
                    samples,
                })
            })
            .collect();
        debug!(offset, hot_spots = spots.len(), "Detected hot spots");
        spots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use stacker_math::Vec3;
    use stacker_primitive::{AxisAlignedFitter, FaceId, PartMesh};

    fn settings(resolution: usize) -> HeightfieldSettings {
        HeightfieldSettings {
            resolution,
            ..Default::default()
        }
    }

    fn cube() -> SegMesh {
        SegMesh::new(
            "cube",
            vec![PartMesh::cuboid("c", Point3::origin(), [0.5, 0.5, 0.5])],
        )
    }

    /// Two slabs side by side, one low and one high.
    fn steps() -> SegMesh {
        SegMesh::new(
            "steps",
            vec![
                PartMesh::cuboid("low", Point3::new(-0.5, 0.0, 0.1), [0.5, 0.5, 0.1]),
                PartMesh::cuboid("high", Point3::new(0.5, 0.0, 0.9), [0.5, 0.5, 0.1]),
            ],
        )
    }

    #[test]
    fn test_solid_cube_does_not_nest() {
        let mesh = cube();
        let field = Heightfield::rasterize(&mesh, 8).unwrap();
        assert_eq!(field.covered_cells(), 64);
        assert_relative_eq!(field.offset().unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(field.stackability(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_steps_nest() {
        let eval = HeightfieldEvaluator::for_mesh(settings(16), &steps()).unwrap();
        let e = eval.evaluate(&steps());
        assert_relative_eq!(e.stackability, 0.8, epsilon = 1e-9);
        assert_eq!(e.bb_deviation, 0.0);
    }

    #[test]
    fn test_bb_deviation() {
        let mesh = cube();
        let eval = HeightfieldEvaluator::for_mesh(settings(8), &mesh).unwrap();
        let mut moved = mesh.clone();
        if let Some(s) = moved.segment_mut(0) {
            s.translate(&Vec3::new(0.25, 0.0, 0.0));
        }
        moved.update();
        assert_relative_eq!(eval.evaluate(&moved).bb_deviation, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_mesh() {
        let eval = HeightfieldEvaluator::new(settings(8), Aabb3::empty()).unwrap();
        let e = eval.evaluate(&SegMesh::default());
        assert_eq!(e, Evaluation::default());
    }

    #[test]
    fn test_invalid_settings() {
        assert!(HeightfieldEvaluator::new(settings(0), Aabb3::empty()).is_err());
    }

    #[test]
    fn test_hot_spots_on_cube_faces() {
        let ctrl = Controller::fit(cube(), &AxisAlignedFitter).unwrap();
        let eval = HeightfieldEvaluator::for_mesh(settings(8), ctrl.mesh()).unwrap();
        let spots = eval.hot_spots(&ctrl, ctrl.mesh());
        assert_eq!(spots.len(), 2);
        assert_eq!(spots[0].side, HotSide::Upper);
        assert_eq!(spots[0].face, FaceId::from_axis(2, true));
        assert_eq!(spots[1].side, HotSide::Lower);
        assert_eq!(spots[1].face, FaceId::from_axis(2, false));
        assert_eq!(spots[0].samples.len(), 64);
    }

    #[test]
    fn test_hot_spots_follow_the_worst_columns() {
        // Raise the low step so its columns become the tallest
        let mut mesh = steps();
        if let Some(s) = mesh.segment_mut(0) {
            *s = PartMesh::cuboid("low", Point3::new(-0.5, 0.0, 0.2), [0.5, 0.5, 0.2]);
        }
        mesh.update();
        let ctrl = Controller::fit(mesh, &AxisAlignedFitter).unwrap();
        let eval =
            HeightfieldEvaluator::for_mesh(HeightfieldSettings::default(), ctrl.mesh()).unwrap();
        let spots = eval.hot_spots(&ctrl, ctrl.mesh());
        assert!(!spots.is_empty());
        assert!(spots.iter().all(|s| s.part == PartId(0)));
    }
}

//! Box primitive: a mesh part driven by an oriented bounding box.
//!
//! Every vertex of the part is stored once as box-local coordinates of the
//! fitted box. Editing the box and writing the coordinates back through
//! [`BoxPrimitive::deform_mesh`] deforms the whole part.

use nalgebra::Unit;
use stacker_math::{angle_between, rotate_about_axis, rotation_axis, Point3, Tolerance, Vec3};

use crate::box3::{Box3, FaceId};
use crate::error::{PrimitiveError, Result};
use crate::mesh::MeshPart;
use crate::obb::ObbFitter;
use crate::params::{CuboidParams, DeformParams};

/// A cuboid primitive bound to one mesh part.
#[derive(Debug, Clone)]
pub struct BoxPrimitive {
    original_box: Box3,
    current_box: Box3,
    coordinates: Vec<Vec3>,
    selected_face: Option<FaceId>,
    degenerate: [bool; 3],
}

impl BoxPrimitive {
    /// Fit a box to the part with `fitter` and record every vertex's coordinates.
    pub fn fit<M, F>(mesh: &M, fitter: &F) -> Result<Self>
    where
        M: MeshPart + ?Sized,
        F: ObbFitter + ?Sized,
    {
        let points = mesh.vertex_positions();
        if points.is_empty() {
            return Err(PrimitiveError::EmptyMesh);
        }
        Ok(Self::with_box(&points, fitter.fit(&points)))
    }

    /// Bind a part to an already known box (e.g. one restored from a record).
    pub fn from_box<M>(mesh: &M, b: Box3) -> Result<Self>
    where
        M: MeshPart + ?Sized,
    {
        let points = mesh.vertex_positions();
        if points.is_empty() {
            return Err(PrimitiveError::EmptyMesh);
        }
        Ok(Self::with_box(&points, b))
    }

    fn with_box(points: &[Point3], mut b: Box3) -> Self {
        b.make_right_handed();
        let tol = Tolerance::DEFAULT;
        let degenerate = b.extent.map(|e| tol.is_zero(e));
        let coordinates = points
            .iter()
            .map(|p| Self::coordinates_in_box(&b, p))
            .collect();
        Self {
            original_box: b,
            current_box: b,
            coordinates,
            selected_face: None,
            degenerate,
        }
    }

    /// The rest box deformations are measured from.
    pub fn original_box(&self) -> &Box3 {
        &self.original_box
    }

    /// The box the mesh is currently deformed by.
    pub fn current_box(&self) -> &Box3 {
        &self.current_box
    }

    /// Box-local coordinates, one per vertex.
    pub fn coordinates(&self) -> &[Vec3] {
        &self.coordinates
    }

    /// Axes that had zero extent at fit time.
    pub fn degenerate_axes(&self) -> [bool; 3] {
        self.degenerate
    }

    /// True if any axis had zero extent at fit time.
    pub fn is_degenerate(&self) -> bool {
        self.degenerate.iter().any(|&d| d)
    }

    /// Currently selected face, if any.
    pub fn selected_face(&self) -> Option<FaceId> {
        self.selected_face
    }

    /// Select a face (or clear the selection).
    pub fn select_face(&mut self, face: Option<FaceId>) {
        self.selected_face = face;
    }

    /// Replace the current box without touching the mesh.
    pub fn set_current_box(&mut self, b: Box3) {
        self.current_box = b;
    }

    /// Replace both boxes, making `b` the new rest shape.
    pub fn set_original_box(&mut self, b: Box3) {
        self.original_box = b;
        self.current_box = b;
    }

    /// Box-local coordinates of `p` in `b`.
    pub fn coordinates_in_box(b: &Box3, p: &Point3) -> Vec3 {
        b.coordinates_of(p)
    }

    /// World position of box-local `coord` in `b`.
    pub fn position_in_box(b: &Box3, coord: &Vec3) -> Point3 {
        b.position_of(coord)
    }

    /// Vertex positions the coordinates map to inside `b`.
    pub fn positions_in(&self, b: &Box3) -> impl Iterator<Item = Point3> + '_ {
        let b = *b;
        self.coordinates
            .iter()
            .map(move |c| Self::position_in_box(&b, c))
    }

    /// Write the positions for box `b` into `mesh` and flag it dirty.
    pub fn write_positions<M>(&self, b: &Box3, mesh: &mut M) -> Result<()>
    where
        M: MeshPart + ?Sized,
    {
        let found = mesh.vertex_count();
        if found != self.coordinates.len() {
            return Err(PrimitiveError::VertexCountMismatch {
                expected: self.coordinates.len(),
                found,
            });
        }
        for (i, p) in self.positions_in(b).enumerate() {
            mesh.set_vertex_position(i, p);
        }
        mesh.mark_dirty();
        Ok(())
    }

    /// Deform the mesh by the current box.
    pub fn deform_mesh<M>(&self, mesh: &mut M) -> Result<()>
    where
        M: MeshPart + ?Sized,
    {
        self.write_positions(&self.current_box, mesh)
    }

    /// The box `params` would produce from the current box.
    pub fn deformed_box(&self, params: &DeformParams) -> Box3 {
        match params {
            DeformParams::Cuboid(p) => p.apply(&self.current_box),
        }
    }

    /// Apply a deformation to the current box and redeform the mesh.
    ///
    /// With `permanent`, the result becomes the new rest box.
    pub fn deform<M>(&mut self, params: &DeformParams, permanent: bool, mesh: &mut M) -> Result<()>
    where
        M: MeshPart + ?Sized,
    {
        self.current_box = self.deformed_box(params);
        self.deform_mesh(mesh)?;
        if permanent {
            self.original_box = self.current_box;
        }
        Ok(())
    }

    /// Shorthand for [`BoxPrimitive::deform`] with cuboid parameters.
    pub fn deform_cuboid<M>(
        &mut self,
        params: CuboidParams,
        permanent: bool,
        mesh: &mut M,
    ) -> Result<()>
    where
        M: MeshPart + ?Sized,
    {
        self.deform(&DeformParams::Cuboid(params), permanent, mesh)
    }

    /// Drop uncommitted edits and restore the rest shape.
    pub fn recover<M>(&mut self, mesh: &mut M) -> Result<()>
    where
        M: MeshPart + ?Sized,
    {
        self.current_box = self.original_box;
        self.deform_mesh(mesh)
    }

    /// Volume of the current box.
    pub fn volume(&self) -> f64 {
        self.current_box.volume()
    }

    /// Corners of the current box.
    pub fn corners(&self) -> [Point3; 8] {
        self.current_box.corners()
    }

    /// Center of the selected face of the current box.
    pub fn selected_face_center(&self) -> Option<Point3> {
        self.selected_face.map(|f| self.current_box.face_center(f))
    }

    /// Drag the selected face so its center lands on `target`.
    pub fn reshape_selected<M>(&mut self, target: Point3, mesh: &mut M) -> Result<FaceId>
    where
        M: MeshPart + ?Sized,
    {
        let face = self.selected_face.ok_or(PrimitiveError::NoFaceSelected)?;
        self.reshape_face(face, target, mesh)
    }

    /// Solve a new box whose `face` center sits at `target`.
    ///
    /// The opposite face keeps its center; the box turns so that its face
    /// axis points from that center to `target`, and stretches to reach it.
    /// The result is committed as the rest box, the face nearest `target`
    /// is selected and returned, and the mesh is redeformed.
    pub fn reshape_face<M>(&mut self, face: FaceId, target: Point3, mesh: &mut M) -> Result<FaceId>
    where
        M: MeshPart + ?Sized,
    {
        let tol = Tolerance::DEFAULT;
        let old = self.original_box;
        let opposite = face.opposite();
        let a = face.axis();

        let moved_center = old.face_center(face);
        let fixed_center = old.face_center(opposite);
        let v1 = moved_center - fixed_center;
        let v2 = target - fixed_center;

        let rotation = match rotation_axis(&v1, &v2, &tol) {
            Some(axis) => Some((axis, angle_between(&v1, &v2))),
            // Pointing straight back: half turn about a side axis
            None if v1.dot(&v2) < 0.0 => {
                Unit::try_new(old.axes[(a + 1) % 3], 0.0).map(|axis| (axis, std::f64::consts::PI))
            }
            None => None,
        };
        let rotate = |v: Vec3| match &rotation {
            Some((axis, theta)) => rotate_about_axis(&v, *theta, axis),
            None => v,
        };

        // Carry the dragged face along and read the side extents off its edges
        let new_face = old.face(face).map(|p| target + rotate(p - moved_center));
        let edges = [new_face[1] - new_face[0], new_face[2] - new_face[1]];

        let mut b = old;
        b.axes = old.axes.map(&rotate);
        b.extent[a] = v2.norm() * 0.5;
        for side in [(a + 1) % 3, (a + 2) % 3] {
            let axis = b.axes[side];
            let len = edges
                .iter()
                .map(|e| e.dot(&axis).abs())
                .fold(0.0, f64::max);
            b.extent[side] = len * 0.5;
        }
        b.center = fixed_center + v2 * 0.5;

        self.original_box = b;
        self.current_box = b;

        let nearest = FaceId::ALL
            .into_iter()
            .map(|f| (f, (b.face_center(f) - target).norm()))
            .fold(None, |best: Option<(FaceId, f64)>, (f, d)| match best {
                Some((_, bd)) if bd <= d => best,
                _ => Some((f, d)),
            })
            .map(|(f, _)| f)
            .unwrap_or(face);
        self.selected_face = Some(nearest);

        self.deform_mesh(mesh)?;
        Ok(nearest)
    }

    /// Face of the current box that a set of hot samples lies on.
    ///
    /// The hot axis is the one along which the samples spread least; the
    /// sign of the midpoint of their extent along it picks the `+` or `-`
    /// face.
    pub fn hot_face(&self, samples: &[Point3]) -> Option<FaceId> {
        if samples.is_empty() {
            return None;
        }
        let b = &self.current_box;
        let mut lo = [f64::INFINITY; 3];
        let mut hi = [f64::NEG_INFINITY; 3];
        for p in samples {
            let d = p - b.center;
            for i in 0..3 {
                let t = d.dot(&b.axes[i]);
                lo[i] = lo[i].min(t);
                hi[i] = hi[i].max(t);
            }
        }
        let axis = (0..3)
            .min_by(|&i, &j| (hi[i] - lo[i]).total_cmp(&(hi[j] - lo[j])))
            .unwrap_or(0);
        Some(FaceId::from_axis(axis, hi[axis] + lo[axis] >= 0.0))
    }

    /// [`BoxPrimitive::hot_face`], also selecting the face found.
    pub fn detect_hot_face(&mut self, samples: &[Point3]) -> Option<FaceId> {
        let face = self.hot_face(samples)?;
        self.selected_face = Some(face);
        Some(face)
    }
}

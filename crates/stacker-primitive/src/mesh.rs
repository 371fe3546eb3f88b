//! Mesh parts deformed by box primitives.
//!
//! [`MeshPart`] is the seam a primitive writes through. [`PartMesh`] is
//! an indexed triangle mesh for one part, and [`SegMesh`] is an object
//! made of several parts with global vertex/face numbering.

use stacker_math::{Aabb3, Point3, Vec3};

/// Vertex access a box primitive needs from a mesh part.
pub trait MeshPart {
    /// Number of vertices.
    fn vertex_count(&self) -> usize;

    /// Position of vertex `index`.
    fn vertex_position(&self, index: usize) -> Point3;

    /// Overwrite the position of vertex `index`.
    fn set_vertex_position(&mut self, index: usize, p: Point3);

    /// Called after positions changed; normals and bounds are stale.
    fn mark_dirty(&mut self);

    /// All vertex positions in index order.
    fn vertex_positions(&self) -> Vec<Point3> {
        (0..self.vertex_count())
            .map(|i| self.vertex_position(i))
            .collect()
    }
}

/// Indexed triangle mesh for a single part.
#[derive(Debug, Clone, Default)]
pub struct PartMesh {
    /// Part name.
    pub name: String,
    positions: Vec<Point3>,
    triangles: Vec<[u32; 3]>,
    normals: Vec<Vec3>,
    bounds: Aabb3,
    dirty: bool,
}

impl PartMesh {
    /// Create a part and compute its normals and bounds.
    pub fn new(name: impl Into<String>, positions: Vec<Point3>, triangles: Vec<[u32; 3]>) -> Self {
        let mut mesh = Self {
            name: name.into(),
            positions,
            triangles,
            normals: Vec::new(),
            bounds: Aabb3::empty(),
            dirty: true,
        };
        mesh.update();
        mesh
    }

    /// Closed box mesh (8 vertices, 12 triangles) with the given center and half-sizes.
    pub fn cuboid(name: impl Into<String>, center: Point3, half: [f64; 3]) -> Self {
        let [hx, hy, hz] = half;
        let positions = vec![
            center + Vec3::new(-hx, -hy, -hz),
            center + Vec3::new(hx, -hy, -hz),
            center + Vec3::new(hx, hy, -hz),
            center + Vec3::new(-hx, hy, -hz),
            center + Vec3::new(-hx, -hy, hz),
            center + Vec3::new(hx, -hy, hz),
            center + Vec3::new(hx, hy, hz),
            center + Vec3::new(-hx, hy, hz),
        ];
        #[rustfmt::skip]
        let triangles = vec![
            [0, 2, 1], [0, 3, 2],
            [4, 5, 6], [4, 6, 7],
            [0, 1, 5], [0, 5, 4],
            [2, 3, 7], [2, 7, 6],
            [0, 4, 7], [0, 7, 3],
            [1, 2, 6], [1, 6, 5],
        ];
        Self::new(name, positions, triangles)
    }

    /// Vertex positions.
    pub fn positions(&self) -> &[Point3] {
        &self.positions
    }

    /// Triangle vertex indices.
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Per-vertex normals (valid after [`PartMesh::update`]).
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Bounds as of the last [`PartMesh::update`].
    pub fn bounds(&self) -> Aabb3 {
        self.bounds
    }

    /// Number of triangles.
    pub fn face_count(&self) -> usize {
        self.triangles.len()
    }

    /// True if positions changed since the last update.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The three corner positions of triangle `f`.
    pub fn face_points(&self, f: usize) -> [Point3; 3] {
        self.triangles[f].map(|i| self.positions[i as usize])
    }

    /// Centroid of triangle `f`.
    pub fn face_center(&self, f: usize) -> Point3 {
        let [a, b, c] = self.face_points(f);
        Point3::from((a.coords + b.coords + c.coords) / 3.0)
    }

    /// Translate every vertex.
    pub fn translate(&mut self, t: &Vec3) {
        for p in &mut self.positions {
            *p += *t;
        }
        self.dirty = true;
    }

    /// Scale every vertex about the origin.
    pub fn scale(&mut self, s: f64) {
        for p in &mut self.positions {
            *p = Point3::from(p.coords * s);
        }
        self.dirty = true;
    }

    /// Recompute normals and bounds if positions changed.
    pub fn update(&mut self) {
        if !self.dirty {
            return;
        }
        self.bounds = Aabb3::from_points(&self.positions);
        self.normals = vertex_normals(&self.positions, &self.triangles);
        self.dirty = false;
    }
}

impl MeshPart for PartMesh {
    fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn vertex_position(&self, index: usize) -> Point3 {
        self.positions[index]
    }

    fn set_vertex_position(&mut self, index: usize, p: Point3) {
        self.positions[index] = p;
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn vertex_positions(&self) -> Vec<Point3> {
        self.positions.clone()
    }
}

/// Area-weighted vertex normals.
fn vertex_normals(positions: &[Point3], triangles: &[[u32; 3]]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::zeros(); positions.len()];
    for tri in triangles {
        let [a, b, c] = tri.map(|i| positions[i as usize]);
        // Cross product length is twice the area, which gives the weighting
        let n = (b - a).cross(&(c - a));
        for &i in tri {
            normals[i as usize] += n;
        }
    }
    for n in &mut normals {
        let len = n.norm();
        if len > 0.0 {
            *n /= len;
        }
    }
    normals
}

/// A mesh object split into parts.
#[derive(Debug, Clone, Default)]
pub struct SegMesh {
    /// Object name.
    pub name: String,
    segments: Vec<PartMesh>,
    bounds: Aabb3,
}

impl SegMesh {
    /// Build an object from its parts.
    pub fn new(name: impl Into<String>, segments: Vec<PartMesh>) -> Self {
        let mut mesh = Self {
            name: name.into(),
            segments,
            bounds: Aabb3::empty(),
        };
        mesh.update();
        mesh
    }

    /// Number of parts.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// All parts.
    pub fn segments(&self) -> &[PartMesh] {
        &self.segments
    }

    /// All parts, mutably.
    pub fn segments_mut(&mut self) -> &mut [PartMesh] {
        &mut self.segments
    }

    /// Part `i`.
    pub fn segment(&self, i: usize) -> Option<&PartMesh> {
        self.segments.get(i)
    }

    /// Part `i`, mutably.
    pub fn segment_mut(&mut self, i: usize) -> Option<&mut PartMesh> {
        self.segments.get_mut(i)
    }

    /// Total vertex count over all parts.
    pub fn vertex_count(&self) -> usize {
        self.segments.iter().map(|s| s.vertex_count()).sum()
    }

    /// Total triangle count over all parts.
    pub fn face_count(&self) -> usize {
        self.segments.iter().map(PartMesh::face_count).sum()
    }

    /// Split a global vertex index into `(segment, local index)`.
    pub fn global_to_local_vertex(&self, vid: usize) -> Option<(usize, usize)> {
        global_to_local(vid, self.segments.iter().map(|s| s.vertex_count()))
    }

    /// Split a global face index into `(segment, local index)`.
    pub fn global_to_local_face(&self, fid: usize) -> Option<(usize, usize)> {
        global_to_local(fid, self.segments.iter().map(PartMesh::face_count))
    }

    /// Position of a vertex by global index.
    pub fn vertex_position(&self, vid: usize) -> Option<Point3> {
        let (s, v) = self.global_to_local_vertex(vid)?;
        Some(self.segments[s].vertex_position(v))
    }

    /// Global vertex indices of a face given by global index.
    pub fn vertex_indices_around_face(&self, fid: usize) -> Option<[usize; 3]> {
        let (s, f) = self.global_to_local_face(fid)?;
        let offset: usize = self.segments[..s].iter().map(|p| p.vertex_count()).sum();
        Some(self.segments[s].triangles()[f].map(|i| offset + i as usize))
    }

    /// Bounds as of the last [`SegMesh::update`].
    pub fn bounds(&self) -> Aabb3 {
        self.bounds
    }

    /// Bounds computed from the current positions, ignoring cached state.
    pub fn current_bounds(&self) -> Aabb3 {
        let mut bounds = Aabb3::empty();
        for s in &self.segments {
            bounds.include(&Aabb3::from_points(s.positions()));
        }
        bounds
    }

    /// Iterate over every triangle of every part as `(segment, corners)`.
    pub fn triangles(&self) -> impl Iterator<Item = (usize, [Point3; 3])> + '_ {
        self.segments.iter().enumerate().flat_map(|(s, part)| {
            (0..part.face_count()).map(move |f| (s, part.face_points(f)))
        })
    }

    /// Translate the object so its bounds are centered at the origin.
    ///
    /// Returns the translation applied.
    pub fn move_center_to_origin(&mut self) -> Vec3 {
        let t = -self.current_bounds().center().coords;
        for s in &mut self.segments {
            s.translate(&t);
        }
        self.update();
        t
    }

    /// Refresh every dirty part and the object bounds.
    pub fn update(&mut self) {
        let mut bounds = Aabb3::empty();
        for s in &mut self.segments {
            s.update();
            bounds.include(&s.bounds());
        }
        self.bounds = bounds;
    }
}

fn global_to_local(index: usize, counts: impl Iterator<Item = usize>) -> Option<(usize, usize)> {
    let mut remaining = index;
    for (s, count) in counts.enumerate() {
        if remaining < count {
            return Some((s, remaining));
        }
        remaining -= count;
    }
    None
}

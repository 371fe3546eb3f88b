//! Serializable records for boxes, primitive sets and meshes.
//!
//! Records use plain arrays so the JSON stays readable and independent of
//! nalgebra's serialization format.

use serde::{Deserialize, Serialize};
use stacker_math::{Point3, Vec3};

use crate::box3::Box3;
use crate::error::PrimitiveError;
use crate::mesh::{PartMesh, SegMesh};

/// A saved [`Box3`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxRecord {
    /// Box center.
    pub center: [f64; 3],
    /// The three box axes.
    pub axes: [[f64; 3]; 3],
    /// Half-extents.
    pub extent: [f64; 3],
}

impl BoxRecord {
    /// Rebuild the box, moved by `translation` and then scaled about the origin.
    ///
    /// Axes are unchanged; the result is made right-handed like a fitted box.
    pub fn to_box_anchored(&self, translation: &Vec3, scale: f64) -> Box3 {
        let center = (Point3::from(self.center) + translation) * scale;
        let extent = self.extent.map(|e| e * scale);
        Box3::new(center, self.axes.map(Vec3::from), extent)
    }

    /// Rebuild the box as saved.
    pub fn to_box(&self) -> Box3 {
        self.to_box_anchored(&Vec3::zeros(), 1.0)
    }
}

impl From<&Box3> for BoxRecord {
    fn from(b: &Box3) -> Self {
        Self {
            center: b.center.coords.into(),
            axes: b.axes.map(Into::into),
            extent: b.extent,
        }
    }
}

/// Saved boxes of every part together with the placement of the mesh they
/// were saved against.
///
/// Loading maps each box back onto the current mesh with
/// `center' = (center + translation) * scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerRecord {
    /// Offset added to every saved center.
    pub translation: [f64; 3],
    /// Uniform factor applied after the offset.
    pub scale: f64,
    /// One box per part, in part order.
    pub parts: Vec<BoxRecord>,
}

impl ControllerRecord {
    /// Record `boxes` with an identity placement.
    pub fn new<'a>(boxes: impl IntoIterator<Item = &'a Box3>) -> Self {
        Self {
            translation: [0.0; 3],
            scale: 1.0,
            parts: boxes.into_iter().map(BoxRecord::from).collect(),
        }
    }

    /// The boxes re-anchored by this record's placement.
    pub fn boxes(&self) -> Vec<Box3> {
        let t = Vec3::from(self.translation);
        self.parts
            .iter()
            .map(|r| r.to_box_anchored(&t, self.scale))
            .collect()
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// One saved mesh part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartRecord {
    /// Part name.
    #[serde(default)]
    pub name: String,
    /// Vertex positions.
    pub positions: Vec<[f64; 3]>,
    /// Triangle vertex indices.
    pub triangles: Vec<[u32; 3]>,
}

/// A saved multi-part mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    /// Object name.
    #[serde(default)]
    pub name: String,
    /// Parts in order.
    pub parts: Vec<PartRecord>,
}

impl SceneRecord {
    /// Build the mesh this record describes.
    ///
    /// Fails if a triangle indexes past its part's vertices.
    pub fn to_seg_mesh(&self) -> Result<SegMesh, PrimitiveError> {
        let parts = self
            .parts
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let vertex_count = p.positions.len();
                if let Some(t) = p
                    .triangles
                    .iter()
                    .position(|tri| tri.iter().any(|&v| v as usize >= vertex_count))
                {
                    return Err(PrimitiveError::TriangleIndexOutOfRange {
                        part: i,
                        triangle: t,
                        vertex_count,
                    });
                }
                Ok(PartMesh::new(
                    p.name.clone(),
                    p.positions.iter().copied().map(Point3::from).collect(),
                    p.triangles.clone(),
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SegMesh::new(self.name.clone(), parts))
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<&SegMesh> for SceneRecord {
    fn from(mesh: &SegMesh) -> Self {
        Self {
            name: mesh.name.clone(),
            parts: mesh
                .segments()
                .iter()
                .map(|s| PartRecord {
                    name: s.name.clone(),
                    positions: s.positions().iter().map(|p| p.coords.into()).collect(),
                    triangles: s.triangles().to_vec(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_controller_record_json() {
        let a = Box3::axis_aligned(Point3::new(1.0, 0.0, 0.0), [1.0, 2.0, 3.0]);
        let mut b = Box3::axis_aligned(Point3::origin(), [0.5, 0.5, 0.5]);
        b.rotate_local(&Vec3::new(0.0, 0.0, 45.0));
        let record = ControllerRecord::new([&a, &b]);

        let json = record.to_json().expect("serialize");
        let back = ControllerRecord::from_json(&json).expect("deserialize");
        assert_eq!(back.parts.len(), 2);
        assert_eq!(back.parts[0], record.parts[0]);

        let boxes = back.boxes();
        assert_eq!(boxes[0], a);
        assert!(boxes[1].parameter_distance(&b) < 1e-12);
    }

    #[test]
    fn test_reanchor() {
        let b = Box3::axis_aligned(Point3::new(1.0, 2.0, 3.0), [1.0, 1.0, 2.0]);
        let record = ControllerRecord {
            translation: [1.0, 0.0, -1.0],
            scale: 2.0,
            parts: vec![BoxRecord::from(&b)],
        };
        let loaded = record.boxes()[0];
        assert_eq!(loaded.center, Point3::new(4.0, 4.0, 4.0));
        assert_eq!(loaded.extent, [2.0, 2.0, 4.0]);
        assert_eq!(loaded.axes, b.axes);
    }

    #[test]
    fn test_left_handed_record_is_fixed() {
        let record = BoxRecord {
            center: [0.0; 3],
            axes: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]],
            extent: [1.0; 3],
        };
        assert!(record.to_box().is_right_handed());
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(ControllerRecord::from_json("{\"parts\": 3}").is_err());
    }

    #[test]
    fn test_scene_record() {
        let mesh = SegMesh::new(
            "pair",
            vec![
                PartMesh::cuboid("a", Point3::origin(), [1.0, 1.0, 1.0]),
                PartMesh::cuboid("b", Point3::new(0.0, 0.0, 2.0), [0.5, 0.5, 0.5]),
            ],
        );
        let record = SceneRecord::from(&mesh);
        let json = record.to_json().expect("serialize");
        let rebuilt = SceneRecord::from_json(&json)
            .expect("deserialize")
            .to_seg_mesh()
            .expect("valid scene");
        assert_eq!(rebuilt.segment_count(), 2);
        assert_eq!(rebuilt.vertex_count(), 16);
        assert_eq!(rebuilt.segment(1).map(|s| s.name.as_str()), Some("b"));
        assert_relative_eq!(rebuilt.bounds().max.z, 2.5);
    }

    #[test]
    fn test_scene_name_defaults() {
        let json = r#"{"parts": [{"positions": [[0,0,0],[1,0,0],[0,1,0]], "triangles": [[0,1,2]]}]}"#;
        let mesh = SceneRecord::from_json(json)
            .expect("deserialize")
            .to_seg_mesh()
            .expect("valid scene");
        assert_eq!(mesh.name, "");
        assert_eq!(mesh.face_count(), 1);
    }

    #[test]
    fn test_scene_with_dangling_index_is_an_error() {
        let json = r#"{"parts": [
            {"name": "ok", "positions": [[0,0,0],[1,0,0],[0,1,0]], "triangles": [[0,1,2]]},
            {"name": "bad", "positions": [[0,0,0],[1,0,0],[0,1,0]], "triangles": [[0,1,2],[2,1,3]]}
        ]}"#;
        let record = SceneRecord::from_json(json).expect("deserialize");
        assert!(matches!(
            record.to_seg_mesh(),
            Err(PrimitiveError::TriangleIndexOutOfRange {
                part: 1,
                triangle: 1,
                vertex_count: 3
            })
        ));
    }
}

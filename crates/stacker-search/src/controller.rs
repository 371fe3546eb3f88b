//! A multi-part mesh together with one box primitive per part.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stacker_math::{Aabb3, Vec3};
use stacker_primitive::{
    Box3, BoxPrimitive, ControllerRecord, DeformParams, ObbFitter, PartMesh, SegMesh,
};
use tracing::debug;

use crate::error::{Result, SearchError};
use crate::state::{PartId, ShapeState};

/// How far the current shape is from the fitted one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Distortion {
    /// Relative change of the total box volume.
    pub volume: f64,
    /// Change of the bounding box size relative to its original diagonal.
    pub bounding_box: f64,
}

/// Owns the live mesh and the primitive driving each of its parts.
#[derive(Debug, Clone)]
pub struct Controller {
    mesh: SegMesh,
    primitives: Vec<BoxPrimitive>,
    fitted_volume: f64,
    fitted_bounds: Aabb3,
}

impl Controller {
    /// Fit one primitive per part with `fitter`.
    pub fn fit<F>(mut mesh: SegMesh, fitter: &F) -> Result<Self>
    where
        F: ObbFitter + ?Sized,
    {
        mesh.update();
        let primitives = mesh
            .segments()
            .iter()
            .map(|s| BoxPrimitive::fit(s, fitter))
            .collect::<stacker_primitive::Result<Vec<_>>>()?;
        debug!(parts = primitives.len(), "Fitted part primitives");
        Ok(Self::with_primitives(mesh, primitives))
    }

    /// Restore primitives from a saved record instead of fitting.
    ///
    /// Each saved box is re-anchored by the record's placement, then the
    /// part coordinates are computed against it as for a fitted box.
    pub fn from_record(mut mesh: SegMesh, record: &ControllerRecord) -> Result<Self> {
        mesh.update();
        let boxes = record.boxes();
        if boxes.len() != mesh.segment_count() {
            return Err(SearchError::PartCountMismatch {
                expected: mesh.segment_count(),
                found: boxes.len(),
            });
        }
        let primitives = mesh
            .segments()
            .iter()
            .zip(boxes)
            .map(|(s, b)| BoxPrimitive::from_box(s, b))
            .collect::<stacker_primitive::Result<Vec<_>>>()?;
        Ok(Self::with_primitives(mesh, primitives))
    }

    /// Parse a JSON record and restore from it.
    pub fn unserialize(mesh: SegMesh, json: &str) -> Result<Self> {
        let record = ControllerRecord::from_json(json)?;
        Self::from_record(mesh, &record)
    }

    fn with_primitives(mesh: SegMesh, primitives: Vec<BoxPrimitive>) -> Self {
        let fitted_volume = primitives.iter().map(BoxPrimitive::volume).sum();
        let fitted_bounds = mesh.bounds();
        Self {
            mesh,
            primitives,
            fitted_volume,
            fitted_bounds,
        }
    }

    /// The live mesh.
    pub fn mesh(&self) -> &SegMesh {
        &self.mesh
    }

    /// Give up the primitives and keep the mesh.
    pub fn into_mesh(self) -> SegMesh {
        self.mesh
    }

    /// Number of parts.
    pub fn part_count(&self) -> usize {
        self.primitives.len()
    }

    /// Ids of every part in order.
    pub fn part_ids(&self) -> impl Iterator<Item = PartId> {
        (0..self.primitives.len()).map(PartId)
    }

    /// Primitive of one part.
    pub fn primitive(&self, part: PartId) -> Result<&BoxPrimitive> {
        self.primitives
            .get(part.0)
            .ok_or(SearchError::MissingPart(part))
    }

    /// Bounds of the mesh as it was when the primitives were set up.
    pub fn fitted_bounds(&self) -> Aabb3 {
        self.fitted_bounds
    }

    /// Current box of every part.
    pub fn snapshot(&self) -> BTreeMap<PartId, Box3> {
        self.part_ids()
            .zip(self.primitives.iter().map(|p| *p.current_box()))
            .collect()
    }

    /// Deform one part and refresh the mesh.
    pub fn deform_part(
        &mut self,
        part: PartId,
        params: &DeformParams,
        permanent: bool,
    ) -> Result<()> {
        let (prim, seg) = self.part_mut(part)?;
        prim.deform(params, permanent, seg)?;
        self.mesh.update();
        Ok(())
    }

    /// Set the current box of the listed parts and redeform them.
    ///
    /// Parts not in `boxes` keep their shape.
    pub fn apply_boxes(&mut self, boxes: &BTreeMap<PartId, Box3>) -> Result<()> {
        for (&part, b) in boxes {
            let (prim, seg) = self.part_mut(part)?;
            if prim.current_box() == b {
                continue;
            }
            prim.set_current_box(*b);
            prim.deform_mesh(seg)?;
        }
        self.mesh.update();
        Ok(())
    }

    /// Make a search state the live configuration.
    pub fn apply_state(&mut self, state: &ShapeState) -> Result<()> {
        self.apply_boxes(state.boxes())
    }

    /// Return every part to its rest box.
    pub fn recover(&mut self) -> Result<()> {
        for (prim, seg) in self.primitives.iter_mut().zip(self.mesh.segments_mut()) {
            prim.recover(seg)?;
        }
        self.mesh.update();
        Ok(())
    }

    /// Volume and bounding-box distortion of the current shape.
    pub fn distortion(&self) -> Distortion {
        let volume: f64 = self.primitives.iter().map(BoxPrimitive::volume).sum();
        let volume = if self.fitted_volume > 0.0 {
            (volume - self.fitted_volume).abs() / self.fitted_volume
        } else {
            0.0
        };

        let diagonal = self.fitted_bounds.diagonal();
        let change: Vec3 = self.mesh.current_bounds().size() - self.fitted_bounds.size();
        let bounding_box = if diagonal > 0.0 {
            change.norm() / diagonal
        } else {
            0.0
        };
        Distortion {
            volume,
            bounding_box,
        }
    }

    /// Current boxes with an identity placement.
    pub fn to_record(&self) -> ControllerRecord {
        ControllerRecord::new(self.primitives.iter().map(BoxPrimitive::current_box))
    }

    /// Current boxes as JSON.
    pub fn serialize(&self) -> Result<String> {
        Ok(self.to_record().to_json()?)
    }

    fn part_mut(&mut self, part: PartId) -> Result<(&mut BoxPrimitive, &mut PartMesh)> {
        let prim = self
            .primitives
            .get_mut(part.0)
            .ok_or(SearchError::MissingPart(part))?;
        let seg = self
            .mesh
            .segment_mut(part.0)
            .ok_or(SearchError::MissingPart(part))?;
        Ok((prim, seg))
    }
}

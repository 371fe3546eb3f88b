#![warn(missing_docs)]

//! Box primitives for part-wise mesh deformation.
//!
//! A [`BoxPrimitive`] fits an oriented box to one mesh part and stores every
//! vertex as box-local coordinates. Deforming the box (translate, rotate
//! about its own axes, scale its extents, or drag a single face) then
//! deforms the part. [`SegMesh`] holds a multi-part object, [`ObbFitter`]
//! abstracts box fitting and the `record` types persist boxes and meshes
//! as JSON.

mod box3;
mod cuboid;
mod error;
mod mesh;
mod obb;
mod params;
mod record;

pub use box3::{Box3, FaceId};
pub use cuboid::BoxPrimitive;
pub use error::{PrimitiveError, Result};
pub use mesh::{MeshPart, PartMesh, SegMesh};
pub use obb::{AxisAlignedFitter, ObbFitter, PcaObbFitter};
pub use params::{CuboidParams, DeformParams};
pub use record::{BoxRecord, ControllerRecord, PartRecord, SceneRecord};

//! Contact regions that limit stackability.

use stacker_math::Point3;
use stacker_primitive::FaceId;

use crate::state::PartId;

/// Which surface of the object a hot spot sits on when copies are stacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HotSide {
    /// Top surface, touched by the copy above.
    Upper,
    /// Bottom surface, resting on the copy below.
    Lower,
}

/// A region of one part flagged as limiting stackability.
#[derive(Debug, Clone, PartialEq)]
pub struct HotSpot {
    /// Part the samples lie on.
    pub part: PartId,
    /// Box face nearest the samples.
    pub face: FaceId,
    /// Surface the contact is on.
    pub side: HotSide,
    /// Contact points.
    pub samples: Vec<Point3>,
}

impl HotSpot {
    /// The faces a search step may push or pull: the hot face and its opposite.
    pub fn sides(&self) -> [FaceId; 2] {
        [self.face, self.face.opposite()]
    }
}

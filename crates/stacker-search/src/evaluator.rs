//! Seams to the stackability evaluator and hot-spot detection.

use stacker_primitive::SegMesh;

use crate::controller::Controller;
use crate::hotspot::HotSpot;

/// Scores of one mesh configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Evaluation {
    /// How well the shape nests with copies of itself; 1 is perfect.
    pub stackability: f64,
    /// How far the bounds moved from the reference bounds, relative to their size.
    pub bb_deviation: f64,
}

/// Measures how well a mesh stacks.
pub trait StackabilityEvaluator: Sync {
    /// Score `mesh`.
    fn evaluate(&self, mesh: &SegMesh) -> Evaluation;
}

/// Finds the regions that limit stackability.
pub trait HotSpotProvider: Sync {
    /// Hot spots of `mesh`, whose parts are driven by `controller`.
    fn hot_spots(&self, controller: &Controller, mesh: &SegMesh) -> Vec<HotSpot>;
}

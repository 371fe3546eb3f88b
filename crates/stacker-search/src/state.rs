//! Candidate configurations explored by the search.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use stacker_primitive::Box3;

use crate::evaluator::Evaluation;

/// Index of a part within a [`crate::Controller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartId(pub usize);

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part {}", self.0)
    }
}

/// One box per part plus the scores the configuration earned.
///
/// States are immutable. `energy` is fixed at construction, so a state's
/// place in the search queue never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeState {
    boxes: BTreeMap<PartId, Box3>,
    stackability: f64,
    bb_deviation: f64,
    energy: f64,
}

impl ShapeState {
    /// Score `boxes` against `target` stackability.
    pub fn new(boxes: BTreeMap<PartId, Box3>, evaluation: Evaluation, target: f64) -> Self {
        let energy = (target - evaluation.stackability).abs();
        Self {
            boxes,
            stackability: evaluation.stackability,
            bb_deviation: evaluation.bb_deviation,
            energy: if energy.is_nan() { f64::INFINITY } else { energy },
        }
    }

    /// Box of every part.
    pub fn boxes(&self) -> &BTreeMap<PartId, Box3> {
        &self.boxes
    }

    /// Box of one part.
    pub fn box_of(&self, part: PartId) -> Option<&Box3> {
        self.boxes.get(&part)
    }

    /// Stackability the evaluator reported.
    pub fn stackability(&self) -> f64 {
        self.stackability
    }

    /// Bounding-box deviation the evaluator reported.
    pub fn bb_deviation(&self) -> f64 {
        self.bb_deviation
    }

    /// Distance of the stackability from the target; lower is better.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Sum of per-part box distances. States over different parts are
    /// infinitely far apart.
    pub fn distance(&self, other: &ShapeState) -> f64 {
        if self.boxes.len() != other.boxes.len() {
            return f64::INFINITY;
        }
        let mut d = 0.0;
        for (id, b) in &self.boxes {
            match other.boxes.get(id) {
                Some(o) => d += b.parameter_distance(o),
                None => return f64::INFINITY,
            }
        }
        d
    }
}

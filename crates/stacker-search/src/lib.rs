#![warn(missing_docs)]

//! Best-first search for more stackable shapes.
//!
//! A [`Controller`] owns a multi-part mesh and one box primitive per part.
//! The [`Improver`] explores small box edits around the faces a
//! [`HotSpotProvider`] blames for poor nesting, scoring each edit with a
//! [`StackabilityEvaluator`]. [`StackerDriver`] runs a search and commits
//! the best result. [`HeightfieldEvaluator`] is the built-in scorer for
//! stacking along +Z.

mod controller;
mod driver;
mod error;
mod evaluator;
mod heightfield;
mod hotspot;
mod improver;
mod settings;
mod state;

pub use controller::{Controller, Distortion};
pub use driver::{ReportSummary, StackerDriver, StackerReport};
pub use error::{Result, SearchError};
pub use evaluator::{Evaluation, HotSpotProvider, StackabilityEvaluator};
pub use heightfield::{Heightfield, HeightfieldEvaluator, Hit};
pub use hotspot::{HotSide, HotSpot};
pub use improver::{Improver, SearchOutcome, Termination};
pub use settings::{HeightfieldSettings, ImproverSettings, StackerConfig};
pub use state::{PartId, ShapeState};

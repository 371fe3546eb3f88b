//! Runs a search and commits its best result into the live controller.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::controller::{Controller, Distortion};
use crate::error::Result;
use crate::evaluator::{HotSpotProvider, StackabilityEvaluator};
use crate::improver::{Improver, SearchOutcome, Termination};
use crate::settings::ImproverSettings;

/// Summary of one driver run.
#[derive(Debug, Clone)]
pub struct StackerReport {
    /// Stackability before the search.
    pub original_stackability: f64,
    /// Stackability of the configuration left in the controller.
    pub final_stackability: f64,
    /// Full search result.
    pub outcome: SearchOutcome,
    /// Distortion of the configuration left in the controller.
    pub distortion: Distortion,
}

impl StackerReport {
    /// The serializable part of the report.
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            original_stackability: self.original_stackability,
            final_stackability: self.final_stackability,
            solutions: self.outcome.solutions.len(),
            expansions: self.outcome.expansions,
            termination: self.outcome.termination,
            distortion: self.distortion,
        }
    }
}

/// Flat report for printing or saving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Stackability before the search.
    pub original_stackability: f64,
    /// Stackability after committing the best solution.
    pub final_stackability: f64,
    /// Solutions found.
    pub solutions: usize,
    /// Expansions performed.
    pub expansions: usize,
    /// Why the search stopped.
    pub termination: Termination,
    /// Distortion after committing.
    pub distortion: Distortion,
}

/// Computes the offset, improves it and applies the best solution.
pub struct StackerDriver<'a> {
    evaluator: &'a dyn StackabilityEvaluator,
    hot_spots: &'a dyn HotSpotProvider,
    settings: ImproverSettings,
}

impl<'a> StackerDriver<'a> {
    /// Driver using `evaluator` for scores and `hot_spots` for search seeds.
    pub fn new(
        evaluator: &'a dyn StackabilityEvaluator,
        hot_spots: &'a dyn HotSpotProvider,
        settings: ImproverSettings,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            evaluator,
            hot_spots,
            settings,
        })
    }

    /// Stackability of the controller's current shape.
    pub fn offset(&self, controller: &Controller) -> f64 {
        self.evaluator.evaluate(controller.mesh()).stackability
    }

    /// Search from the controller's current shape and commit the best solution.
    ///
    /// The controller is left unchanged when no solution is found.
    pub fn run(&self, controller: &mut Controller, level: Option<usize>) -> Result<StackerReport> {
        let improver = Improver::new(
            controller,
            self.evaluator,
            self.hot_spots,
            self.settings.clone(),
        )?;
        let outcome = improver.execute(level)?;
        let original_stackability = match outcome.original_stackability {
            Some(s) => s,
            None => self.offset(controller),
        };
        info!(stackability = original_stackability, "Initial stackability");

        match outcome.best() {
            Some(best) => {
                controller.apply_state(best)?;
                info!(
                    stackability = best.stackability(),
                    energy = best.energy(),
                    "Applied best solution"
                );
            }
            None => warn!(termination = ?outcome.termination, "No solution found"),
        }

        let final_stackability = self.offset(controller);
        Ok(StackerReport {
            original_stackability,
            final_stackability,
            distortion: controller.distortion(),
            outcome,
        })
    }
}

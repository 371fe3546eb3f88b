//! Search and evaluator settings, loadable from TOML.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

/// Parameters of the best-first improver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImproverSettings {
    /// Stop once this many solutions are found. Zero returns at once.
    pub num_expected_solutions: usize,
    /// Largest allowed bounding-box overflow, relative to the original size.
    pub bb_tolerance: f64,
    /// Stackability a state must reach to count as a solution.
    pub target_stackability: f64,
    /// Number of sampling rings around the current box.
    pub local_radius: u32,
    /// Ring spacing as a fraction of the box extent on the moved axis.
    pub step_fraction: f64,
    /// Minimum state distance, relative to the bounds diagonal, for two
    /// states to count as different.
    pub uniqueness_threshold: f64,
    /// Wall-clock budget in seconds, checked between expansions.
    pub time_budget_secs: Option<f64>,
    /// Evaluate the candidates of one expansion in parallel.
    pub parallel: bool,
}

impl Default for ImproverSettings {
    fn default() -> Self {
        Self {
            num_expected_solutions: 10,
            bb_tolerance: 0.1,
            target_stackability: 0.9,
            local_radius: 2,
            step_fraction: 0.1,
            uniqueness_threshold: 0.01,
            time_budget_secs: Some(60.0),
            parallel: true,
        }
    }
}

impl ImproverSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.bb_tolerance.is_nan() || self.bb_tolerance < 0.0 {
            return Err(SearchError::InvalidSettings(
                "bb_tolerance must be non-negative".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.target_stackability) {
            return Err(SearchError::InvalidSettings(
                "target_stackability must be between 0 and 1".into(),
            ));
        }
        if self.local_radius == 0 {
            return Err(SearchError::InvalidSettings(
                "local_radius must be at least 1".into(),
            ));
        }
        if self.step_fraction.is_nan() || self.step_fraction <= 0.0 {
            return Err(SearchError::InvalidSettings(
                "step_fraction must be positive".into(),
            ));
        }
        if self.uniqueness_threshold.is_nan() || self.uniqueness_threshold < 0.0 {
            return Err(SearchError::InvalidSettings(
                "uniqueness_threshold must be non-negative".into(),
            ));
        }
        if let Some(t) = self.time_budget_secs {
            if t <= 0.0 || Duration::try_from_secs_f64(t).is_err() {
                return Err(SearchError::InvalidSettings(
                    "time_budget_secs must be positive and finite".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Parameters of the heightfield stackability evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightfieldSettings {
    /// Grid cells along each of X and Y.
    pub resolution: usize,
    /// Cells whose offset is within this fraction of the object height
    /// of the maximum are hot.
    pub hot_tolerance: f64,
}

impl Default for HeightfieldSettings {
    fn default() -> Self {
        Self {
            resolution: 64,
            hot_tolerance: 0.02,
        }
    }
}

impl HeightfieldSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.resolution < 2 || self.resolution > 4096 {
            return Err(SearchError::InvalidSettings(
                "resolution must be between 2 and 4096".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.hot_tolerance) {
            return Err(SearchError::InvalidSettings(
                "hot_tolerance must be between 0 and 1".into(),
            ));
        }
        Ok(())
    }
}

/// Complete configuration of a stacking run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackerConfig {
    /// Search parameters.
    pub improver: ImproverSettings,
    /// Evaluator parameters.
    pub heightfield: HeightfieldSettings,
}

impl StackerConfig {
    /// Parse and validate a TOML config. Missing keys take their defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.improver.validate()?;
        self.heightfield.validate()
    }
}

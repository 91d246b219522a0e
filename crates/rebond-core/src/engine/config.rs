use crate::core::elements::CovalentRadii;
use thiserror::Error;

/// Bond tolerance (Å) used when none is configured.
pub const DEFAULT_BOND_TOLERANCE: f64 = 0.45;
/// Minimum bond distance (Å) used when none is configured.
pub const DEFAULT_MIN_BOND_DISTANCE: f64 = 0.4;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

/// Geometric parameters of the bond decision rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RebondConfig {
    /// Slack in Å added to the sum of two covalent radii.
    pub bond_tolerance: f64,
    /// Distance in Å below which two atoms are never bonded.
    pub min_bond_distance: f64,
}

impl Default for RebondConfig {
    fn default() -> Self {
        Self {
            bond_tolerance: DEFAULT_BOND_TOLERANCE,
            min_bond_distance: DEFAULT_MIN_BOND_DISTANCE,
        }
    }
}

/// Settings for the high-level rebonding workflow.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkflowConfig {
    pub rebond: RebondConfig,
    /// Radius table used to type atoms before rebonding.
    pub radii: CovalentRadii,
    /// Replace covalent radii that are already set instead of only filling missing ones.
    pub overwrite_radii: bool,
}

#[derive(Default)]
pub struct RebondConfigBuilder {
    bond_tolerance: Option<f64>,
    min_bond_distance: Option<f64>,
}

impl RebondConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bond_tolerance(mut self, tolerance: f64) -> Self {
        self.bond_tolerance = Some(tolerance);
        self
    }

    pub fn min_bond_distance(mut self, distance: f64) -> Self {
        self.min_bond_distance = Some(distance);
        self
    }

    pub fn build(self) -> Result<RebondConfig, ConfigError> {
        let bond_tolerance = self
            .bond_tolerance
            .ok_or(ConfigError::MissingParameter("bond_tolerance"))?;
        let min_bond_distance = self
            .min_bond_distance
            .ok_or(ConfigError::MissingParameter("min_bond_distance"))?;

        check_non_negative("bond_tolerance", bond_tolerance)?;
        check_non_negative("min_bond_distance", min_bond_distance)?;

        Ok(RebondConfig {
            bond_tolerance,
            min_bond_distance,
        })
    }
}

fn check_non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::InvalidParameter {
            name,
            value,
            reason: "must be finite",
        });
    }
    if value < 0.0 {
        return Err(ConfigError::InvalidParameter {
            name,
            value,
            reason: "must not be negative",
        });
    }
    Ok(())
}

//! Core shared types for `threshold` (pure, no I/O).
// threshold/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ParameterError;

// ----- units: speed in mph at the API, lengths in ft / in, accel in ft/s² -----
pub const GRAVITY: f64 = 32.174;             // ft/s²
pub const INCHES_TO_FEET: f64 = 1.0 / 12.0;
pub const MPH_TO_FPS: f64 = 5280.0 / 3600.0;

/// Weight at which grip factor is 1.0 (lbs).
pub const REFERENCE_WEIGHT: f64 = 3000.0;
/// Cap on normalized weight before the sqrt.
pub const MAX_WEIGHT_RATIO: f64 = 1.5;

// ============================================
// Environment
// ============================================

/// Track + surface conditions shared by both vehicles of a session.
///
/// Setters only affect evaluations made after the call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvironment")]
pub struct EnvironmentParams {
    friction_coefficient: f64, // dimensionless
    turn_radius: f64,          // ft
    ignore_spin_out: bool,
    ignore_rollover: bool,
}

impl EnvironmentParams {
    pub fn new(friction_coefficient: f64, turn_radius: f64) -> Result<Self, ParameterError> {
        Ok(Self {
            friction_coefficient: ParameterError::require_positive(
                "friction_coefficient",
                friction_coefficient,
            )?,
            turn_radius: ParameterError::require_positive("turn_radius", turn_radius)?,
            ignore_spin_out: false,
            ignore_rollover: false,
        })
    }

    pub fn friction_coefficient(&self) -> f64 { self.friction_coefficient }
    pub fn turn_radius(&self) -> f64 { self.turn_radius }
    pub fn ignore_spin_out(&self) -> bool { self.ignore_spin_out }
    pub fn ignore_rollover(&self) -> bool { self.ignore_rollover }

    pub fn set_friction_coefficient(&mut self, value: f64) -> Result<(), ParameterError> {
        self.friction_coefficient = ParameterError::require_positive("friction_coefficient", value)?;
        Ok(())
    }

    pub fn set_turn_radius(&mut self, value: f64) -> Result<(), ParameterError> {
        self.turn_radius = ParameterError::require_positive("turn_radius", value)?;
        Ok(())
    }

    pub fn set_ignore_spin_out(&mut self, ignore: bool) {
        self.ignore_spin_out = ignore;
    }

    pub fn set_ignore_rollover(&mut self, ignore: bool) {
        self.ignore_rollover = ignore;
    }
}

impl Default for EnvironmentParams {
    fn default() -> Self {
        Self {
            friction_coefficient: 0.7,
            turn_radius: 75.0,
            ignore_spin_out: false,
            ignore_rollover: false,
        }
    }
}

/// Builds a validated environment in one call.
pub fn create_environment(
    friction_coefficient: f64,
    turn_radius: f64,
    ignore_spin_out: bool,
    ignore_rollover: bool,
) -> Result<EnvironmentParams, ParameterError> {
    let mut env = EnvironmentParams::new(friction_coefficient, turn_radius)?;
    env.set_ignore_spin_out(ignore_spin_out);
    env.set_ignore_rollover(ignore_rollover);
    Ok(env)
}

#[derive(Deserialize)]
struct RawEnvironment {
    friction_coefficient: f64,
    turn_radius: f64,
    #[serde(default)]
    ignore_spin_out: bool,
    #[serde(default)]
    ignore_rollover: bool,
}

impl TryFrom<RawEnvironment> for EnvironmentParams {
    type Error = ParameterError;

    fn try_from(raw: RawEnvironment) -> Result<Self, Self::Error> {
        create_environment(
            raw.friction_coefficient,
            raw.turn_radius,
            raw.ignore_spin_out,
            raw.ignore_rollover,
        )
    }
}

// ============================================
// Failure modes
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureMode {
    SpinOut,
    Rollover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureType {
    None,
    SpinOut,
    Rollover,
}

impl From<FailureMode> for FailureType {
    fn from(mode: FailureMode) -> Self {
        match mode {
            FailureMode::SpinOut => FailureType::SpinOut,
            FailureMode::Rollover => FailureType::Rollover,
        }
    }
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureType::None => "none",
            FailureType::SpinOut => "spin-out",
            FailureType::Rollover => "rollover",
        };
        write!(f, "{s}")
    }
}

// ============================================
// ----- evaluation results -------------------
// ============================================

/// One threshold check at one speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdResult {
    pub mode: FailureMode,
    pub required_lateral_accel: f64, // ft/s²
    pub limit: f64,                  // ft/s²
    pub margin: f64,                 // limit - required
    pub turn_radius: f64,            // ft

    /// Rollover checks only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub static_stability_factor: Option<f64>,
}

impl ThresholdResult {
    pub fn will_fail(&self) -> bool {
        self.margin < 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FailureAnalysis {
    pub has_failed: bool,
    pub failure_type: FailureType,
    pub spin_out: ThresholdResult,
    pub rollover: ThresholdResult,
    pub speed: f64, // mph
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalSpeedResult {
    pub critical_speed: f64, // mph
    pub failure_details: FailureAnalysis,
}

// ==============================================================================
// analyze.rs — PER-SPEED FAILURE VERDICT
// ------------------------------------------------------------------------------
// check_spin_out / check_rollover evaluate one threshold at one speed.
//
// analyze_failure arbitrates:
// - ignored mode => effective margin +inf (never the cause)
// - failure <=> effective margin < 0
// - both negative => lower margin is the cause (breached harder, so "first")
// - equal negative margins => spin-out
//
// The ThresholdResults kept in the analysis are the raw checks, so an ignored
// mode still shows its real numbers.
// ==============================================================================

use crate::threshold::limits::{lateral_acceleration, rollover_limit, spin_out_limit, static_stability_factor, turn_radius};
use crate::threshold::types::{EnvironmentParams, FailureAnalysis, FailureMode, FailureType, ThresholdResult};
use crate::vehicle::VehicleSpec;

pub fn check_spin_out(vehicle: &VehicleSpec, speed: f64, env: &EnvironmentParams) -> ThresholdResult {
    let radius = turn_radius(env);
    let required = lateral_acceleration(speed, radius);
    let limit = spin_out_limit(env.friction_coefficient(), vehicle);

    ThresholdResult {
        mode: FailureMode::SpinOut,
        required_lateral_accel: required,
        limit,
        margin: limit - required,
        turn_radius: radius,
        static_stability_factor: None,
    }
}

pub fn check_rollover(vehicle: &VehicleSpec, speed: f64, env: &EnvironmentParams) -> ThresholdResult {
    let radius = turn_radius(env);
    let required = lateral_acceleration(speed, radius);
    let limit = rollover_limit(vehicle);

    ThresholdResult {
        mode: FailureMode::Rollover,
        required_lateral_accel: required,
        limit,
        margin: limit - required,
        turn_radius: radius,
        static_stability_factor: Some(static_stability_factor(vehicle)),
    }
}

/// Picks the failure cause from the two effective margins.
fn arbitrate(spin_out_margin: f64, rollover_margin: f64) -> FailureType {
    match (spin_out_margin < 0.0, rollover_margin < 0.0) {
        (true, true) if rollover_margin < spin_out_margin => FailureType::Rollover,
        (true, true) => FailureType::SpinOut,
        (true, false) => FailureType::SpinOut,
        (false, true) => FailureType::Rollover,
        (false, false) => FailureType::None,
    }
}

pub fn analyze_failure(vehicle: &VehicleSpec, speed: f64, env: &EnvironmentParams) -> FailureAnalysis {
    let spin_out = check_spin_out(vehicle, speed, env);
    let rollover = check_rollover(vehicle, speed, env);

    let spin_out_margin = if env.ignore_spin_out() { f64::INFINITY } else { spin_out.margin };
    let rollover_margin = if env.ignore_rollover() { f64::INFINITY } else { rollover.margin };

    let failure_type = arbitrate(spin_out_margin, rollover_margin);

    FailureAnalysis {
        has_failed: failure_type != FailureType::None,
        failure_type,
        spin_out,
        rollover,
        speed,
    }
}

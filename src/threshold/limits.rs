// ==============================================================================
// limits.rs — LATERAL DEMAND + FAILURE LIMITS (QUASI-STATIC)
// ------------------------------------------------------------------------------
// Demand:
//     a_lat = v² / R          v in ft/s, R = track radius in ft
//
// Spin-out (friction limit):
//     a_spin = μ·g · sqrt(min(W / 3000, 1.5)) · k_drive
//     - heavier car => bigger contact patch, diminishing returns, capped at 1.5x
//     - k_drive: FWD 1.05, RWD 0.98, AWD 1.0
//
// Rollover (stability limit):
//     SSF    = t_avg / (2·h_cg)   (both in ft, ratio is unit free)
//     a_roll = SSF · g
//
// None of these depend on speed, so failure is monotonic in speed. The
// critical-speed search relies on that.
// ==============================================================================

use crate::threshold::types::{
    EnvironmentParams, GRAVITY, INCHES_TO_FEET, MAX_WEIGHT_RATIO, MPH_TO_FPS, REFERENCE_WEIGHT,
};
use crate::vehicle::VehicleSpec;

/// Required lateral acceleration (ft/s²) for `speed_mph` around `turn_radius_ft`.
///
/// `turn_radius_ft` is validated positive by `EnvironmentParams`.
#[inline]
pub fn lateral_acceleration(speed_mph: f64, turn_radius_ft: f64) -> f64 {
    let v = speed_mph * MPH_TO_FPS;
    v * v / turn_radius_ft
}

/// Radius of the road curve. Same for every vehicle and every speed.
#[inline]
pub fn turn_radius(env: &EnvironmentParams) -> f64 {
    env.turn_radius()
}

#[inline]
pub fn weight_grip_factor(vehicle: &VehicleSpec) -> f64 {
    let normalized = vehicle.weight() / REFERENCE_WEIGHT;
    normalized.min(MAX_WEIGHT_RATIO).sqrt()
}

/// Max lateral acceleration before the tires let go (ft/s²).
pub fn spin_out_limit(friction_coefficient: f64, vehicle: &VehicleSpec) -> f64 {
    let base_limit = friction_coefficient * GRAVITY;
    base_limit * weight_grip_factor(vehicle) * vehicle.drive_type().grip_factor()
}

pub fn static_stability_factor(vehicle: &VehicleSpec) -> f64 {
    let track_ft = vehicle.average_track() * INCHES_TO_FEET;
    let com_ft = vehicle.center_of_mass_height() * INCHES_TO_FEET;
    track_ft / (2.0 * com_ft)
}

/// Max lateral acceleration before the body tips (ft/s²).
pub fn rollover_limit(vehicle: &VehicleSpec) -> f64 {
    static_stability_factor(vehicle) * GRAVITY
}

/// Speed (mph) at which the demand exactly meets `limit`.
pub fn onset_speed(limit: f64, turn_radius_ft: f64) -> f64 {
    (limit * turn_radius_ft).sqrt() / MPH_TO_FPS
}

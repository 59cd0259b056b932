// ==============================================================================
// critical.rs — CRITICAL SPEED SEARCH (BISECTION)
// ------------------------------------------------------------------------------
// Bisects [min, max] on analyze_failure(...).has_failed:
// - failing midpoint  => record, high = mid
// - passing midpoint  => low = mid
// - stop when high - low <= tolerance
//
// Valid because failure is monotonic in speed (limits are speed independent).
//
// Result:
// - lowest failing midpoint found, or
// - min itself when min already fails, or
// - max with its analysis when no midpoint failed
// ==============================================================================

use serde::Serialize;

use crate::error::ParameterError;
use crate::threshold::analyze::analyze_failure;
use crate::threshold::types::{CriticalSpeedResult, EnvironmentParams};
use crate::vehicle::VehicleSpec;

pub const DEFAULT_MIN_SPEED: f64 = 10.0;  // mph
pub const DEFAULT_MAX_SPEED: f64 = 150.0; // mph
pub const DEFAULT_TOLERANCE: f64 = 0.1;   // mph

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CriticalSpeedSearch {
    min_speed: f64,
    max_speed: f64,
    tolerance: f64,
}

impl CriticalSpeedSearch {
    pub fn new(min_speed: f64, max_speed: f64, tolerance: f64) -> Result<Self, ParameterError> {
        let min_speed = ParameterError::require_positive("min_speed", min_speed)?;
        let max_speed = ParameterError::require_positive("max_speed", max_speed)?;
        // min == max leaves nothing to bisect
        if min_speed >= max_speed {
            return Err(ParameterError::InvalidRange { min: min_speed, max: max_speed });
        }
        Ok(Self {
            min_speed,
            max_speed,
            tolerance: ParameterError::require_positive("tolerance", tolerance)?,
        })
    }

    pub fn min_speed(&self) -> f64 { self.min_speed }
    pub fn max_speed(&self) -> f64 { self.max_speed }
    pub fn tolerance(&self) -> f64 { self.tolerance }

    pub fn run(&self, vehicle: &VehicleSpec, env: &EnvironmentParams) -> CriticalSpeedResult {
        let at_min = analyze_failure(vehicle, self.min_speed, env);
        if at_min.has_failed {
            return CriticalSpeedResult { critical_speed: self.min_speed, failure_details: at_min };
        }

        let mut low = self.min_speed;
        let mut high = self.max_speed;
        let mut found = None;

        while high - low > self.tolerance {
            let mid = (low + high) / 2.0;
            let analysis = analyze_failure(vehicle, mid, env);

            if analysis.has_failed {
                found = Some(CriticalSpeedResult { critical_speed: mid, failure_details: analysis });
                high = mid;
            } else {
                low = mid;
            }
        }

        found.unwrap_or_else(|| CriticalSpeedResult {
            critical_speed: self.max_speed,
            failure_details: analyze_failure(vehicle, self.max_speed, env),
        })
    }
}

impl Default for CriticalSpeedSearch {
    fn default() -> Self {
        Self {
            min_speed: DEFAULT_MIN_SPEED,
            max_speed: DEFAULT_MAX_SPEED,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Critical speed over the default 10..150 mph range at 0.1 mph precision.
pub fn find_critical_speed(vehicle: &VehicleSpec, env: &EnvironmentParams) -> CriticalSpeedResult {
    CriticalSpeedSearch::default().run(vehicle, env)
}

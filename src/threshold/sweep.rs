// ==============================================================================
// sweep.rs — SPEED RAMPS FOR THE HEAD-TO-HEAD
// ------------------------------------------------------------------------------
// SpeedRamp: start, start+step, start+2·step, ... <= max   (index based, no drift)
//
// VehicleRun: one vehicle walking a ramp. Each step evaluates the next speed
// against the environment passed in *at that step*, so environment changes
// apply from the next step on. Stops after the first failure.
//
// SynchronizedSweep: both vehicles evaluated at the identical speed per step.
// Ends as soon as either fails (both then hold a result at that common speed)
// or the ramp runs out.
//
// The independent mode (each vehicle on its own clock, early stop when the
// opponent has failed) is driven by race.rs on top of VehicleRun.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::error::ParameterError;
use crate::threshold::analyze::analyze_failure;
use crate::threshold::compare::SweepOutcome;
use crate::threshold::critical::{DEFAULT_MAX_SPEED, DEFAULT_MIN_SPEED};
use crate::threshold::types::{EnvironmentParams, FailureAnalysis};
use crate::vehicle::VehicleSpec;

pub const DEFAULT_STEP: f64 = 1.0; // mph

/// Upper bound on speeds per ramp; one speed per tick at 16 ms is ~2.7 min.
pub const MAX_RAMP_STEPS: usize = 10_000;

// slack so that e.g. 10 + 140·1.0 still lands on 150
const RAMP_EPSILON: f64 = 1e-9;

fn ramp_steps(start: f64, max: f64, step: f64) -> f64 {
    ((max - start) / step + RAMP_EPSILON).floor() + 1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRamp")]
pub struct SpeedRamp {
    start: f64, // mph
    max: f64,   // mph
    step: f64,  // mph
}

impl SpeedRamp {
    pub fn new(start: f64, max: f64, step: f64) -> Result<Self, ParameterError> {
        let start = ParameterError::require_positive("start_speed", start)?;
        let max = ParameterError::require_positive("max_speed", max)?;
        let step = ParameterError::require_positive("step", step)?;
        if start > max {
            return Err(ParameterError::InvalidRange { min: start, max });
        }
        let steps = ramp_steps(start, max, step);
        // also catches inf from a vanishing step
        if !(steps <= MAX_RAMP_STEPS as f64) {
            return Err(ParameterError::TooManySteps { steps, limit: MAX_RAMP_STEPS });
        }
        Ok(Self { start, max, step })
    }

    pub fn start(&self) -> f64 { self.start }
    pub fn max(&self) -> f64 { self.max }
    pub fn step(&self) -> f64 { self.step }

    /// Number of speeds on the ramp, in `1..=MAX_RAMP_STEPS`.
    pub fn len(&self) -> usize {
        ramp_steps(self.start, self.max, self.step) as usize
    }

    pub fn speed_at(&self, index: usize) -> Option<f64> {
        (index < self.len()).then(|| self.start + index as f64 * self.step)
    }

    pub fn speeds(&self) -> impl Iterator<Item = f64> {
        let (start, step) = (self.start, self.step);
        (0..self.len()).map(move |i| start + i as f64 * step)
    }
}

impl Default for SpeedRamp {
    fn default() -> Self {
        Self { start: DEFAULT_MIN_SPEED, max: DEFAULT_MAX_SPEED, step: DEFAULT_STEP }
    }
}

#[derive(Deserialize)]
struct RawRamp {
    start: f64,
    max: f64,
    step: f64,
}

impl TryFrom<RawRamp> for SpeedRamp {
    type Error = ParameterError;

    fn try_from(raw: RawRamp) -> Result<Self, Self::Error> {
        SpeedRamp::new(raw.start, raw.max, raw.step)
    }
}

// ============================================
// ----- single vehicle -----------------------
// ============================================
#[derive(Debug, Clone)]
pub struct VehicleRun {
    vehicle: VehicleSpec,
    ramp: SpeedRamp,
    next: usize,
    last: Option<FailureAnalysis>,
}

impl VehicleRun {
    pub fn new(vehicle: VehicleSpec, ramp: SpeedRamp) -> Self {
        Self { vehicle, ramp, next: 0, last: None }
    }

    pub fn has_failed(&self) -> bool {
        self.last.is_some_and(|a| a.has_failed)
    }

    pub fn is_finished(&self) -> bool {
        self.has_failed() || self.next >= self.ramp.len()
    }

    /// Ramp speeds evaluated so far.
    pub fn steps_taken(&self) -> usize {
        self.next
    }

    /// Evaluates the next ramp speed. `None` once failed or out of ramp.
    pub fn step(&mut self, env: &EnvironmentParams) -> Option<FailureAnalysis> {
        if self.is_finished() {
            return None;
        }
        let speed = self.ramp.speed_at(self.next)?;
        self.next += 1;

        let analysis = analyze_failure(&self.vehicle, speed, env);
        self.last = Some(analysis);
        Some(analysis)
    }

    pub fn outcome(&self) -> SweepOutcome {
        match self.last {
            Some(analysis) => SweepOutcome::from(analysis),
            None => SweepOutcome::untested(self.ramp.start()),
        }
    }
}

/// Ramps one vehicle until it fails or the ramp ends.
pub fn run_to_failure(vehicle: &VehicleSpec, env: &EnvironmentParams, ramp: &SpeedRamp) -> SweepOutcome {
    let mut run = VehicleRun::new(*vehicle, *ramp);
    while run.step(env).is_some() {}
    run.outcome()
}

// ============================================
// ----- both vehicles, same speed ------------
// ============================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SyncStep {
    pub speed: f64,
    pub a: FailureAnalysis,
    pub b: FailureAnalysis,
}

#[derive(Debug, Clone)]
pub struct SynchronizedSweep {
    a: VehicleRun,
    b: VehicleRun,
}

impl SynchronizedSweep {
    pub fn new(a: VehicleSpec, b: VehicleSpec, ramp: SpeedRamp) -> Self {
        Self { a: VehicleRun::new(a, ramp), b: VehicleRun::new(b, ramp) }
    }

    pub fn is_finished(&self) -> bool {
        self.a.is_finished() || self.b.is_finished()
    }

    pub fn step(&mut self, env: &EnvironmentParams) -> Option<SyncStep> {
        if self.is_finished() {
            return None;
        }
        let a = self.a.step(env)?;
        let b = self.b.step(env)?;
        Some(SyncStep { speed: a.speed, a, b })
    }

    pub fn outcomes(&self) -> (SweepOutcome, SweepOutcome) {
        (self.a.outcome(), self.b.outcome())
    }
}

/// Runs a synchronized sweep to completion, reporting every step to `observer`.
pub fn synchronized_sweep<F>(
    a: &VehicleSpec,
    b: &VehicleSpec,
    env: &EnvironmentParams,
    ramp: &SpeedRamp,
    mut observer: F,
) -> (SweepOutcome, SweepOutcome)
where
    F: FnMut(&SyncStep),
{
    let mut sweep = SynchronizedSweep::new(*a, *b, *ramp);
    while let Some(step) = sweep.step(env) {
        observer(&step);
    }
    sweep.outcomes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::compare::{compare_outcomes, Side, Verdict};
    use crate::threshold::types::{create_environment, FailureType};
    use crate::vehicle::{CARAVAN_2016, CELICA_2004};

    #[test]
    fn test_ramp_speeds() {
        let ramp = SpeedRamp::default();
        assert_eq!(ramp.len(), 141);
        assert_eq!(ramp.speed_at(0), Some(10.0));
        assert_eq!(ramp.speed_at(140), Some(150.0));
        assert_eq!(ramp.speed_at(141), None);

        let ramp = SpeedRamp::new(10.0, 11.0, 0.1).unwrap();
        assert_eq!(ramp.len(), 11);
        let last = ramp.speeds().last().unwrap();
        assert!((last - 11.0).abs() < 1e-9);

        let ramp = SpeedRamp::new(10.0, 12.5, 1.0).unwrap();
        assert_eq!(ramp.speeds().collect::<Vec<_>>(), vec![10.0, 11.0, 12.0]);

        let single = SpeedRamp::new(40.0, 40.0, 5.0).unwrap();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn test_ramp_rejects_bad_values() {
        assert!(SpeedRamp::new(10.0, 150.0, 0.0).is_err());
        assert!(SpeedRamp::new(160.0, 150.0, 1.0).is_err());
        assert!(SpeedRamp::new(0.0, 150.0, 1.0).is_err());
        assert!(serde_json::from_str::<SpeedRamp>(r#"{"start":10,"max":150,"step":-1}"#).is_err());
    }

    #[test]
    fn test_ramp_rejects_oversized_step_count() {
        assert!(matches!(
            SpeedRamp::new(10.0, 150.0, 1e-300),
            Err(ParameterError::TooManySteps { limit: MAX_RAMP_STEPS, .. })
        ));
        assert!(matches!(SpeedRamp::new(10.0, 150.0, 1e-6), Err(ParameterError::TooManySteps { .. })));
        assert!(serde_json::from_str::<SpeedRamp>(r#"{"start":10,"max":150,"step":1e-9}"#).is_err());

        // 14_001 speeds
        assert!(SpeedRamp::new(10.0, 150.0, 0.01).is_err());
        let ramp = SpeedRamp::new(10.0, 150.0, 0.015).unwrap();
        assert!(ramp.len() <= MAX_RAMP_STEPS);
        assert!(ramp.speed_at(ramp.len() - 1).is_some_and(|s| s <= 150.0));
    }

    #[test]
    fn test_single_speed_ramp_runs_once() {
        let env = EnvironmentParams::default();
        let ramp = SpeedRamp::new(40.0, 40.0, 1.0).unwrap();
        let mut run = VehicleRun::new(CARAVAN_2016.spec, ramp);
        let analysis = run.step(&env).unwrap();
        assert_eq!(analysis.speed, 40.0);
        assert_eq!(run.steps_taken(), 1);
        assert!(run.step(&env).is_none());
    }

    #[test]
    fn test_run_to_failure_celica() {
        let env = EnvironmentParams::default();
        let outcome = run_to_failure(&CELICA_2004.spec, &env, &SpeedRamp::default());
        // onset ~27.84 mph -> first failing integer speed is 28
        assert!(outcome.has_failed);
        assert_eq!(outcome.speed, 28.0);
        assert_eq!(outcome.failure_type, FailureType::SpinOut);
    }

    #[test]
    fn test_run_never_fails_reports_max() {
        let env = create_environment(0.7, 75.0, true, true).unwrap();
        let outcome = run_to_failure(&CELICA_2004.spec, &env, &SpeedRamp::default());
        assert!(!outcome.has_failed);
        assert_eq!(outcome.speed, 150.0);
        assert!(outcome.analysis.is_some());
    }

    #[test]
    fn test_vehicle_run_stops_after_failure() {
        let env = EnvironmentParams::default();
        let mut run = VehicleRun::new(CELICA_2004.spec, SpeedRamp::default());
        let mut count = 0;
        while run.step(&env).is_some() {
            count += 1;
        }
        assert_eq!(count, 19); // 10..=28
        assert!(run.has_failed());
        assert!(run.step(&env).is_none());
    }

    #[test]
    fn test_environment_change_applies_next_step() {
        let mut env = EnvironmentParams::default();
        let mut run = VehicleRun::new(CELICA_2004.spec, SpeedRamp::new(20.0, 30.0, 1.0).unwrap());

        let first = run.step(&env).unwrap();
        assert!(!first.has_failed);

        env.set_friction_coefficient(0.1).unwrap();
        let second = run.step(&env).unwrap();
        assert_eq!(second.speed, 21.0);
        assert!(second.has_failed);
        // earlier result is untouched
        assert!(!first.has_failed);
    }

    #[test]
    fn test_synchronized_presets() {
        let env = EnvironmentParams::default();
        let mut speeds = Vec::new();
        let (a, b) = synchronized_sweep(
            &CELICA_2004.spec,
            &CARAVAN_2016.spec,
            &env,
            &SpeedRamp::default(),
            |step| speeds.push(step.speed),
        );

        // Celica slips at 28, Caravan (~31.8 onset) clears 28 at the same step
        assert_eq!(speeds.last().copied(), Some(28.0));
        assert!(a.has_failed);
        assert_eq!(a.speed, 28.0);
        assert!(!b.has_failed);
        assert_eq!(b.speed, 28.0);
        assert_eq!(compare_outcomes(&a, &b), Verdict::Winner(Side::B));
    }

    #[test]
    fn test_synchronized_identical_vehicles_tie() {
        let env = EnvironmentParams::default();
        let (a, b) = synchronized_sweep(
            &CARAVAN_2016.spec,
            &CARAVAN_2016.spec,
            &env,
            &SpeedRamp::default(),
            |_| {},
        );
        assert!(a.has_failed && b.has_failed);
        assert_eq!(compare_outcomes(&a, &b), Verdict::Tie);
    }

    #[test]
    fn test_synchronized_both_complete() {
        let env = create_environment(0.7, 75.0, true, true).unwrap();
        let (a, b) = synchronized_sweep(
            &CELICA_2004.spec,
            &CARAVAN_2016.spec,
            &env,
            &SpeedRamp::new(10.0, 50.0, 5.0).unwrap(),
            |_| {},
        );
        assert_eq!(a.speed, 50.0);
        assert_eq!(b.speed, 50.0);
        assert_eq!(compare_outcomes(&a, &b), Verdict::BothCompleted);
    }
}

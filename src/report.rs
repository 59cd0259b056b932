// ==============================================================================
// report.rs — DUEL REPORT (SERVER -> CLIENT)
// ------------------------------------------------------------------------------
// Per vehicle:
// - chassis numbers that feed the model (grip factor, drive factor, avg track, SSF)
// - limits + onset speeds as evaluated at the vehicle's final step (the
//   environment passed in only covers a vehicle that was never evaluated)
// - outcome + one-line headline
//
// Per duel:
// - verdict, summary sentence
// - deciding factor: which limit separated the two cars
//
// Pure formatting over threshold results; no physics side effects.
// ==============================================================================

use serde::Serialize;

use crate::threshold::compare::{Side, SweepOutcome, Verdict};
use crate::threshold::limits::{onset_speed, rollover_limit, spin_out_limit, static_stability_factor, weight_grip_factor};
use crate::threshold::types::{EnvironmentParams, FailureType};
use crate::vehicle::Preset;

#[derive(Debug, Clone, Serialize)]
pub struct VehicleReport {
    pub key: &'static str,
    pub name: &'static str,
    pub year: u16,
    pub weight_grip_factor: f64,
    pub drive_factor: f64,
    pub average_track: f64,          // in
    pub static_stability_factor: f64,
    pub spin_out_limit: f64,         // ft/s²
    pub rollover_limit: f64,         // ft/s²
    pub spin_out_onset: f64,         // mph
    pub rollover_onset: f64,         // mph
    pub outcome: SweepOutcome,
    pub headline: String,
}

impl VehicleReport {
    pub fn new(preset: &Preset, outcome: SweepOutcome, env: &EnvironmentParams) -> Self {
        let spec = &preset.spec;
        let (spin, roll, radius) = match outcome.analysis {
            Some(last) => (last.spin_out.limit, last.rollover.limit, last.spin_out.turn_radius),
            None => (spin_out_limit(env.friction_coefficient(), spec), rollover_limit(spec), env.turn_radius()),
        };

        Self {
            key: preset.key,
            name: preset.name,
            year: preset.year,
            weight_grip_factor: weight_grip_factor(spec),
            drive_factor: spec.drive_type().grip_factor(),
            average_track: spec.average_track(),
            static_stability_factor: static_stability_factor(spec),
            spin_out_limit: spin,
            rollover_limit: roll,
            spin_out_onset: onset_speed(spin, radius),
            rollover_onset: onset_speed(roll, radius),
            outcome,
            headline: headline(preset.name, &outcome),
        }
    }
}

fn headline(name: &str, outcome: &SweepOutcome) -> String {
    match outcome.failure_type {
        FailureType::SpinOut => format!("{name} lost grip (spin-out) at {:.1} mph.", outcome.speed),
        FailureType::Rollover => format!("{name} rolled over (stability limit) at {:.1} mph.", outcome.speed),
        FailureType::None => format!(
            "{name} completed the turn successfully. Top tested speed: {:.1} mph.",
            outcome.speed
        ),
    }
}

/// What separated the winner from the loser.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecidingFactor {
    /// Loser spun out; winner had the higher friction limit.
    Grip { winner_limit: f64, loser_limit: f64 },
    /// Loser rolled over; winner had the better SSF.
    Stability { winner_ssf: f64, loser_ssf: f64 },
    /// Both failed; winner held on for `margin` more mph.
    Endurance { margin: f64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct DuelReport {
    pub verdict: Verdict,
    pub environment: EnvironmentParams,
    pub a: VehicleReport,
    pub b: VehicleReport,
    pub deciding_factor: Option<DecidingFactor>,
    pub summary: String,
}

impl DuelReport {
    pub fn new(
        verdict: Verdict,
        env: &EnvironmentParams,
        a: (&Preset, SweepOutcome),
        b: (&Preset, SweepOutcome),
    ) -> Self {
        let a = VehicleReport::new(a.0, a.1, env);
        let b = VehicleReport::new(b.0, b.1, env);

        let deciding_factor = verdict.winner().and_then(|side| {
            let (winner, loser) = match side {
                Side::A => (&a, &b),
                Side::B => (&b, &a),
            };
            deciding_factor(winner, loser)
        });
        let summary = summary(&verdict, &a, &b);

        Self { verdict, environment: *env, a, b, deciding_factor, summary }
    }

    pub fn side(&self, side: Side) -> &VehicleReport {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }
}

fn deciding_factor(winner: &VehicleReport, loser: &VehicleReport) -> Option<DecidingFactor> {
    if winner.outcome.has_failed {
        return Some(DecidingFactor::Endurance { margin: winner.outcome.speed - loser.outcome.speed });
    }
    match loser.outcome.failure_type {
        FailureType::SpinOut => Some(DecidingFactor::Grip {
            winner_limit: winner.spin_out_limit,
            loser_limit: loser.spin_out_limit,
        }),
        FailureType::Rollover => Some(DecidingFactor::Stability {
            winner_ssf: winner.static_stability_factor,
            loser_ssf: loser.static_stability_factor,
        }),
        FailureType::None => None,
    }
}

fn summary(verdict: &Verdict, a: &VehicleReport, b: &VehicleReport) -> String {
    match verdict {
        Verdict::Tie => format!(
            "Tie! Both vehicles failed at {:.1} mph ({} {}, {} {}).",
            a.outcome.speed, a.name, a.outcome.failure_type, b.name, b.outcome.failure_type
        ),
        Verdict::BothCompleted => format!(
            "Both vehicles completed successfully through {:.1} mph.",
            a.outcome.speed.max(b.outcome.speed)
        ),
        Verdict::Winner(side) => {
            let (winner, loser) = match side {
                Side::A => (a, b),
                Side::B => (b, a),
            };
            if winner.outcome.has_failed {
                format!(
                    "{} wins by sustaining a higher speed before failure: {:.1} mph vs {:.1} mph.",
                    winner.name, winner.outcome.speed, loser.outcome.speed
                )
            } else {
                format!(
                    "{} wins! {} failed ({}) at {:.1} mph while {} completed {:.1} mph.",
                    winner.name,
                    loser.name,
                    loser.outcome.failure_type,
                    loser.outcome.speed,
                    winner.name,
                    winner.outcome.speed
                )
            }
        }
    }
}

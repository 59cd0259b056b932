// ==============================================================================
// compare.rs — HEAD-TO-HEAD VERDICT
// ------------------------------------------------------------------------------
// Priority order:
// 1) both failed within SAME_SPEED_TOLERANCE  -> Tie
// 2) both failed                              -> higher failing speed wins
// 3) exactly one failed                       -> the other wins
// 4) neither failed                           -> BothCompleted (no winner)
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::threshold::types::{FailureAnalysis, FailureType};

/// Failing speeds closer than this (mph) count as the same speed.
pub const SAME_SPEED_TOLERANCE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(&self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => write!(f, "A"),
            Side::B => write!(f, "B"),
        }
    }
}

/// Where one vehicle's sweep ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub has_failed: bool,
    pub failure_type: FailureType,
    /// Failing speed, or the last speed sustained (mph).
    pub speed: f64,
    pub analysis: Option<FailureAnalysis>,
}

impl SweepOutcome {
    /// Outcome of a sweep that never evaluated anything.
    pub fn untested(speed: f64) -> Self {
        Self { has_failed: false, failure_type: FailureType::None, speed, analysis: None }
    }
}

impl From<FailureAnalysis> for SweepOutcome {
    fn from(analysis: FailureAnalysis) -> Self {
        Self {
            has_failed: analysis.has_failed,
            failure_type: analysis.failure_type,
            speed: analysis.speed,
            analysis: Some(analysis),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "side", rename_all = "snake_case")]
pub enum Verdict {
    Winner(Side),
    Tie,
    BothCompleted,
}

impl Verdict {
    pub fn winner(&self) -> Option<Side> {
        match self {
            Verdict::Winner(side) => Some(*side),
            Verdict::Tie | Verdict::BothCompleted => None,
        }
    }

    pub fn is_tie(&self) -> bool {
        matches!(self, Verdict::Tie)
    }
}

pub fn compare_outcomes(a: &SweepOutcome, b: &SweepOutcome) -> Verdict {
    match (a.has_failed, b.has_failed) {
        (true, true) => {
            if (a.speed - b.speed).abs() < SAME_SPEED_TOLERANCE {
                Verdict::Tie
            } else if a.speed > b.speed {
                Verdict::Winner(Side::A)
            } else {
                Verdict::Winner(Side::B)
            }
        }
        (true, false) => Verdict::Winner(Side::B),
        (false, true) => Verdict::Winner(Side::A),
        (false, false) => Verdict::BothCompleted,
    }
}

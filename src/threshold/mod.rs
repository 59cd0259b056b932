//! threshold - spin-out / rollover failure model (pure types + analyzer)

pub mod types;
pub mod limits;
pub mod analyze;
pub mod critical;
pub mod compare;
pub mod sweep;

pub use types::*;
pub use analyze::{analyze_failure, check_rollover, check_spin_out};
pub use critical::{find_critical_speed, CriticalSpeedSearch};
pub use compare::{compare_outcomes, Side, SweepOutcome, Verdict};
pub use sweep::{run_to_failure, synchronized_sweep, SpeedRamp, SynchronizedSweep, VehicleRun};

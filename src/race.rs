// ==============================================================================
// race.rs — DUEL RUNNER (ASYNC ORCHESTRATION OVER THE THRESHOLD CORE)
// ------------------------------------------------------------------------------
// Two ways to walk both vehicles up the speed ramp:
//
// Synchronized:
// - one task, one SynchronizedSweep
// - each tick: snapshot environment -> evaluate A and B at the same speed
// - stops at the first step where either fails
//
// Independent:
// - one task per vehicle, each with its own VehicleRun and ticker
// - each side publishes the ramp index it failed at (NOT_FAILED until then)
// - a side stops early only after it has itself evaluated that index, so both
//   outcomes cover the speed the loser failed at
//
// Every step locks the shared state only to copy EnvironmentParams and to
// broadcast progress, so client-side parameter changes land on the next step.
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::report::DuelReport;
use crate::state::{ServerEvent, SharedDuelState};
use crate::threshold::compare::{compare_outcomes, Side, SweepOutcome};
use crate::threshold::sweep::{SpeedRamp, SynchronizedSweep, VehicleRun};
use crate::threshold::types::EnvironmentParams;
use crate::vehicle::Preset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
    #[default]
    Synchronized,
    Independent,
}

#[derive(Debug, Clone, Copy)]
pub struct DuelRequest {
    pub mode: SweepMode,
    pub a: &'static Preset,
    pub b: &'static Preset,
    pub ramp: SpeedRamp,
    /// Delay between steps; zero runs flat out.
    pub tick: Duration,
}

const NOT_FAILED: usize = usize::MAX;

/// Step pacing. A zero period just yields to the scheduler.
struct Pacer {
    ticker: Option<Interval>,
}

impl Pacer {
    fn new(tick: Duration) -> Self {
        let ticker = (!tick.is_zero()).then(|| {
            let mut ticker = interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        Self { ticker }
    }

    async fn wait(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => tokio::task::yield_now().await,
        }
    }
}

/// Runs a duel to completion and publishes the report.
///
/// The caller must have claimed the duel slot with `try_begin_duel`.
pub async fn run_duel(state: Arc<Mutex<SharedDuelState>>, request: DuelRequest) -> DuelReport {
    info!(
        mode = ?request.mode,
        a = request.a.key,
        b = request.b.key,
        start = request.ramp.start(),
        max = request.ramp.max(),
        step = request.ramp.step(),
        "duel started"
    );
    state.lock().await.broadcast(&ServerEvent::DuelStarted {
        mode: request.mode,
        a: request.a.key,
        b: request.b.key,
        ramp: request.ramp,
    });

    let (outcome_a, outcome_b) = match request.mode {
        SweepMode::Synchronized => run_synchronized(&state, &request).await,
        SweepMode::Independent => run_independent(&state, &request).await,
    };

    let mut game = state.lock().await;
    let env = game.environment;
    let verdict = compare_outcomes(&outcome_a, &outcome_b);
    let report = DuelReport::new(verdict, &env, (request.a, outcome_a), (request.b, outcome_b));

    info!(
        verdict = ?report.verdict,
        a_speed = outcome_a.speed,
        b_speed = outcome_b.speed,
        "duel finished"
    );
    game.finish_duel(report.clone());
    report
}

async fn run_synchronized(
    state: &Arc<Mutex<SharedDuelState>>,
    request: &DuelRequest,
) -> (SweepOutcome, SweepOutcome) {
    let mut sweep = SynchronizedSweep::new(request.a.spec, request.b.spec, request.ramp);
    let mut pacer = Pacer::new(request.tick);

    loop {
        pacer.wait().await;

        let game = state.lock().await;
        let env: EnvironmentParams = game.environment;
        let Some(step) = sweep.step(&env) else { break };

        debug!(speed = step.speed, a = %step.a.failure_type, b = %step.b.failure_type, "sync step");
        game.broadcast(&ServerEvent::Progress { side: Side::A, speed: step.speed, analysis: step.a });
        game.broadcast(&ServerEvent::Progress { side: Side::B, speed: step.speed, analysis: step.b });
    }

    sweep.outcomes()
}

async fn run_independent(
    state: &Arc<Mutex<SharedDuelState>>,
    request: &DuelRequest,
) -> (SweepOutcome, SweepOutcome) {
    let failed_a = Arc::new(AtomicUsize::new(NOT_FAILED));
    let failed_b = Arc::new(AtomicUsize::new(NOT_FAILED));

    let task_a = tokio::spawn(ramp_side(
        Arc::clone(state),
        Side::A,
        VehicleRun::new(request.a.spec, request.ramp),
        request.tick,
        Arc::clone(&failed_a),
        Arc::clone(&failed_b),
    ));
    let task_b = tokio::spawn(ramp_side(
        Arc::clone(state),
        Side::B,
        VehicleRun::new(request.b.spec, request.ramp),
        request.tick,
        Arc::clone(&failed_b),
        Arc::clone(&failed_a),
    ));

    let start = request.ramp.start();
    let (a, b) = tokio::join!(task_a, task_b);
    let a = a.unwrap_or_else(|err| {
        warn!(%err, side = %Side::A, "ramp task aborted");
        SweepOutcome::untested(start)
    });
    let b = b.unwrap_or_else(|err| {
        warn!(%err, side = %Side::B, "ramp task aborted");
        SweepOutcome::untested(start)
    });
    (a, b)
}

async fn ramp_side(
    state: Arc<Mutex<SharedDuelState>>,
    side: Side,
    mut run: VehicleRun,
    tick: Duration,
    own_failed_at: Arc<AtomicUsize>,
    opponent_failed_at: Arc<AtomicUsize>,
) -> SweepOutcome {
    let mut pacer = Pacer::new(tick);

    loop {
        pacer.wait().await;

        let opponent = opponent_failed_at.load(Ordering::Acquire);
        if opponent != NOT_FAILED && run.steps_taken() > opponent {
            debug!(%side, "matched the opponent's failing speed, stopping");
            break;
        }

        let game = state.lock().await;
        let env = game.environment;
        let Some(analysis) = run.step(&env) else { break };

        game.broadcast(&ServerEvent::Progress { side, speed: analysis.speed, analysis });
        if analysis.has_failed {
            own_failed_at.store(run.steps_taken() - 1, Ordering::Release);
            debug!(%side, speed = analysis.speed, cause = %analysis.failure_type, "side failed");
            break;
        }
    }

    run.outcome()
}

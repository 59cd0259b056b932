use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::race::SweepMode;
use crate::report::DuelReport;
use crate::threshold::compare::Side;
use crate::threshold::sweep::SpeedRamp;
use crate::threshold::types::{CriticalSpeedResult, EnvironmentParams, FailureAnalysis};
use crate::vehicle::{Preset, ROSTER};

/// Everything the server pushes to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Welcome {
        client_id: Uuid,
        vehicles: &'static [Preset],
        environment: EnvironmentParams,
        ramp: SpeedRamp,
    },
    Pong,
    Environment {
        environment: EnvironmentParams,
    },
    DuelStarted {
        mode: SweepMode,
        a: &'static str,
        b: &'static str,
        ramp: SpeedRamp,
    },
    Progress {
        side: Side,
        speed: f64,
        analysis: FailureAnalysis,
    },
    Finished {
        report: Box<DuelReport>,
    },
    CriticalSpeed {
        vehicle: &'static str,
        result: CriticalSpeedResult,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn error(err: impl std::fmt::Display) -> Self {
        ServerEvent::Error { message: err.to_string() }
    }

    pub fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(err) => {
                warn!(%err, "failed to serialize server event");
                None
            }
        }
    }
}

/// Session state shared by the connection tasks and the race runner.
pub struct SharedDuelState {
    pub environment: EnvironmentParams,
    pub ramp: SpeedRamp,
    pub clients: HashMap<Uuid, UnboundedSender<String>>,
    pub duel_running: bool,
    pub last_report: Option<DuelReport>,
}

impl SharedDuelState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            environment: config.environment,
            ramp: config.ramp,
            clients: HashMap::new(),
            duel_running: false,
            last_report: None,
        }
    }

    pub fn register_client(&mut self, tx: UnboundedSender<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.clients.insert(id, tx);
        id
    }

    pub fn remove_client(&mut self, id: &Uuid) {
        self.clients.remove(id);
    }

    pub fn welcome(&self, client_id: Uuid) -> ServerEvent {
        ServerEvent::Welcome {
            client_id,
            vehicles: &ROSTER,
            environment: self.environment,
            ramp: self.ramp,
        }
    }

    /// Marks a duel as running; only one at a time.
    pub fn try_begin_duel(&mut self) -> Result<()> {
        if self.duel_running {
            return Err(ServerError::DuelInProgress);
        }
        self.duel_running = true;
        Ok(())
    }

    pub fn finish_duel(&mut self, report: DuelReport) {
        self.duel_running = false;
        self.broadcast(&ServerEvent::Finished { report: Box::new(report.clone()) });
        self.last_report = Some(report);
    }

    /// Frees the duel slot after the runner died without a report.
    pub fn abort_duel(&mut self, reason: impl std::fmt::Display) {
        self.duel_running = false;
        self.broadcast(&ServerEvent::error(format!("duel aborted: {reason}")));
    }

    pub fn send_to(&self, id: &Uuid, event: &ServerEvent) {
        let Some(tx) = self.clients.get(id) else { return };
        if let Some(json) = event.to_json() {
            let _ = tx.send(json);
        }
    }

    pub fn broadcast(&self, event: &ServerEvent) {
        let Some(json) = event.to_json() else { return };
        for tx in self.clients.values() {
            let _ = tx.send(json.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_broadcast_reaches_all_clients() {
        let mut state = SharedDuelState::new(&ServerConfig::default());
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let id1 = state.register_client(tx1);
        state.register_client(tx2);

        state.broadcast(&ServerEvent::Pong);
        assert_eq!(rx1.try_recv().unwrap(), r#"{"type":"pong"}"#);
        assert_eq!(rx2.try_recv().unwrap(), r#"{"type":"pong"}"#);

        state.remove_client(&id1);
        state.broadcast(&ServerEvent::Pong);
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_send_to_single_client() {
        let mut state = SharedDuelState::new(&ServerConfig::default());
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let id1 = state.register_client(tx1);
        state.register_client(tx2);

        state.send_to(&id1, &ServerEvent::error("nope"));
        let msg: serde_json::Value = serde_json::from_str(&rx1.try_recv().unwrap()).unwrap();
        assert_eq!(msg["type"], "error");
        assert_eq!(msg["message"], "nope");
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn test_only_one_duel_at_a_time() {
        let mut state = SharedDuelState::new(&ServerConfig::default());
        assert!(state.try_begin_duel().is_ok());
        assert!(matches!(state.try_begin_duel(), Err(ServerError::DuelInProgress)));
    }

    #[test]
    fn test_abort_duel_frees_slot() {
        let mut state = SharedDuelState::new(&ServerConfig::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.register_client(tx);
        state.try_begin_duel().unwrap();

        state.abort_duel("runner panicked");
        assert!(!state.duel_running);
        assert!(state.last_report.is_none());
        let msg: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(msg["type"], "error");
        assert_eq!(msg["message"], "duel aborted: runner panicked");
        assert!(state.try_begin_duel().is_ok());
    }

    #[test]
    fn test_welcome_lists_roster() {
        let state = SharedDuelState::new(&ServerConfig::default());
        let json = state.welcome(Uuid::nil()).to_json().unwrap();
        let msg: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(msg["type"], "welcome");
        assert_eq!(msg["vehicles"][0]["key"], "celica");
        assert_eq!(msg["vehicles"][1]["spec"]["drive_type"], "FWD");
        assert_eq!(msg["environment"]["turn_radius"], 75.0);
    }
}

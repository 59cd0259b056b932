use std::net::SocketAddr;
use std::sync::Arc;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::race::{run_duel, DuelRequest, SweepMode};
use crate::state::{ServerEvent, SharedDuelState};
use crate::threshold::critical::find_critical_speed;
use crate::threshold::sweep::SpeedRamp;
use crate::vehicle::{preset, Preset, CARAVAN_2016, CELICA_2004};

fn default_a() -> String { CELICA_2004.key.to_string() }
fn default_b() -> String { CARAVAN_2016.key.to_string() }

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    Environment,
    SetFriction { value: f64 },
    SetTurnRadius { value: f64 },
    SetIgnoreSpinOut { value: bool },
    SetIgnoreRollover { value: bool },
    Start {
        #[serde(default)]
        mode: SweepMode,
        #[serde(default = "default_a")]
        a: String,
        #[serde(default = "default_b")]
        b: String,
        step: Option<f64>,
        start_speed: Option<f64>,
        max_speed: Option<f64>,
    },
    CriticalSpeed { vehicle: String },
}

fn lookup(key: &str) -> Result<&'static Preset> {
    preset(key).ok_or_else(|| ServerError::UnknownVehicle(key.to_string()))
}

/// Fills unset ramp fields from the session default.
fn ramp_from(
    base: SpeedRamp,
    start_speed: Option<f64>,
    max_speed: Option<f64>,
    step: Option<f64>,
) -> Result<SpeedRamp> {
    Ok(SpeedRamp::new(
        start_speed.unwrap_or(base.start()),
        max_speed.unwrap_or(base.max()),
        step.unwrap_or(base.step()),
    )?)
}

/// Applies one client message. Errors go back to that client only.
pub async fn handle_message(
    state: &Arc<Mutex<SharedDuelState>>,
    client_id: Uuid,
    msg: ClientMessage,
    tick: Duration,
) -> Result<()> {
    match msg {
        ClientMessage::Ping => {
            state.lock().await.send_to(&client_id, &ServerEvent::Pong);
        }
        ClientMessage::Environment => {
            let game = state.lock().await;
            game.send_to(&client_id, &ServerEvent::Environment { environment: game.environment });
        }
        ClientMessage::SetFriction { value } => {
            let mut game = state.lock().await;
            game.environment.set_friction_coefficient(value)?;
            info!(value, "friction coefficient set");
            game.broadcast(&ServerEvent::Environment { environment: game.environment });
        }
        ClientMessage::SetTurnRadius { value } => {
            let mut game = state.lock().await;
            game.environment.set_turn_radius(value)?;
            info!(value, "turn radius set");
            game.broadcast(&ServerEvent::Environment { environment: game.environment });
        }
        ClientMessage::SetIgnoreSpinOut { value } => {
            let mut game = state.lock().await;
            game.environment.set_ignore_spin_out(value);
            game.broadcast(&ServerEvent::Environment { environment: game.environment });
        }
        ClientMessage::SetIgnoreRollover { value } => {
            let mut game = state.lock().await;
            game.environment.set_ignore_rollover(value);
            game.broadcast(&ServerEvent::Environment { environment: game.environment });
        }
        ClientMessage::Start { mode, a, b, step, start_speed, max_speed } => {
            let a = lookup(&a)?;
            let b = lookup(&b)?;
            let ramp = {
                let mut game = state.lock().await;
                let ramp = ramp_from(game.ramp, start_speed, max_speed, step)?;
                game.try_begin_duel()?;
                ramp
            };
            let request = DuelRequest { mode, a, b, ramp, tick };
            let duel = tokio::spawn(run_duel(Arc::clone(state), request));
            tokio::spawn(supervise_duel(Arc::clone(state), duel));
        }
        ClientMessage::CriticalSpeed { vehicle } => {
            let vehicle = lookup(&vehicle)?;
            let game = state.lock().await;
            let result = find_critical_speed(&vehicle.spec, &game.environment);
            game.send_to(&client_id, &ServerEvent::CriticalSpeed { vehicle: vehicle.key, result });
        }
    }
    Ok(())
}

/// Releases the duel slot if the runner task panics or is cancelled.
async fn supervise_duel<T>(state: Arc<Mutex<SharedDuelState>>, duel: JoinHandle<T>) {
    if let Err(err) = duel.await {
        warn!(%err, "duel task failed");
        state.lock().await.abort_duel(&err);
    }
}

pub async fn start_websocket_server(state: Arc<Mutex<SharedDuelState>>, config: ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "WebSocket listening");

    let tick = Duration::from_millis(config.tick_ms);

    loop {
        let (raw, addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(%err, "accept failed");
                continue;
            }
        };
        tokio::spawn(handle_connection(raw, addr, Arc::clone(&state), tick));
    }
}

async fn handle_connection(raw: TcpStream, addr: SocketAddr, state: Arc<Mutex<SharedDuelState>>, tick: Duration) {
    let ws = match accept_async(raw).await {
        Ok(ws) => ws,
        Err(err) => {
            warn!(%addr, %err, "WebSocket handshake failed");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    // -------------------------------
    // 1) Outgoing channel + send loop
    // -------------------------------
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // -------------------------------
    // 2) Register + welcome
    // -------------------------------
    let client_id = {
        let mut game = state.lock().await;
        let id = game.register_client(tx);
        game.send_to(&id, &game.welcome(id));
        id
    };

    info!(%client_id, %addr, "client connected");

    // -------------------------------
    // 3) Receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(err) => {
                debug!(%client_id, %err, "read error");
                break;
            }
        };

        if msg.is_close() {
            break;
        }
        if !msg.is_text() {
            continue;
        }
        let Ok(text) = msg.to_text() else { continue };

        let parsed = match serde_json::from_str::<ClientMessage>(text) {
            Ok(parsed) => parsed,
            Err(err) => {
                state.lock().await.send_to(&client_id, &ServerEvent::error(&err));
                continue;
            }
        };

        debug!(%client_id, ?parsed, "client message");
        if let Err(err) = handle_message(&state, client_id, parsed, tick).await {
            warn!(%client_id, %err, "request rejected");
            state.lock().await.send_to(&client_id, &ServerEvent::error(&err));
        }
    }

    info!(%client_id, "client disconnected");
    state.lock().await.remove_client(&client_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParameterError;
    use tokio::time::timeout;

    fn shared() -> Arc<Mutex<SharedDuelState>> {
        Arc::new(Mutex::new(SharedDuelState::new(&ServerConfig::default())))
    }

    #[test]
    fn test_parse_client_messages() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Ping);

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"set_friction","value":0.4}"#).unwrap();
        assert_eq!(msg, ClientMessage::SetFriction { value: 0.4 });

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"start"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Start {
                mode: SweepMode::Synchronized,
                a: "celica".to_string(),
                b: "caravan".to_string(),
                step: None,
                start_speed: None,
                max_speed: None,
            }
        );

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"start","mode":"independent","step":0.5}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Start { mode: SweepMode::Independent, step: Some(0.5), .. }));

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"warp"}"#).is_err());
    }

    #[test]
    fn test_ramp_from_overrides() {
        let ramp = ramp_from(SpeedRamp::default(), None, Some(60.0), Some(0.5)).unwrap();
        assert_eq!(ramp.start(), 10.0);
        assert_eq!(ramp.max(), 60.0);
        assert_eq!(ramp.step(), 0.5);
        assert!(ramp_from(SpeedRamp::default(), Some(200.0), None, None).is_err());
    }

    #[tokio::test]
    async fn test_set_friction_rejects_non_positive() {
        let state = shared();
        let err = handle_message(&state, Uuid::nil(), ClientMessage::SetFriction { value: 0.0 }, Duration::ZERO).await;
        assert!(matches!(err, Err(ServerError::Parameter(_))));
        assert_eq!(state.lock().await.environment.friction_coefficient(), 0.7);

        handle_message(&state, Uuid::nil(), ClientMessage::SetFriction { value: 0.9 }, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(state.lock().await.environment.friction_coefficient(), 0.9);
    }

    #[tokio::test]
    async fn test_critical_speed_reply() {
        let state = shared();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = state.lock().await.register_client(tx);

        let msg = ClientMessage::CriticalSpeed { vehicle: "celica".to_string() };
        handle_message(&state, id, msg, Duration::ZERO).await.unwrap();

        let reply: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(reply["type"], "critical_speed");
        assert_eq!(reply["vehicle"], "celica");
        let speed = reply["result"]["critical_speed"].as_f64().unwrap();
        assert!((speed - 27.84).abs() < 0.1);
    }

    #[tokio::test]
    async fn test_unknown_vehicle_rejected() {
        let state = shared();
        let msg = ClientMessage::CriticalSpeed { vehicle: "delorean".to_string() };
        let err = handle_message(&state, Uuid::nil(), msg, Duration::ZERO).await;
        assert!(matches!(err, Err(ServerError::UnknownVehicle(k)) if k == "delorean"));
    }

    #[tokio::test]
    async fn test_second_start_rejected_while_running() {
        let state = shared();
        state.lock().await.try_begin_duel().unwrap();

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"start"}"#).unwrap();
        let err = handle_message(&state, Uuid::nil(), msg, Duration::ZERO).await;
        assert!(matches!(err, Err(ServerError::DuelInProgress)));
    }

    #[tokio::test]
    async fn test_extreme_step_rejected_and_slot_stays_free() {
        let state = shared();
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"start","step":1e-300}"#).unwrap();
        let err = handle_message(&state, Uuid::nil(), msg, Duration::ZERO).await;
        assert!(matches!(err, Err(ServerError::Parameter(ParameterError::TooManySteps { .. }))));
        assert!(!state.lock().await.duel_running);
    }

    #[tokio::test]
    async fn test_single_speed_duel_through_start() {
        let state = shared();
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.lock().await.register_client(tx);

        // both presets are past their spin-out onset at 40 mph
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"start","start_speed":40,"max_speed":40}"#).unwrap();
        handle_message(&state, Uuid::nil(), msg, Duration::ZERO).await.unwrap();

        let mut progress = 0;
        let report = loop {
            let raw = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
            let event: serde_json::Value = serde_json::from_str(&raw).unwrap();
            match event["type"].as_str() {
                Some("progress") => progress += 1,
                Some("finished") => break event["report"].clone(),
                _ => {}
            }
        };
        assert_eq!(progress, 2);
        assert_eq!(report["verdict"]["kind"], "tie");
        assert_eq!(report["a"]["outcome"]["speed"], 40.0);
        assert!(!state.lock().await.duel_running);
    }

    #[tokio::test]
    async fn test_panicked_duel_releases_slot() {
        let state = shared();
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.lock().await.register_client(tx);
        state.lock().await.try_begin_duel().unwrap();

        let duel = tokio::spawn(async { None::<u8>.unwrap_or_else(|| panic!("ramp exploded")) });
        supervise_duel(Arc::clone(&state), duel).await;

        assert!(!state.lock().await.duel_running);
        let event: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(event["type"], "error");
        assert!(state.lock().await.try_begin_duel().is_ok());
    }
}

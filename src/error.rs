//! Error types for parameter validation and the duel server.

use thiserror::Error;

/// Rejected vehicle / environment / sweep parameter.
///
/// Raised at construction or mutation time; values are never clamped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("{name} must be strictly positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must be a finite number")]
    NonFinite { name: &'static str },

    #[error("invalid speed range: min {min}, max {max}")]
    InvalidRange { min: f64, max: f64 },

    #[error("ramp of {steps} steps exceeds the limit of {limit}")]
    TooManySteps { steps: f64, limit: usize },
}

impl ParameterError {
    /// Checks `value` is finite and `> 0`.
    pub fn require_positive(name: &'static str, value: f64) -> std::result::Result<f64, ParameterError> {
        if !value.is_finite() {
            return Err(ParameterError::NonFinite { name });
        }
        if value <= 0.0 {
            return Err(ParameterError::NonPositive { name, value });
        }
        Ok(value)
    }
}

/// Errors surfaced by the WebSocket server and its configuration loader.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error("unknown vehicle: {0}")]
    UnknownVehicle(String),

    #[error("a duel is already running")]
    DuelInProgress,

    #[error("failed to read config {path}: {source}")]
    ConfigFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ServerError>;

//! Server configuration.
//!
//! Defaults match the stock duel: 0.0.0.0:9001, ~60 Hz step pacing, a
//! 10..150 mph ramp in 1 mph steps, μ = 0.7 on a 75 ft curve. A JSON file named
//! by `CORNER_DUEL_CONFIG` overrides any subset of fields; `CORNER_DUEL_BIND`
//! overrides the bind address last.

use serde::Deserialize;
use std::path::Path;

use crate::error::{Result, ServerError};
use crate::threshold::sweep::SpeedRamp;
use crate::threshold::types::EnvironmentParams;

pub const CONFIG_PATH_VAR: &str = "CORNER_DUEL_CONFIG";
pub const BIND_VAR: &str = "CORNER_DUEL_BIND";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Delay between sweep steps (ms).
    pub tick_ms: u64,
    pub ramp: SpeedRamp,
    pub environment: EnvironmentParams,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9001".to_string(),
            tick_ms: 16,
            ramp: SpeedRamp::default(),
            environment: EnvironmentParams::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ServerError::ConfigFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Resolves config from an optional file plus an optional bind override.
    pub fn resolve(path: Option<&Path>, bind_override: Option<String>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Some(bind) = bind_override {
            config.bind_addr = bind;
        }
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_VAR);
        let bind = std::env::var(BIND_VAR).ok();
        Self::resolve(path.as_deref().map(Path::new), bind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ServerConfig::from_json_str(r#"{"tick_ms": 250}"#).unwrap();
        assert_eq!(config.tick_ms, 250);
        assert_eq!(config.bind_addr, "0.0.0.0:9001");
        assert_eq!(config.ramp, SpeedRamp::default());
    }

    #[test]
    fn test_nested_sections_are_validated() {
        let config = ServerConfig::from_json_str(
            r#"{"ramp":{"start":20,"max":80,"step":0.5},
                "environment":{"friction_coefficient":0.4,"turn_radius":150}}"#,
        )
        .unwrap();
        assert_eq!(config.ramp.step(), 0.5);
        assert_eq!(config.environment.turn_radius(), 150.0);

        let err = ServerConfig::from_json_str(
            r#"{"environment":{"friction_coefficient":0.4,"turn_radius":-1}}"#,
        );
        assert!(matches!(err, Err(ServerError::Json(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(ServerConfig::from_json_str(r#"{"port": 9001}"#).is_err());
    }

    #[test]
    fn test_resolve_bind_override() {
        let config = ServerConfig::resolve(None, Some("127.0.0.1:7000".to_string())).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:7000");
        assert_eq!(config.tick_ms, 16);
    }

    #[test]
    fn test_resolve_missing_file() {
        let err = ServerConfig::resolve(Some(Path::new("/nonexistent/corner-duel.json")), None);
        assert!(matches!(err, Err(ServerError::ConfigFile { .. })));
    }
}

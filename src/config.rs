//! Planner configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ingest::RaggedRows;

/// Environment variable consulted by [`AsyncMatrixConfig::with_env_api_key`].
pub const API_KEY_ENV: &str = "ROUTE_PLANNER_API_KEY";

/// Transport profile sent to the matrix service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Truck,
    #[default]
    Driving,
    Taxi,
}

/// Cost-model variant sent to the matrix service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostModel {
    #[default]
    Jam,
    Statistics,
    Shortest,
}

/// Which remote backend a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// Asynchronous pairwise distance matrix.
    Matrix,
    /// Exact tour solver over a precomputed matrix.
    Tour,
}

/// Transport profile and cost model of one matrix request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixModes {
    pub transport: Transport,
    pub cost_model: CostModel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AsyncMatrixConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_version: String,
    pub transport: Transport,
    pub cost_model: CostModel,
    pub timeout_secs: u64,
}

impl Default for AsyncMatrixConfig {
    fn default() -> Self {
        Self {
            base_url: "https://routing.api.2gis.com".to_string(),
            api_key: String::new(),
            api_version: "2.0".to_string(),
            transport: Transport::default(),
            cost_model: CostModel::default(),
            timeout_secs: 10,
        }
    }
}

impl AsyncMatrixConfig {
    pub fn modes(&self) -> MatrixModes {
        MatrixModes {
            transport: self.transport,
            cost_model: self.cost_model,
        }
    }

    /// Fills `api_key` from the environment when it is unset.
    pub fn with_env_api_key(mut self) -> Self {
        if self.api_key.is_empty() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                self.api_key = key;
            }
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TourSolverConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for TourSolverConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000/solve".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Retry policy for the task status poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Wait between status queries while the task is queued or running.
    pub interval_secs: u64,
    /// Upper bound on status queries. `None` polls until done or canceled.
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            max_attempts: Some(120),
        }
    }
}

impl PollPolicy {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub matrix: AsyncMatrixConfig,
    pub tour: TourSolverConfig,
    pub poll: PollPolicy,
    /// Used to derive tour-mode durations, in km/h.
    pub average_speed_kmh: f64,
    pub ragged_rows: RaggedRows,
    pub tick_interval_ms: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            matrix: AsyncMatrixConfig::default(),
            tour: TourSolverConfig::default(),
            poll: PollPolicy::default(),
            average_speed_kmh: 15.0,
            ragged_rows: RaggedRows::default(),
            tick_interval_ms: 100,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl PlannerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Rejects values that would break duration math or the progress ticker.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.average_speed_kmh.is_finite() && self.average_speed_kmh > 0.0) {
            return Err(ConfigError::Invalid {
                field: "average_speed_kmh",
                reason: format!("must be a positive number, got {}", self.average_speed_kmh),
            });
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "tick_interval_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::default();
        assert_eq!(config.poll.interval_secs, 5);
        assert_eq!(config.average_speed_kmh, 15.0);
        assert_eq!(config.matrix.transport, Transport::Driving);
        assert_eq!(config.matrix.cost_model, CostModel::Jam);
        assert_eq!(config.ragged_rows, RaggedRows::Reject);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PlannerConfig::from_json_str(
            r#"{"matrix": {"transport": "truck", "cost_model": "shortest"}, "poll": {"max_attempts": null}}"#,
        )
        .unwrap();
        assert_eq!(config.matrix.transport, Transport::Truck);
        assert_eq!(config.matrix.cost_model, CostModel::Shortest);
        assert_eq!(config.matrix.timeout_secs, 10);
        assert_eq!(config.poll.max_attempts, None);
        assert_eq!(config.poll.interval_secs, 5);
        assert_eq!(config.tick_interval_ms, 100);
    }

    #[test]
    fn test_invalid_json_is_error() {
        let err = PlannerConfig::from_json_str(r#"{"matrix": {"transport": "rocket"}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_non_positive_speed_is_rejected() {
        for speed in ["0", "-15", "0.0"] {
            let json = format!(r#"{{"average_speed_kmh": {speed}}}"#);
            let err = PlannerConfig::from_json_str(&json).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { field: "average_speed_kmh", .. }),
                "speed {speed} accepted"
            );
        }
    }

    #[test]
    fn test_zero_tick_interval_is_rejected() {
        let err = PlannerConfig::from_json_str(r#"{"tick_interval_ms": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "tick_interval_ms", .. }));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(PlannerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_modes_follow_matrix_config() {
        let config = AsyncMatrixConfig {
            transport: Transport::Taxi,
            cost_model: CostModel::Statistics,
            ..AsyncMatrixConfig::default()
        };
        assert_eq!(
            config.modes(),
            MatrixModes {
                transport: Transport::Taxi,
                cost_model: CostModel::Statistics,
            }
        );
    }

    #[test]
    fn test_explicit_key_not_overridden_by_env() {
        let config = AsyncMatrixConfig {
            api_key: "explicit".to_string(),
            ..AsyncMatrixConfig::default()
        }
        .with_env_api_key();
        assert_eq!(config.api_key, "explicit");
    }
}

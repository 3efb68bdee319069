use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Invalid controller configuration
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("rate steps must not be empty")]
    NoRateSteps,

    #[error("rate step {0} must be positive and finite")]
    InvalidRateStep(f64),

    #[error("default rate {0} is not one of the configured steps")]
    DefaultRateNotAStep(f64),

    #[error("drift tolerance must be positive")]
    InvalidTolerance,
}

/// Tuning surface of the playback controller
///
/// The drift values are design defaults, not dictated by observed backend
/// behavior; hosts are expected to tune them per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Discrete playback-rate steps offered to the UI
    pub rate_steps: Vec<f64>,

    /// Rate applied when a session starts
    pub default_rate: f64,

    /// Maximum allowed position divergence before a resync, in seconds
    pub drift_tolerance: f64,

    /// Minimum interval between effective drift checks, in milliseconds
    ///
    /// Caps the externally-driven tick at roughly 4 Hz by default.
    pub drift_check_interval_ms: u64,

    /// Cooldown after a corrective seek of a member, in milliseconds
    pub resync_cooldown_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            rate_steps: vec![0.5, 1.0, 1.5, 2.0],
            default_rate: 1.0,
            drift_tolerance: 0.2,
            drift_check_interval_ms: 250,
            resync_cooldown_ms: 1000,
        }
    }
}

impl ControllerConfig {
    /// Check the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_steps.is_empty() {
            return Err(ConfigError::NoRateSteps);
        }
        for &step in &self.rate_steps {
            if !step.is_finite() || step <= 0.0 {
                return Err(ConfigError::InvalidRateStep(step));
            }
        }
        if !self.is_rate_step(self.default_rate) {
            return Err(ConfigError::DefaultRateNotAStep(self.default_rate));
        }
        if !self.drift_tolerance.is_finite() || self.drift_tolerance <= 0.0 {
            return Err(ConfigError::InvalidTolerance);
        }
        Ok(())
    }

    /// Whether the multiplier is one of the configured steps
    pub fn is_rate_step(&self, multiplier: f64) -> bool {
        self.rate_steps
            .iter()
            .any(|&step| (step - multiplier).abs() < 1e-9)
    }

    pub fn drift_check_interval(&self) -> Duration {
        Duration::from_millis(self.drift_check_interval_ms)
    }

    pub fn resync_cooldown(&self) -> Duration {
        Duration::from_millis(self.resync_cooldown_ms)
    }

    /// Parse a configuration from JSON
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse controller config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Self::from_json_str(&contents)
    }
}

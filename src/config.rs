use crate::controller::SignalTiming;
use crate::driver::SimulationConfig;
use crate::error::ConfigError;
use crate::metrics::DEFAULT_WINDOW;
use crate::models::ZScoreGuard;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Names a JSON settings file to load.
pub const CONFIG_PATH_VAR: &str = "SIGNAL_SIM_CONFIG";

/// Overrides the generator seed.
pub const SEED_VAR: &str = "SEED";

/// Process-wide settings, fixed at start-up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seeds synthetic telemetry; unseeded runs draw from system entropy.
    pub seed: Option<u64>,
    /// The number of values kept in each metrics window.
    pub window_capacity: usize,
    pub timing: SignalTiming,
    /// The run used when a start request gives no parameters.
    pub simulation: SimulationConfig,
    /// How long a restart waits for the previous loop to exit, in ms.
    pub restart_wait_ms: u64,
    pub anomaly: ZScoreGuard,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: Some(42),
            window_capacity: DEFAULT_WINDOW,
            timing: SignalTiming::default(),
            simulation: SimulationConfig::default(),
            restart_wait_ms: 1000,
            anomaly: ZScoreGuard::default(),
        }
    }
}

impl Settings {
    /// Loads settings from the file named by `SIGNAL_SIM_CONFIG`, if set,
    /// then applies a `SEED` override.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = match std::env::var_os(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Ok(seed) = std::env::var(SEED_VAR) {
            let seed = seed
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{} must be an integer", SEED_VAR)))?;
            settings.seed = Some(seed);
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn restart_wait(&self) -> Duration {
        Duration::from_millis(self.restart_wait_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let timing = &self.timing;
        if self.window_capacity == 0 {
            return Err(ConfigError::Invalid("window_capacity must be positive".into()));
        }
        let holds = [
            timing.min_green_seconds,
            timing.max_green_seconds,
            timing.emergency_preempt_seconds,
        ];
        if holds.iter().any(|t| t.is_nan() || *t < 0.0) {
            return Err(ConfigError::Invalid("hold times must be non-negative".into()));
        }
        if timing.min_green_seconds > timing.max_green_seconds {
            return Err(ConfigError::Invalid(
                "min_green_seconds must not exceed max_green_seconds".into(),
            ));
        }
        if self.simulation.duration_seconds == 0 {
            return Err(ConfigError::Invalid("simulation duration must be positive".into()));
        }
        Ok(())
    }
}

use serde::{Deserialize, Serialize};
use std::time::Duration;
use warden_core::{WardenError, WardenResult};

/// Tuning for the simulated executor, read from the `[execution]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Probability in `[0, 1]` that a task succeeds.
    #[serde(default = "default_success_probability")]
    pub success_probability: f64,
}

fn default_min_delay_ms() -> u64 {
    3_000
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_success_probability() -> f64 {
    0.9
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            success_probability: default_success_probability(),
        }
    }
}

impl ExecutionConfig {
    /// Zero-latency config with the given success probability.
    pub fn instant(success_probability: f64) -> Self {
        Self {
            min_delay_ms: 0,
            max_delay_ms: 0,
            success_probability,
        }
    }

    pub fn validate(&self) -> WardenResult<()> {
        if self.min_delay_ms > self.max_delay_ms {
            return Err(WardenError::Config(format!(
                "execution.min_delay_ms ({}) exceeds execution.max_delay_ms ({})",
                self.min_delay_ms, self.max_delay_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.success_probability) {
            return Err(WardenError::Config(format!(
                "execution.success_probability must be within [0, 1], got {}",
                self.success_probability
            )));
        }
        Ok(())
    }

    pub fn delay_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use super::invalid;
use crate::JobState;
use crate::Result;

/// Job monitoring cadence
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Time between two polls of the job state (unit: milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Wall-clock budget for the whole monitor run, unbounded when absent
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// States that trigger a notification. Empty means every state.
    #[serde(default)]
    pub notify_states: Vec<JobState>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_ms: None,
            notify_states: Vec::new(),
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn notify_state_set(&self) -> HashSet<JobState> {
        if self.notify_states.is_empty() {
            JobState::ALL.into_iter().collect()
        } else {
            self.notify_states.iter().copied().collect()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(invalid("monitor.poll_interval_ms must be greater than 0".into()));
        }
        if self.timeout_ms == Some(0) {
            return Err(invalid("monitor.timeout_ms must be greater than 0 when set".into()));
        }
        Ok(())
    }
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

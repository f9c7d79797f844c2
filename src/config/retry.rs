use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use super::invalid;
use crate::Result;

/// Basic retry policy template
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Maximum number of attempts, first one included
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Single attempt timeout (unit: milliseconds)
    #[serde(default = "default_op_timeout_ms")]
    pub timeout_ms: u64,

    /// Backoff base (unit: milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum backoff time (unit: milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout_ms: default_op_timeout_ms(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl BackoffPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay before attempt `attempt + 1`, doubling from the base and capped at the max.
    pub fn delay_for(
        &self,
        attempt: usize,
    ) -> Duration {
        let factor = 1u64.checked_shl(attempt.min(32) as u32).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    pub fn validate(
        &self,
        name: &str,
    ) -> Result<()> {
        if self.max_retries == 0 {
            return Err(invalid(format!("retry.{name}.max_retries must be at least 1")));
        }
        if self.timeout_ms == 0 {
            return Err(invalid(format!("retry.{name}.timeout_ms must be greater than 0")));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(invalid(format!(
                "retry.{name}.base_delay_ms ({}) exceeds max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }
}

/// Divide strategies by remote collaborator
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetryPolicies {
    // Job state queries against the Tamr operations API
    #[serde(default = "default_job_poll")]
    pub job_poll: BackoffPolicy,

    // Notification delivery (chat, webhook, smtp)
    #[serde(default = "default_dispatch")]
    pub dispatch: BackoffPolicy,

    // Shell commands on the instance (ssh connectivity)
    #[serde(default = "default_admin_command")]
    pub admin_command: BackoffPolicy,
}

impl Default for RetryPolicies {
    fn default() -> Self {
        Self {
            job_poll: default_job_poll(),
            dispatch: default_dispatch(),
            admin_command: default_admin_command(),
        }
    }
}

impl RetryPolicies {
    pub fn validate(&self) -> Result<()> {
        self.job_poll.validate("job_poll")?;
        self.dispatch.validate("dispatch")?;
        self.admin_command.validate("admin_command")?;
        Ok(())
    }
}

fn default_job_poll() -> BackoffPolicy {
    BackoffPolicy {
        max_retries: 5,
        timeout_ms: 10_000,
        base_delay_ms: 500,
        max_delay_ms: 8_000,
    }
}
fn default_dispatch() -> BackoffPolicy {
    BackoffPolicy {
        max_retries: 3,
        timeout_ms: 15_000,
        base_delay_ms: 1_000,
        max_delay_ms: 4_000,
    }
}
fn default_admin_command() -> BackoffPolicy {
    BackoffPolicy {
        max_retries: 2,
        // admin tool calls can take minutes on a busy instance
        timeout_ms: 600_000,
        base_delay_ms: 2_000,
        max_delay_ms: 10_000,
    }
}
fn default_max_retries() -> usize {
    3
}
fn default_op_timeout_ms() -> u64 {
    10_000
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    8_000
}

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use serde::Deserialize;
use serde::Serialize;

use crate::JobPollError;

/// Lifecycle state of a Tamr operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Submitted and waiting to begin running
    Pending,
    /// Active
    Running,
    /// Completed successfully
    Succeeded,
    /// Terminated due to an error
    Failed,
    /// Terminated by a user or the job service
    Canceled,
}

impl JobState {
    pub const ALL: [JobState; 5] = [
        JobState::Pending,
        JobState::Running,
        JobState::Succeeded,
        JobState::Failed,
        JobState::Canceled,
    ];

    pub const TERMINAL: [JobState; 3] = [JobState::Succeeded, JobState::Failed, JobState::Canceled];

    /// No transition ever leaves a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed | JobState::Canceled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Running => "RUNNING",
            JobState::Succeeded => "SUCCEEDED",
            JobState::Failed => "FAILED",
            JobState::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = JobPollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(JobState::Pending),
            "RUNNING" => Ok(JobState::Running),
            "SUCCEEDED" => Ok(JobState::Succeeded),
            "FAILED" => Ok(JobState::Failed),
            // the job service has used both spellings
            "CANCELED" | "CANCELLED" => Ok(JobState::Canceled),
            other => Err(JobPollError::InvalidResponse(format!("unknown job state '{other}'"))),
        }
    }
}

/// Identifier of a remote long-running operation. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        JobHandle(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobHandle {
    fn from(id: &str) -> Self {
        JobHandle(id.to_string())
    }
}

impl From<String> for JobHandle {
    fn from(id: String) -> Self {
        JobHandle(id)
    }
}

impl From<u64> for JobHandle {
    fn from(id: u64) -> Self {
        JobHandle(id.to_string())
    }
}

/// One observation of a job, as returned by the job service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub handle: JobHandle,
    pub state: JobState,
    pub description: Option<String>,
}

impl JobStatus {
    pub fn new(
        handle: impl Into<JobHandle>,
        state: JobState,
    ) -> Self {
        JobStatus {
            handle: handle.into(),
            state,
            description: None,
        }
    }

    pub fn with_description(
        mut self,
        description: impl Into<String>,
    ) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A detected state change of one job.
///
/// Created only when the monitor observes a state different from the previous
/// observation. `previous_state` is `None` for the first observation of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    job: JobHandle,
    previous_state: Option<JobState>,
    new_state: JobState,
    description: Option<String>,
    observed_at: SystemTime,
}

impl NotificationEvent {
    pub fn new(
        status: &JobStatus,
        previous_state: Option<JobState>,
        observed_at: SystemTime,
    ) -> Self {
        NotificationEvent {
            job: status.handle.clone(),
            previous_state,
            new_state: status.state,
            description: status.description.clone(),
            observed_at,
        }
    }

    pub fn job(&self) -> &JobHandle {
        &self.job
    }

    pub fn previous_state(&self) -> Option<JobState> {
        self.previous_state
    }

    pub fn new_state(&self) -> JobState {
        self.new_state
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn observed_at(&self) -> SystemTime {
        self.observed_at
    }

    /// Snapshot of the job as it was when the transition was observed
    pub fn status(&self) -> JobStatus {
        JobStatus {
            handle: self.job.clone(),
            state: self.new_state,
            description: self.description.clone(),
        }
    }
}

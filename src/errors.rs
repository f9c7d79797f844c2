//! Toolbox Error Hierarchy
//!
//! Errors are grouped by the external collaborator that produced them: the job
//! query service, the notification transports, the shell/ssh command layer and
//! the instance configuration host. A monitor timeout is not an error but a
//! normal exit of the monitor stream, see [`crate::MonitorExit`].

use std::time::Duration;

use config::ConfigError;

use crate::JobHandle;
use crate::JobState;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Settings loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Job query service failures
    #[error(transparent)]
    JobPoll(#[from] JobPollError),

    /// Notification delivery failures
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Local or remote shell command failures
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Instance configuration host failures
    #[error(transparent)]
    ConfigStore(#[from] ConfigStoreError),

    /// Config reconciliation failures
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// A job reached a terminal state other than SUCCEEDED
    #[error("Job {handle} ended in state {state}. Description: {}", .description.as_deref().unwrap_or("-"))]
    JobFailed {
        handle: JobHandle,
        state: JobState,
        description: Option<String>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobPollError {
    /// The job service does not know this job. Caller error, never retried.
    #[error("Job {0} does not exist")]
    NotFound(JobHandle),

    /// Credentials rejected by the job service. Never retried.
    #[error("Job service rejected credentials (HTTP {0})")]
    Unauthorized(u16),

    /// Network hiccup or 5xx from the job service
    #[error("Transient failure polling job service: {0}")]
    Transient(String),

    /// A single poll attempt exceeded its time budget
    #[error("Poll attempt timed out after {0:?}")]
    AttemptTimeout(Duration),

    /// Response could not be decoded into a job status
    #[error("Invalid job service response: {0}")]
    InvalidResponse(String),

    /// Retry policy exhaustion
    #[error("Polling gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<JobPollError>,
    },
}

impl JobPollError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, JobPollError::Transient(_) | JobPollError::AttemptTimeout(_))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    /// Channel unreachable or returned a server-side error
    #[error("Transport error sending to {channel}: {message}")]
    Transport { channel: String, message: String },

    /// Channel accepted the request but refused the message
    #[error("{channel} rejected the message: {message}")]
    Rejected { channel: String, message: String },

    /// Notifier cannot be built from the supplied settings
    #[error("Invalid notifier configuration: {0}")]
    InvalidConfiguration(String),

    /// A single delivery attempt exceeded its time budget
    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),

    /// Retry policy exhaustion
    #[error("Delivery gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<DispatchError>,
    },

    /// Several channels failed; each one already went through its own retries
    #[error("{} channels failed: {}", .0.len(), .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Channels(Vec<DispatchError>),
}

impl DispatchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::Transport { .. } | DispatchError::Timeout(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The process could not be started at all
    #[error("Failed to start command [{command}] on {target}: {source}")]
    Spawn {
        command: String,
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// ssh could not reach the remote machine
    #[error("Could not connect to {target}: {message}")]
    Connection { target: String, message: String },

    /// Command ran but failed while success was enforced
    #[error(
        "Failed to run command on {target}. Command: [{command}] exited with code {exit_code}.\nSTDOUT: [{stdout}]\nSTDERR: [{stderr}]"
    )]
    NonZeroExit {
        target: String,
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    /// Process was killed before reporting an exit code
    #[error("Command [{command}] on {target} was terminated by a signal")]
    Terminated { command: String, target: String },

    /// A single attempt exceeded its time budget
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// Retry policy exhaustion
    #[error("Command gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<CommandError>,
    },
}

impl CommandError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, CommandError::Connection { .. } | CommandError::Timeout(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigStoreError {
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Admin tool output is not a `KEY: value` document
    #[error("Could not parse config output: {0}")]
    Parse(String),

    /// Value cannot be represented on the admin tool command line
    #[error("Invalid value for config {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Host applied some keys before failing
    #[error("Config host applied {applied:?} before failing: {source}")]
    PartialApply {
        applied: Vec<String>,
        #[source]
        source: Box<ConfigStoreError>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Nothing to reconcile
    #[error("Reconcile request contains no config changes")]
    EmptyRequest,

    /// Caller error: requested keys are not part of the host schema. Nothing was applied.
    #[error("Unknown config key(s): {}", .0.join(", "))]
    UnknownConfigKey(Vec<String>),

    /// Reading a snapshot failed; nothing is known to be applied
    #[error("Failed to read config snapshot: {0}")]
    Snapshot(#[source] ConfigStoreError),

    /// Apply failed; `applied` lists the requested keys that did take effect
    #[error("Config apply failed after applying {applied:?}: {source}")]
    PartialApply {
        applied: Vec<String>,
        #[source]
        source: ConfigStoreError,
    },
}

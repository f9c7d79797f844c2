use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;

use futures::stream;
use futures::Stream;
use tokio::time::sleep;
use tokio::time::sleep_until;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::TransitionTracker;
use crate::metrics::JOB_POLLS;
use crate::metrics::JOB_TRANSITIONS;
use crate::utils::async_task::task_with_timeout_and_exponential_backoff;
use crate::BackoffPolicy;
use crate::JobClient;
use crate::JobHandle;
use crate::JobPollError;
use crate::JobState;
use crate::JobStatus;
use crate::MonitorConfig;
use crate::NotificationEvent;
use crate::RetryPolicies;

/// Scheduling contract of one monitor run
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Time between two polls
    pub poll_interval: Duration,
    /// Wall-clock budget of the run, measured from the first poll
    pub timeout: Option<Duration>,
    /// States worth a [`MonitorEvent::Transition`]
    pub notify_states: HashSet<JobState>,
    /// Retry policy of a single poll
    pub retry: BackoffPolicy,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self::from_config(&MonitorConfig::default(), &RetryPolicies::default())
    }
}

impl MonitorOptions {
    pub fn from_config(
        monitor: &MonitorConfig,
        retry: &RetryPolicies,
    ) -> Self {
        MonitorOptions {
            poll_interval: monitor.poll_interval(),
            timeout: monitor.timeout(),
            notify_states: monitor.notify_state_set(),
            retry: retry.job_poll,
        }
    }

    /// Restricts notifications to `states`; an empty set restores every state.
    pub fn with_notify_states(
        mut self,
        states: impl IntoIterator<Item = JobState>,
    ) -> Self {
        self.notify_states = states.into_iter().collect();
        if self.notify_states.is_empty() {
            self.notify_states = JobState::ALL.into_iter().collect();
        }
        self
    }

    pub fn with_poll_interval(
        mut self,
        poll_interval: Duration,
    ) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timeout(
        mut self,
        timeout: Option<Duration>,
    ) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(
        mut self,
        retry: BackoffPolicy,
    ) -> Self {
        self.retry = retry;
        self
    }

    pub fn should_notify(
        &self,
        state: JobState,
    ) -> bool {
        self.notify_states.contains(&state)
    }
}

/// Item of a monitor stream
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// State changed into one of the notify states
    Transition(NotificationEvent),
    /// Last item of the stream
    Exit(MonitorExit),
}

/// Why a monitor run ended. None of these is an error.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorExit {
    /// The job reached SUCCEEDED, FAILED or CANCELED
    Terminal { status: JobStatus },
    /// The wall-clock budget elapsed before a terminal state
    Timeout {
        last_status: Option<JobStatus>,
        elapsed: Duration,
    },
    /// The caller's cancellation token fired
    Cancelled { last_status: Option<JobStatus> },
}

impl MonitorExit {
    pub fn last_status(&self) -> Option<&JobStatus> {
        match self {
            MonitorExit::Terminal { status } => Some(status),
            MonitorExit::Timeout { last_status, .. } | MonitorExit::Cancelled { last_status } => {
                last_status.as_ref()
            }
        }
    }

    pub fn last_state(&self) -> Option<JobState> {
        self.last_status().map(|s| s.state)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MonitorExit::Terminal { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, MonitorExit::Timeout { .. })
    }
}

pub type MonitorItem = std::result::Result<MonitorEvent, JobPollError>;

/// Polls one remote job until it is terminal, the budget elapses, or the caller cancels.
pub struct JobMonitor<C: JobClient + ?Sized> {
    client: Arc<C>,
    options: MonitorOptions,
}

impl<C: JobClient + ?Sized> JobMonitor<C> {
    pub fn new(
        client: Arc<C>,
        options: MonitorOptions,
    ) -> Self {
        JobMonitor { client, options }
    }

    pub fn options(&self) -> &MonitorOptions {
        &self.options
    }

    /// Lazy, finite stream of monitor events for `handle`.
    ///
    /// Nothing is polled until the stream is first driven. The stream ends with
    /// exactly one [`MonitorEvent::Exit`], or with a single `Err` when polling
    /// fails permanently or exhausts its retries.
    pub fn watch(
        &self,
        handle: JobHandle,
        cancel: CancellationToken,
    ) -> impl Stream<Item = MonitorItem> + Send + 'static {
        let run = MonitorRun {
            client: self.client.clone(),
            options: self.options.clone(),
            handle,
            cancel,
            tracker: TransitionTracker::new(),
            last_status: None,
            started: None,
            pending: VecDeque::new(),
            phase: Phase::Poll,
        };
        stream::unfold(run, |mut run| async move {
            let item = run.next_item().await?;
            Some((item, run))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Poll,
    Wait,
    Done,
}

enum Wake<T> {
    Cancelled,
    Deadline,
    Ready(T),
}

struct MonitorRun<C: JobClient + ?Sized> {
    client: Arc<C>,
    options: MonitorOptions,
    handle: JobHandle,
    cancel: CancellationToken,
    tracker: TransitionTracker,
    last_status: Option<JobStatus>,
    started: Option<Instant>,
    pending: VecDeque<MonitorItem>,
    phase: Phase,
}

impl<C: JobClient + ?Sized> MonitorRun<C> {
    async fn next_item(&mut self) -> Option<MonitorItem> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            match self.phase {
                Phase::Done => return None,
                Phase::Poll => self.tick().await,
                Phase::Wait => self.wait().await,
            }
        }
    }

    fn deadline(&mut self) -> Option<Instant> {
        let started = *self.started.get_or_insert_with(Instant::now);
        self.options.timeout.map(|t| started + t)
    }

    async fn tick(&mut self) {
        let deadline = self.deadline();
        let cancel = self.cancel.clone();
        if cancel.is_cancelled() {
            self.exit_cancelled();
            return;
        }

        let client = self.client.clone();
        let handle = self.handle.clone();
        let poll = task_with_timeout_and_exponential_backoff(
            move || {
                let client = client.clone();
                let handle = handle.clone();
                async move { client.get_job(&handle).await }
            },
            self.options.retry,
        );

        let wake = tokio::select! {
            biased;
            _ = cancel.cancelled() => Wake::Cancelled,
            _ = sleep_until_deadline(deadline) => Wake::Deadline,
            result = poll => Wake::Ready(result),
        };

        match wake {
            Wake::Cancelled => self.exit_cancelled(),
            Wake::Deadline => self.exit_timeout(),
            Wake::Ready(Err(e)) => {
                JOB_POLLS.with_label_values(&["error"]).inc();
                warn!(job = %self.handle, "giving up on job: {}", e);
                self.pending.push_back(Err(e));
                self.phase = Phase::Done;
            }
            Wake::Ready(Ok(status)) => {
                JOB_POLLS.with_label_values(&["ok"]).inc();
                self.observe(status);
            }
        }
    }

    fn observe(
        &mut self,
        status: JobStatus,
    ) {
        debug!(job = %self.handle, state = %status.state, "polled job");
        if let Some(transition) = self.tracker.observe(status.state) {
            JOB_TRANSITIONS.with_label_values(&[status.state.as_str()]).inc();
            info!(
                job = %self.handle,
                from = ?transition.from,
                to = %transition.to,
                "job state changed"
            );
            if self.options.should_notify(transition.to) {
                let event = NotificationEvent::new(&status, transition.from, SystemTime::now());
                self.pending.push_back(Ok(MonitorEvent::Transition(event)));
            }
        }

        self.last_status = Some(status.clone());
        if status.state.is_terminal() {
            self.pending
                .push_back(Ok(MonitorEvent::Exit(MonitorExit::Terminal { status })));
            self.phase = Phase::Done;
        } else {
            self.phase = Phase::Wait;
        }
    }

    async fn wait(&mut self) {
        let deadline = self.deadline();
        let cancel = self.cancel.clone();
        let wake = tokio::select! {
            biased;
            _ = cancel.cancelled() => Wake::Cancelled,
            _ = sleep_until_deadline(deadline) => Wake::Deadline,
            _ = sleep(self.options.poll_interval) => Wake::Ready(()),
        };
        match wake {
            Wake::Cancelled => self.exit_cancelled(),
            Wake::Deadline => self.exit_timeout(),
            Wake::Ready(()) => self.phase = Phase::Poll,
        }
    }

    fn exit_cancelled(&mut self) {
        info!(job = %self.handle, "monitor cancelled");
        self.pending.push_back(Ok(MonitorEvent::Exit(MonitorExit::Cancelled {
            last_status: self.last_status.clone(),
        })));
        self.phase = Phase::Done;
    }

    fn exit_timeout(&mut self) {
        let elapsed = self.started.map(|s| s.elapsed()).unwrap_or_default();
        info!(job = %self.handle, ?elapsed, "monitor timed out");
        self.pending.push_back(Ok(MonitorEvent::Exit(MonitorExit::Timeout {
            last_status: self.last_status.clone(),
            elapsed,
        })));
        self.phase = Phase::Done;
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

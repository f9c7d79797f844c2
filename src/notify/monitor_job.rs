use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use super::NotificationDispatcher;
use crate::DispatchError;
use crate::Error;
use crate::JobClient;
use crate::JobHandle;
use crate::JobMonitor;
use crate::MonitorEvent;
use crate::MonitorExit;
use crate::MonitorOptions;
use crate::NotificationEvent;
use crate::Result;

/// One attempted notification
#[derive(Debug, Clone)]
pub struct Delivery {
    pub title: String,
    /// The transition announced, `None` for the timeout message
    pub event: Option<NotificationEvent>,
    pub outcome: std::result::Result<(), DispatchError>,
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Outcome of [`monitor_job`]
#[derive(Debug, Clone)]
pub struct MonitorReport {
    pub exit: MonitorExit,
    pub deliveries: Vec<Delivery>,
}

impl MonitorReport {
    pub fn failed_deliveries(&self) -> impl Iterator<Item = &Delivery> {
        self.deliveries.iter().filter(|d| !d.is_delivered())
    }
}

pub fn timeout_title(handle: &JobHandle) -> String {
    format!("Job {}: Timeout", handle)
}

pub fn timeout_body(
    handle: &JobHandle,
    description: Option<&str>,
    timeout: Duration,
) -> String {
    format!(
        "The job {}: {} took longer than {} seconds to resolve.",
        handle,
        description.unwrap_or(""),
        timeout.as_secs_f64()
    )
}

/// Monitors `handle` and notifies every transition into a notify state.
///
/// A failed delivery is logged and recorded in the report; monitoring goes on.
/// When the wall-clock budget elapses a single timeout message is sent.
/// Only polling failures end the run with an error.
#[instrument(skip(client, dispatcher, options, cancel), fields(job = %handle))]
pub async fn monitor_job<C: JobClient + ?Sized>(
    client: Arc<C>,
    dispatcher: &NotificationDispatcher,
    handle: JobHandle,
    options: MonitorOptions,
    cancel: CancellationToken,
) -> Result<MonitorReport> {
    let timeout = options.timeout;
    let monitor = JobMonitor::new(client, options);
    let mut events = pin!(monitor.watch(handle.clone(), cancel));
    let mut deliveries = Vec::new();

    while let Some(item) = events.next().await {
        match item? {
            MonitorEvent::Transition(event) => {
                let title = NotificationDispatcher::title(&event);
                let outcome = dispatcher.dispatch(&event).await;
                if let Err(e) = &outcome {
                    warn!(job = %handle, "could not deliver {}: {}", title, e);
                }
                deliveries.push(Delivery {
                    title,
                    event: Some(event),
                    outcome,
                });
            }
            MonitorEvent::Exit(exit) => {
                if let (MonitorExit::Timeout { last_status, .. }, Some(timeout)) = (&exit, timeout) {
                    let description = last_status.as_ref().and_then(|s| s.description.as_deref());
                    let title = timeout_title(&handle);
                    let body = timeout_body(&handle, description, timeout);
                    let outcome = dispatcher.send(&title, &body).await;
                    if let Err(e) = &outcome {
                        warn!(job = %handle, "could not deliver timeout message: {}", e);
                    }
                    deliveries.push(Delivery {
                        title,
                        event: None,
                        outcome,
                    });
                }
                info!(job = %handle, last_state = ?exit.last_state(), "monitoring finished");
                return Ok(MonitorReport { exit, deliveries });
            }
        }
    }

    Err(Error::Fatal(format!("monitor stream for job {} ended without an exit", handle)))
}

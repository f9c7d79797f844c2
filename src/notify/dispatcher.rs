use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use super::Notifier;
use crate::job_details;
use crate::metrics::NOTIFICATION_DELIVERIES;
use crate::utils::async_task::task_with_timeout_and_exponential_backoff;
use crate::BackoffPolicy;
use crate::DispatchError;
use crate::NotificationEvent;

/// Formats job events and hands them to every channel, retrying transient failures.
///
/// Each channel is retried on its own, so a channel that already accepted a
/// message never receives it again because another channel failed.
pub struct NotificationDispatcher {
    channels: Vec<Arc<dyn Notifier>>,
    host: String,
    retry: BackoffPolicy,
}

impl NotificationDispatcher {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        host: impl Into<String>,
        retry: BackoffPolicy,
    ) -> Self {
        Self::with_channels(vec![notifier], host, retry)
    }

    pub fn with_channels(
        channels: Vec<Arc<dyn Notifier>>,
        host: impl Into<String>,
        retry: BackoffPolicy,
    ) -> Self {
        NotificationDispatcher {
            channels,
            host: host.into(),
            retry,
        }
    }

    /// Channel names joined with `,`
    pub fn channel_names(&self) -> String {
        self.channels.iter().map(|c| c.name()).collect::<Vec<_>>().join(",")
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Title of the message announcing `event`
    pub fn title(event: &NotificationEvent) -> String {
        format!("Job {}: {}", event.job(), event.new_state())
    }

    /// Delivers one message per call. The final failure is returned, not swallowed.
    pub async fn dispatch(
        &self,
        event: &NotificationEvent,
    ) -> std::result::Result<(), DispatchError> {
        let title = Self::title(event);
        let body = job_details(&self.host, &event.status());
        self.send(&title, &body).await
    }

    /// Sends a free-form message to every channel through the same retry policy.
    ///
    /// A single failing channel keeps its own error; several become [`DispatchError::Channels`].
    pub async fn send(
        &self,
        title: &str,
        body: &str,
    ) -> std::result::Result<(), DispatchError> {
        let mut failures = Vec::new();
        for channel in &self.channels {
            if let Err(e) = self.send_to(channel, title, body).await {
                failures.push(e);
            }
        }
        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(DispatchError::Channels(failures)),
        }
    }

    async fn send_to(
        &self,
        channel: &Arc<dyn Notifier>,
        title: &str,
        body: &str,
    ) -> std::result::Result<(), DispatchError> {
        let result = task_with_timeout_and_exponential_backoff(
            || {
                let channel = channel.clone();
                async move { channel.send_message(title, body).await }
            },
            self.retry,
        )
        .await;

        match &result {
            Ok(()) => {
                NOTIFICATION_DELIVERIES.with_label_values(&["ok"]).inc();
                debug!(channel = %channel.name(), %title, "notification delivered");
            }
            Err(e) => {
                NOTIFICATION_DELIVERIES.with_label_values(&["error"]).inc();
                warn!(channel = %channel.name(), %title, "notification failed: {}", e);
            }
        }
        result
    }
}

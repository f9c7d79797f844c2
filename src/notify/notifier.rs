use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::info;

use super::EmailNotifier;
use super::SlackNotifier;
use super::TeamsNotifier;
use crate::DispatchError;
use crate::NotificationsConfig;

/// A channel able to deliver a short text message.
///
/// Delivery is at-least-once at best: transports may retry on their side.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send_message(
        &self,
        title: &str,
        body: &str,
    ) -> std::result::Result<(), DispatchError>;

    /// Channel description for logs, e.g. `slack:#alerts`
    fn name(&self) -> String;
}

/// Writes messages to the log only. Used when no channel is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_message(
        &self,
        title: &str,
        body: &str,
    ) -> std::result::Result<(), DispatchError> {
        info!(%title, "{}", body);
        Ok(())
    }

    fn name(&self) -> String {
        "log".to_string()
    }
}

/// Builds one notifier per configured channel, or the log when none is configured.
pub fn build_notifiers(config: &NotificationsConfig) -> std::result::Result<Vec<Arc<dyn Notifier>>, DispatchError> {
    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
    if let Some(slack) = &config.slack {
        notifiers.push(Arc::new(SlackNotifier::new(slack.clone())));
    }
    if let Some(teams) = &config.teams {
        notifiers.push(Arc::new(TeamsNotifier::new(teams.clone())));
    }
    if let Some(email) = &config.email {
        notifiers.push(Arc::new(EmailNotifier::new(email)?));
    }
    if notifiers.is_empty() {
        notifiers.push(Arc::new(LogNotifier));
    }
    Ok(notifiers)
}

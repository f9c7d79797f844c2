//! Notification delivery.
//!
//! [`NotificationDispatcher`] turns [`crate::NotificationEvent`]s into messages
//! and hands them to a [`Notifier`] backend: Slack, Teams, email, or the log.
//! [`monitor_job`] wires a [`crate::JobMonitor`] to a dispatcher.
mod dispatcher;
mod email;
mod monitor_job;
mod notifier;
mod slack;
mod teams;

pub use dispatcher::*;
pub use email::*;
pub use monitor_job::*;
pub use notifier::*;
pub use slack::*;
pub use teams::*;

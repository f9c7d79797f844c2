use serde::Deserialize;
use serde::Serialize;

use super::invalid;
use crate::Result;

/// Notification channels. Every channel is optional; several may be active at once.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct NotificationsConfig {
    /// Host name printed in job messages. Falls back to the instance base URL.
    #[serde(default)]
    pub host_label: Option<String>,

    #[serde(default)]
    pub slack: Option<SlackConfig>,

    #[serde(default)]
    pub teams: Option<TeamsConfig>,

    #[serde(default)]
    pub email: Option<EmailConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SlackConfig {
    /// Bot token (`xoxb-...`)
    pub token: String,

    /// Public channel receiving the messages, e.g. `#pipeline-alerts`
    pub channel: String,

    #[serde(default = "default_slack_api_url")]
    pub api_url: String,

    #[serde(default = "default_bot_username")]
    pub username: String,

    #[serde(default = "default_bot_icon_url")]
    pub icon_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TeamsConfig {
    /// Incoming webhook URL of the Teams channel
    pub webhook_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EmailConfig {
    /// e.g. `smtp.gmail.com`
    pub smtp_server: String,

    /// 587 for STARTTLS, 465 for implicit TLS
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// STARTTLS on a plain connection when true, implicit TLS when false
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,

    pub sender_address: String,

    #[serde(default)]
    pub sender_password: Option<String>,

    pub recipient_addresses: Vec<String>,

    #[serde(default)]
    pub cc_addresses: Vec<String>,

    #[serde(default)]
    pub bcc_addresses: Vec<String>,
}

impl NotificationsConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(slack) = &self.slack {
            if slack.token.is_empty() || slack.channel.is_empty() {
                return Err(invalid("notifications.slack requires token and channel".into()));
            }
        }
        if let Some(teams) = &self.teams {
            if !teams.webhook_url.starts_with("https://") {
                return Err(invalid(format!(
                    "notifications.teams.webhook_url must be an https URL, got {}",
                    teams.webhook_url
                )));
            }
        }
        if let Some(email) = &self.email {
            if email.recipient_addresses.is_empty() {
                return Err(invalid("notifications.email.recipient_addresses cannot be empty".into()));
            }
            if email.smtp_server.is_empty() {
                return Err(invalid("notifications.email.smtp_server cannot be empty".into()));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.slack.is_none() && self.teams.is_none() && self.email.is_none()
    }
}

fn default_slack_api_url() -> String {
    "https://slack.com/api".to_string()
}
fn default_bot_username() -> String {
    "Tamr Notifications Bot".to_string()
}
fn default_bot_icon_url() -> String {
    "https://www.tamr.com/favicon.png".to_string()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_use_tls() -> bool {
    true
}

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use serde_json::Value;

use super::Notifier;
use crate::DispatchError;
use crate::TeamsConfig;

/// Posts MessageCards to a Microsoft Teams incoming webhook
pub struct TeamsNotifier {
    http: reqwest::Client,
    config: TeamsConfig,
}

impl TeamsNotifier {
    pub fn new(config: TeamsConfig) -> Self {
        TeamsNotifier {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub(crate) fn card(
        title: &str,
        body: &str,
    ) -> Value {
        json!({
            "@type": "MessageCard",
            "@context": "https://schema.org/extensions",
            "summary": title,
            "title": title,
            "text": body,
        })
    }

    pub(crate) fn classify(
        &self,
        status: StatusCode,
    ) -> std::result::Result<(), DispatchError> {
        if status.is_success() {
            Ok(())
        } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Err(DispatchError::Transport {
                channel: self.name(),
                message: format!("HTTP {}", status),
            })
        } else {
            Err(DispatchError::Rejected {
                channel: self.name(),
                message: format!("HTTP {}", status),
            })
        }
    }
}

#[async_trait]
impl Notifier for TeamsNotifier {
    async fn send_message(
        &self,
        title: &str,
        body: &str,
    ) -> std::result::Result<(), DispatchError> {
        let response = self
            .http
            .post(&self.config.webhook_url)
            .json(&Self::card(title, body))
            .send()
            .await
            .map_err(|e| DispatchError::Transport {
                channel: self.name(),
                message: e.to_string(),
            })?;
        self.classify(response.status())
    }

    fn name(&self) -> String {
        "teams".to_string()
    }
}

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;

use super::Notifier;
use crate::DispatchError;
use crate::SlackConfig;

/// Posts messages to a channel through the Slack Web API (`chat.postMessage`)
pub struct SlackNotifier {
    http: reqwest::Client,
    config: SlackConfig,
}

#[derive(Debug, Serialize)]
pub(crate) struct PostMessage<'a> {
    pub(crate) channel: &'a str,
    pub(crate) text: &'a str,
    pub(crate) username: &'a str,
    pub(crate) icon_url: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostMessageResponse {
    pub(crate) ok: bool,
    #[serde(default)]
    pub(crate) error: Option<String>,
}

impl SlackNotifier {
    pub fn new(config: SlackConfig) -> Self {
        SlackNotifier {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub(crate) fn endpoint(&self) -> String {
        format!("{}/chat.postMessage", self.config.api_url.trim_end_matches('/'))
    }

    /// Slack shows no title, so the body carries the whole message.
    pub(crate) fn payload<'a>(
        &'a self,
        body: &'a str,
    ) -> PostMessage<'a> {
        PostMessage {
            channel: &self.config.channel,
            text: body,
            username: &self.config.username,
            icon_url: &self.config.icon_url,
        }
    }

    /// Slack answers HTTP 200 with `ok: false` for refused messages
    pub(crate) fn check_response(
        &self,
        status: StatusCode,
        response: Option<PostMessageResponse>,
    ) -> std::result::Result<(), DispatchError> {
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(DispatchError::Transport {
                channel: self.name(),
                message: format!("HTTP {}", status),
            });
        }
        if !status.is_success() {
            return Err(DispatchError::Rejected {
                channel: self.name(),
                message: format!("HTTP {}", status),
            });
        }
        match response {
            Some(PostMessageResponse { ok: true, .. }) => Ok(()),
            Some(PostMessageResponse { error, .. }) => Err(DispatchError::Rejected {
                channel: self.name(),
                message: error.unwrap_or_else(|| "unknown error".to_string()),
            }),
            None => Err(DispatchError::Rejected {
                channel: self.name(),
                message: "undecodable response".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send_message(
        &self,
        _title: &str,
        body: &str,
    ) -> std::result::Result<(), DispatchError> {
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.token)
            .json(&self.payload(body))
            .send()
            .await
            .map_err(|e| DispatchError::Transport {
                channel: self.name(),
                message: e.to_string(),
            })?;
        let status = response.status();
        let decoded = response.json::<PostMessageResponse>().await.ok();
        self.check_response(status, decoded)
    }

    fn name(&self) -> String {
        format!("slack:{}", self.config.channel)
    }
}

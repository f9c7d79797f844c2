use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::DispatchError;
use crate::Notifier;

/// Notifier keeping every message it was asked to send.
///
/// Scripted failures are consumed first, one per call.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    failures: Mutex<VecDeque<DispatchError>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_with(failures: impl IntoIterator<Item = DispatchError>) -> Self {
        RecordingNotifier {
            sent: Mutex::new(Vec::new()),
            failures: Mutex::new(failures.into_iter().collect()),
        }
    }

    /// Every attempt, failed ones included
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(title, _)| title.clone()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(
        &self,
        title: &str,
        body: &str,
    ) -> std::result::Result<(), DispatchError> {
        self.sent.lock().push((title.to_string(), body.to_string()));
        match self.failures.lock().pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn name(&self) -> String {
        "recording".to_string()
    }
}

pub fn transport_error() -> DispatchError {
    DispatchError::Transport {
        channel: "recording".to_string(),
        message: "connection refused".to_string(),
    }
}

pub fn rejected_error() -> DispatchError {
    DispatchError::Rejected {
        channel: "recording".to_string(),
        message: "channel_not_found".to_string(),
    }
}

//! Fakes and builders shared by the unit tests
mod config_store;
mod notifier;

pub use config_store::*;
pub use notifier::*;

use crate::BackoffPolicy;
use crate::JobState;
use crate::JobStatus;
use crate::MockJobClient;

pub const TEST_HOST: &str = "http://tamr:9100";

/// Retry policy with millisecond delays
pub fn fast_retry(max_retries: usize) -> BackoffPolicy {
    BackoffPolicy {
        max_retries,
        timeout_ms: 1_000,
        base_delay_ms: 1,
        max_delay_ms: 4,
    }
}

/// Job client answering `states` in order, then repeating the last one.
///
/// Verifies on drop that `get_job` was called exactly `expected_calls` times.
pub fn scripted_job_client(
    states: Vec<JobState>,
    expected_calls: usize,
) -> MockJobClient {
    let mut client = MockJobClient::new();
    let mut script = states.into_iter();
    let mut last = JobState::Pending;
    client
        .expect_get_job()
        .times(expected_calls)
        .returning(move |handle| {
            if let Some(state) = script.next() {
                last = state;
            }
            Ok(JobStatus::new(handle.clone(), last))
        });
    client.expect_host().return_const(TEST_HOST.to_string());
    client
}

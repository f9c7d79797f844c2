use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::JobHandle;
use super::JobState;
use super::JobStatus;
use crate::Error;
use crate::JobPollError;
use crate::Result;

/// Read-only access to the remote job service.
///
/// Implementations classify their failures: only [`JobPollError::is_retryable`]
/// errors are retried by the monitor.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait JobClient: Send + Sync + 'static {
    /// Current status of one job
    async fn get_job(
        &self,
        handle: &JobHandle,
    ) -> std::result::Result<JobStatus, JobPollError>;

    /// All jobs known to the service, most recent first
    async fn list_jobs(&self) -> std::result::Result<Vec<JobStatus>, JobPollError>;

    /// Label of the service host, printed in notifications
    fn host(&self) -> String;
}

/// Most recently submitted job, if any
pub async fn latest_job<C: JobClient + ?Sized>(client: &C) -> Result<Option<JobStatus>> {
    Ok(client.list_jobs().await?.into_iter().next())
}

/// Jobs that are PENDING or RUNNING
pub async fn active_jobs<C: JobClient + ?Sized>(client: &C) -> Result<Vec<JobStatus>> {
    Ok(client
        .list_jobs()
        .await?
        .into_iter()
        .filter(|status| !status.state.is_terminal())
        .collect())
}

/// Fails unless the job finished in SUCCEEDED
pub fn enforce_success(status: &JobStatus) -> Result<()> {
    if status.state == JobState::Succeeded {
        return Ok(());
    }
    Err(Error::JobFailed {
        handle: status.handle.clone(),
        state: status.state,
        description: status.description.clone(),
    })
}

/// Human readable summary of a job, used as notification body
pub fn job_details(
    host: &str,
    status: &JobStatus,
) -> String {
    format!(
        "Host: {} \n Job: {} \n Description: {} \n Status: {} ",
        host,
        status.handle,
        status.description.as_deref().unwrap_or(""),
        status.state
    )
}

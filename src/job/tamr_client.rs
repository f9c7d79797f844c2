use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use tracing::warn;

use super::JobClient;
use super::JobHandle;
use super::JobState;
use super::JobStatus;
use crate::config::InstanceConfig;
use crate::config::invalid;
use crate::JobPollError;
use crate::Result;

const OPERATIONS_PATH: &str = "/api/versioned/v1/operations";

/// Tamr operations endpoint client
pub struct TamrJobClient {
    http: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OperationJson {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    relative_id: Option<String>,
    #[serde(default)]
    description: Option<String>,
    status: OperationStatusJson,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OperationStatusJson {
    state: String,
}

impl TamrJobClient {
    pub fn new(
        base_url: impl Into<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        TamrJobClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
        }
    }

    pub fn from_config(config: &InstanceConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| invalid("instance.base_url is required to query jobs".into()))?;
        Ok(Self::new(base_url, config.username.clone(), config.password.clone()))
    }

    pub(crate) fn operation_url(
        &self,
        handle: &JobHandle,
    ) -> String {
        format!("{}{}/{}", self.base_url, OPERATIONS_PATH, handle)
    }

    pub(crate) fn operations_url(&self) -> String {
        format!("{}{}", self.base_url, OPERATIONS_PATH)
    }

    async fn fetch(
        &self,
        url: &str,
        handle: Option<&JobHandle>,
    ) -> std::result::Result<reqwest::Response, JobPollError> {
        let mut request = self.http.get(url).header(reqwest::header::ACCEPT, "application/json");
        if let Some(user) = &self.username {
            request = request.basic_auth(user, self.password.as_ref());
        }
        let response = request.send().await.map_err(|e| {
            warn!(%url, "job service unreachable: {}", e);
            JobPollError::Transient(e.to_string())
        })?;
        classify_status(response.status(), handle)?;
        Ok(response)
    }
}

#[async_trait]
impl JobClient for TamrJobClient {
    async fn get_job(
        &self,
        handle: &JobHandle,
    ) -> std::result::Result<JobStatus, JobPollError> {
        let url = self.operation_url(handle);
        debug!(%url, "fetching operation");
        let operation: OperationJson = self
            .fetch(&url, Some(handle))
            .await?
            .json()
            .await
            .map_err(|e| JobPollError::InvalidResponse(e.to_string()))?;
        operation.into_status(Some(handle))
    }

    async fn list_jobs(&self) -> std::result::Result<Vec<JobStatus>, JobPollError> {
        let url = self.operations_url();
        let operations: Vec<OperationJson> = self
            .fetch(&url, None)
            .await?
            .json()
            .await
            .map_err(|e| JobPollError::InvalidResponse(e.to_string()))?;
        let mut statuses = operations
            .into_iter()
            .map(|op| op.into_status(None))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        // operations come back oldest first
        statuses.reverse();
        Ok(statuses)
    }

    fn host(&self) -> String {
        self.base_url.clone()
    }
}

pub(crate) fn classify_status(
    status: StatusCode,
    handle: Option<&JobHandle>,
) -> std::result::Result<(), JobPollError> {
    if status.is_success() {
        return Ok(());
    }
    match (status, handle) {
        (StatusCode::NOT_FOUND, Some(handle)) => Err(JobPollError::NotFound(handle.clone())),
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => {
            Err(JobPollError::Unauthorized(status.as_u16()))
        }
        (StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT, _) => {
            Err(JobPollError::Transient(format!("HTTP {status}")))
        }
        (s, _) if s.is_server_error() => Err(JobPollError::Transient(format!("HTTP {status}"))),
        (s, _) => Err(JobPollError::InvalidResponse(format!("unexpected HTTP {s}"))),
    }
}

impl OperationJson {
    pub(crate) fn into_status(
        self,
        requested: Option<&JobHandle>,
    ) -> std::result::Result<JobStatus, JobPollError> {
        let state: JobState = self.status.state.parse()?;
        let handle = match self
            .relative_id
            .as_deref()
            .or(self.id.as_deref())
            .and_then(|id| id.rsplit('/').next())
            .filter(|id| !id.is_empty())
        {
            Some(id) => JobHandle::new(id),
            None => requested
                .cloned()
                .ok_or_else(|| JobPollError::InvalidResponse("operation without id".to_string()))?,
        };
        Ok(JobStatus {
            handle,
            state,
            description: self.description,
        })
    }
}

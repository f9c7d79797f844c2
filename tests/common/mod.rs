use std::collections::BTreeMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use parking_lot::Mutex;
use tamr_toolbox::BackoffPolicy;
use tamr_toolbox::ConfigQuery;
use tamr_toolbox::ConfigStore;
use tamr_toolbox::ConfigStoreError;
use tamr_toolbox::ConfigValue;
use tamr_toolbox::DispatchError;
use tamr_toolbox::JobClient;
use tamr_toolbox::JobHandle;
use tamr_toolbox::JobPollError;
use tamr_toolbox::JobState;
use tamr_toolbox::JobStatus;
use tamr_toolbox::Notifier;
use tamr_toolbox::RemoteConfig;

pub const HOST: &str = "http://tamr.local:9100";

pub fn fast_retry(max_retries: usize) -> BackoffPolicy {
    BackoffPolicy {
        max_retries,
        timeout_ms: 1_000,
        base_delay_ms: 1,
        max_delay_ms: 4,
    }
}

/// Answers each poll with the next scripted result, repeating the last one
pub struct ScriptedJobClient {
    script: Mutex<Vec<std::result::Result<JobState, JobPollError>>>,
    polls: AtomicUsize,
}

impl ScriptedJobClient {
    pub fn new(states: impl IntoIterator<Item = JobState>) -> Self {
        Self::with_results(states.into_iter().map(Ok))
    }

    pub fn with_results(results: impl IntoIterator<Item = std::result::Result<JobState, JobPollError>>) -> Self {
        ScriptedJobClient {
            script: Mutex::new(results.into_iter().collect()),
            polls: AtomicUsize::new(0),
        }
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobClient for ScriptedJobClient {
    async fn get_job(
        &self,
        handle: &JobHandle,
    ) -> std::result::Result<JobStatus, JobPollError> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock();
        let index = poll.min(script.len().saturating_sub(1));
        match script.get(index) {
            Some(Ok(state)) => Ok(JobStatus::new(handle.clone(), *state).with_description("Update unified dataset")),
            Some(Err(e)) => Err(e.clone()),
            None => Err(JobPollError::NotFound(handle.clone())),
        }
    }

    async fn list_jobs(&self) -> std::result::Result<Vec<JobStatus>, JobPollError> {
        Ok(Vec::new())
    }

    fn host(&self) -> String {
        HOST.to_string()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    failures_left: AtomicUsize,
}

impl RecordingNotifier {
    /// The first `failures` sends fail with a transport error
    pub fn flaky(failures: usize) -> Self {
        RecordingNotifier {
            sent: Mutex::new(Vec::new()),
            failures_left: AtomicUsize::new(failures),
        }
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(_, b)| b.clone()).collect()
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
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DispatchError::Transport {
                channel: self.name(),
                message: "503 Service Unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn name(&self) -> String {
        "recording".to_string()
    }
}

type Formula = Box<dyn Fn(&BTreeMap<String, ConfigValue>) -> Option<(String, ConfigValue)> + Send + Sync>;

/// Config host recomputing derived keys after every write
pub struct InMemoryConfigStore {
    entries: Mutex<BTreeMap<String, ConfigValue>>,
    formulas: Vec<Formula>,
    writes: AtomicUsize,
}

impl InMemoryConfigStore {
    pub fn new(entries: &[(&str, ConfigValue)]) -> Self {
        InMemoryConfigStore {
            entries: Mutex::new(entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()),
            formulas: Vec::new(),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn with_formula(
        mut self,
        formula: impl Fn(&BTreeMap<String, ConfigValue>) -> Option<(String, ConfigValue)> + Send + Sync + 'static,
    ) -> Self {
        self.formulas.push(Box::new(formula));
        self
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn get_configs(
        &self,
        query: &ConfigQuery,
    ) -> std::result::Result<RemoteConfig, ConfigStoreError> {
        Ok(RemoteConfig::new(self.entries.lock().clone(), Default::default()).filter(query))
    }

    async fn set_configs(
        &self,
        values: &BTreeMap<String, ConfigValue>,
    ) -> std::result::Result<BTreeMap<String, ConfigValue>, ConfigStoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut entries = self.entries.lock();
        entries.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
        for formula in &self.formulas {
            if let Some((key, value)) = formula(&entries) {
                entries.insert(key, value);
            }
        }
        Ok(values.clone())
    }
}

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::CommandError;
use crate::ConfigQuery;
use crate::ConfigStore;
use crate::ConfigStoreError;
use crate::ConfigValue;
use crate::RemoteConfig;

type Formula = Box<dyn Fn(&BTreeMap<String, ConfigValue>) -> ConfigValue + Send + Sync>;

/// In-memory config host where some keys are computed from others
pub struct FormulaConfigStore {
    entries: Mutex<BTreeMap<String, ConfigValue>>,
    user_defined: Mutex<BTreeSet<String>>,
    formulas: Vec<(String, Formula)>,
    /// Number of keys applied before `set_configs` fails
    fail_after: Option<usize>,
    fail_reads_after: Option<usize>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl FormulaConfigStore {
    pub fn new(entries: impl IntoIterator<Item = (&'static str, ConfigValue)>) -> Self {
        FormulaConfigStore {
            entries: Mutex::new(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()),
            user_defined: Mutex::new(BTreeSet::new()),
            formulas: Vec::new(),
            fail_after: None,
            fail_reads_after: None,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// `key` is recomputed from the whole config after every write
    pub fn with_formula(
        mut self,
        key: &str,
        formula: impl Fn(&BTreeMap<String, ConfigValue>) -> ConfigValue + Send + Sync + 'static,
    ) -> Self {
        self.formulas.push((key.to_string(), Box::new(formula)));
        self.recompute();
        self
    }

    pub fn failing_after(
        mut self,
        applied: usize,
    ) -> Self {
        self.fail_after = Some(applied);
        self
    }

    /// Reads beyond the first `reads` fail
    pub fn failing_reads_after(
        mut self,
        reads: usize,
    ) -> Self {
        self.fail_reads_after = Some(reads);
        self
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn value(
        &self,
        key: &str,
    ) -> Option<ConfigValue> {
        self.entries.lock().get(key).cloned()
    }

    fn recompute(&self) {
        let mut entries = self.entries.lock();
        for (key, formula) in &self.formulas {
            let value = formula(&entries);
            entries.insert(key.clone(), value);
        }
    }
}

fn host_down() -> CommandError {
    CommandError::Connection {
        target: "fake".to_string(),
        message: "host down".to_string(),
    }
}

#[async_trait]
impl ConfigStore for FormulaConfigStore {
    async fn get_configs(
        &self,
        query: &ConfigQuery,
    ) -> std::result::Result<RemoteConfig, ConfigStoreError> {
        let read = self.reads.fetch_add(1, Ordering::SeqCst);
        if matches!(self.fail_reads_after, Some(limit) if read >= limit) {
            return Err(ConfigStoreError::Command(host_down()));
        }
        let config = RemoteConfig::new(self.entries.lock().clone(), self.user_defined.lock().clone());
        Ok(config.filter(query))
    }

    async fn set_configs(
        &self,
        values: &BTreeMap<String, ConfigValue>,
    ) -> std::result::Result<BTreeMap<String, ConfigValue>, ConfigStoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut applied = BTreeMap::new();
        for (key, value) in values {
            if matches!(self.fail_after, Some(limit) if applied.len() >= limit) {
                self.recompute();
                return Err(ConfigStoreError::PartialApply {
                    applied: applied.into_keys().collect(),
                    source: Box::new(ConfigStoreError::Command(host_down())),
                });
            }
            // the host keeps the typed value it parses back from the command line
            let stored = ConfigValue::parse_cli(&value.to_string());
            self.entries.lock().insert(key.clone(), stored);
            self.user_defined.lock().insert(key.clone());
            applied.insert(key.clone(), value.clone());
        }
        self.recompute();
        Ok(applied)
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;
use tracing::instrument;
use tracing::warn;

use super::diff_snapshots;
use super::ConfigChangeSet;
use crate::metrics::CONFIG_CHANGES;
use crate::ConfigQuery;
use crate::ConfigStore;
use crate::ConfigStoreError;
use crate::ConfigValue;
use crate::ReconcileError;
use crate::RemoteConfig;

/// Applies config changes and reports everything that actually changed,
/// including keys the host derives from the requested ones.
///
/// Reconciles against the same host must be serialized by the caller: a
/// concurrent writer shows up in the diff.
pub struct ConfigReconciler<S: ConfigStore + ?Sized> {
    store: Arc<S>,
}

impl<S: ConfigStore + ?Sized> ConfigReconciler<S> {
    pub fn new(store: Arc<S>) -> Self {
        ConfigReconciler { store }
    }

    #[instrument(skip(self, requested), fields(keys = ?requested.keys().collect::<Vec<_>>()))]
    pub async fn reconcile(
        &self,
        requested: &BTreeMap<String, ConfigValue>,
    ) -> std::result::Result<ConfigChangeSet, ReconcileError> {
        if requested.is_empty() {
            return Err(ReconcileError::EmptyRequest);
        }

        let before = self.snapshot().await?;
        let unknown: Vec<String> = requested
            .keys()
            .filter(|key| !before.contains_key(key))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ReconcileError::UnknownConfigKey(unknown));
        }

        if let Err(source) = self.store.set_configs(requested).await {
            let applied = self.applied_after_failure(requested, &source).await;
            warn!(?applied, "config apply failed: {}", source);
            return Err(ReconcileError::PartialApply { applied, source });
        }

        let after = self.snapshot().await?;
        let changes = diff_snapshots(&before, &after, requested);
        for (_, change) in changes.iter() {
            CONFIG_CHANGES.with_label_values(&[change.kind.as_str()]).inc();
        }
        info!(
            direct = ?changes.direct_keys(),
            indirect = ?changes.indirect_keys(),
            "config reconciled"
        );
        Ok(changes)
    }

    async fn snapshot(&self) -> std::result::Result<RemoteConfig, ReconcileError> {
        self.store
            .get_configs(&ConfigQuery::all())
            .await
            .map_err(ReconcileError::Snapshot)
    }

    /// Requested keys now holding the requested value. Falls back to what the
    /// store reported when the host cannot be read.
    async fn applied_after_failure(
        &self,
        requested: &BTreeMap<String, ConfigValue>,
        source: &ConfigStoreError,
    ) -> Vec<String> {
        match self.store.get_configs(&ConfigQuery::all()).await {
            Ok(current) => requested
                .iter()
                .filter(|(key, value)| current.get(key).is_some_and(|v| v.renders_as(value)))
                .map(|(key, _)| key.clone())
                .collect(),
            Err(e) => {
                warn!("could not re-read config after a failed apply: {}", e);
                match source {
                    ConfigStoreError::PartialApply { applied, .. } => applied.clone(),
                    _ => Vec::new(),
                }
            }
        }
    }
}

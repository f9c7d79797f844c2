use std::collections::BTreeMap;
use std::fmt;

use crate::ConfigValue;
use crate::RemoteConfig;

/// How a key came to change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The key was part of the request
    Direct,
    /// The host recomputed the key from other keys
    Indirect,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Direct => "direct",
            ChangeKind::Indirect => "indirect",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigChange {
    pub previous: ConfigValue,
    pub current: ConfigValue,
    pub kind: ChangeKind,
}

/// Keys whose value actually changed during one reconciliation.
///
/// Immutable once built; ordered by key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigChangeSet {
    changes: BTreeMap<String, ConfigChange>,
}

impl ConfigChangeSet {
    /// New value of `key`
    pub fn get(
        &self,
        key: &str,
    ) -> Option<&ConfigValue> {
        self.changes.get(key).map(|c| &c.current)
    }

    pub fn change(
        &self,
        key: &str,
    ) -> Option<&ConfigChange> {
        self.changes.get(key)
    }

    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.changes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigChange)> {
        self.changes.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.changes.keys()
    }

    pub fn direct_keys(&self) -> Vec<&str> {
        self.keys_of(ChangeKind::Direct)
    }

    pub fn indirect_keys(&self) -> Vec<&str> {
        self.keys_of(ChangeKind::Indirect)
    }

    /// Key to new value
    pub fn into_values(self) -> BTreeMap<String, ConfigValue> {
        self.changes.into_iter().map(|(k, c)| (k, c.current)).collect()
    }

    fn keys_of(
        &self,
        kind: ChangeKind,
    ) -> Vec<&str> {
        self.changes
            .iter()
            .filter(|(_, c)| c.kind == kind)
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

/// Keys present in both snapshots whose values differ.
///
/// Keys appearing or disappearing between the snapshots are not changes.
/// Requested keys are tagged [`ChangeKind::Direct`], every other key
/// [`ChangeKind::Indirect`].
pub fn diff_snapshots(
    before: &RemoteConfig,
    after: &RemoteConfig,
    requested: &BTreeMap<String, ConfigValue>,
) -> ConfigChangeSet {
    let changes = before
        .iter()
        .filter_map(|(key, previous)| {
            let current = after.get(key)?;
            if current == previous {
                return None;
            }
            let kind = if requested.contains_key(key) {
                ChangeKind::Direct
            } else {
                ChangeKind::Indirect
            };
            Some((
                key.clone(),
                ConfigChange {
                    previous: previous.clone(),
                    current: current.clone(),
                    kind,
                },
            ))
        })
        .collect();
    ConfigChangeSet { changes }
}

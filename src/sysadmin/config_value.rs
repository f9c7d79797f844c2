use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

/// Scalar value of a Tamr configuration key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for ConfigValue {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ConfigValue::Integer(v) => write!(f, "{}", v),
            // whole floats keep a decimal point
            ConfigValue::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            ConfigValue::Float(v) => write!(f, "{}", v),
            ConfigValue::Bool(v) => write!(f, "{}", v),
            ConfigValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Integer(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Text(value)
    }
}

impl ConfigValue {
    /// Same value once rendered for the admin tool, whatever the variant: `Text("5")` matches `Integer(5)`
    pub fn renders_as(
        &self,
        other: &ConfigValue,
    ) -> bool {
        self.to_string() == other.to_string()
    }

    /// Reads a value typed on a command line (`KEY=VALUE`)
    pub fn parse_cli(raw: &str) -> ConfigValue {
        if let Ok(v) = raw.parse::<i64>() {
            return ConfigValue::Integer(v);
        }
        if let Ok(v) = raw.parse::<f64>() {
            // "nan" and "inf" stay text
            if v.is_finite() {
                return ConfigValue::Float(v);
            }
        }
        match raw {
            "true" => ConfigValue::Bool(true),
            "false" => ConfigValue::Bool(false),
            _ => ConfigValue::Text(raw.to_string()),
        }
    }
}

/// Filters of a config read. All filters apply together.
#[derive(Debug, Clone, Default)]
pub struct ConfigQuery {
    /// Only these keys
    pub names: Option<Vec<String>>,
    /// Only keys matching this pattern
    pub search_regex: Option<Regex>,
    /// Only keys set by a user rather than defaulted
    pub user_defined_only: bool,
}

impl ConfigQuery {
    pub fn all() -> Self {
        ConfigQuery::default()
    }

    pub fn names(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        ConfigQuery {
            names: Some(names.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn with_regex(
        mut self,
        regex: Regex,
    ) -> Self {
        self.search_regex = Some(regex);
        self
    }

    pub fn with_user_defined_only(
        mut self,
        user_defined_only: bool,
    ) -> Self {
        self.user_defined_only = user_defined_only;
        self
    }

    pub fn matches(
        &self,
        key: &str,
        user_defined: bool,
    ) -> bool {
        if self.user_defined_only && !user_defined {
            return false;
        }
        if let Some(names) = &self.names {
            if !names.iter().any(|n| n == key) {
                return false;
            }
        }
        if let Some(regex) = &self.search_regex {
            if !regex.is_match(key) {
                return false;
            }
        }
        true
    }
}

/// Snapshot of an instance configuration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RemoteConfig {
    entries: BTreeMap<String, ConfigValue>,
    user_defined: BTreeSet<String>,
}

impl RemoteConfig {
    pub fn new(
        entries: BTreeMap<String, ConfigValue>,
        user_defined: BTreeSet<String>,
    ) -> Self {
        RemoteConfig { entries, user_defined }
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_user_defined(
        &self,
        key: &str,
    ) -> bool {
        self.user_defined.contains(key)
    }

    pub fn entries(&self) -> &BTreeMap<String, ConfigValue> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigValue)> {
        self.entries.iter()
    }

    pub fn user_defined_only(&self) -> RemoteConfig {
        self.filter(&ConfigQuery::all().with_user_defined_only(true))
    }

    pub fn filter(
        &self,
        query: &ConfigQuery,
    ) -> RemoteConfig {
        let entries = self
            .entries
            .iter()
            .filter(|(key, _)| query.matches(key, self.is_user_defined(key)))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<BTreeMap<_, _>>();
        let user_defined = self
            .user_defined
            .iter()
            .filter(|key| entries.contains_key(*key))
            .cloned()
            .collect();
        RemoteConfig { entries, user_defined }
    }

    pub fn into_entries(self) -> BTreeMap<String, ConfigValue> {
        self.entries
    }
}

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::debug;
use tracing::instrument;

use super::ConfigQuery;
use super::ConfigValue;
use super::InstanceAdmin;
use super::RemoteConfig;
use crate::utils::shell::quote;
use crate::ConfigStoreError;

/// Read/write access to the configuration of a Tamr instance.
///
/// Applying values may change other keys on the host (derived settings);
/// callers observe that by reading again.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConfigStore: Send + Sync + 'static {
    async fn get_configs(
        &self,
        query: &ConfigQuery,
    ) -> std::result::Result<RemoteConfig, ConfigStoreError>;

    /// Applies `values` and returns what was applied
    async fn set_configs(
        &self,
        values: &BTreeMap<String, ConfigValue>,
    ) -> std::result::Result<BTreeMap<String, ConfigValue>, ConfigStoreError>;
}

/// Value of a single key, `None` when the host does not know it
pub async fn get_config<S: ConfigStore + ?Sized>(
    store: &S,
    name: &str,
) -> std::result::Result<Option<ConfigValue>, ConfigStoreError> {
    let config = store.get_configs(&ConfigQuery::names([name])).await?;
    Ok(config.get(name).cloned())
}

/// [`ConfigStore`] backed by `unify-admin.sh` on the instance
pub struct AdminToolConfigStore {
    admin: Arc<InstanceAdmin>,
}

impl AdminToolConfigStore {
    pub fn new(admin: Arc<InstanceAdmin>) -> Self {
        AdminToolConfigStore { admin }
    }

    fn tool(&self) -> String {
        self.admin.tamr_path("utils/unify-admin.sh")
    }

    async fn read(
        &self,
        user_defined: bool,
    ) -> std::result::Result<BTreeMap<String, ConfigValue>, ConfigStoreError> {
        let command = if user_defined {
            format!("{} config:get --userDefined", self.tool())
        } else {
            format!("{} config:get", self.tool())
        };
        let output = self.admin.run_command(&command, true).await?;
        parse_config_output(&output.stdout)
    }
}

#[async_trait]
impl ConfigStore for AdminToolConfigStore {
    /// The user-defined flag of each key is only fetched when the query asks for it.
    #[instrument(skip(self))]
    async fn get_configs(
        &self,
        query: &ConfigQuery,
    ) -> std::result::Result<RemoteConfig, ConfigStoreError> {
        let (entries, user_defined) = if query.user_defined_only {
            let entries = self.read(true).await?;
            let keys: BTreeSet<String> = entries.keys().cloned().collect();
            (entries, keys)
        } else {
            (self.read(false).await?, BTreeSet::new())
        };
        let config = RemoteConfig::new(entries, user_defined).filter(query);
        debug!(keys = config.len(), "read instance config");
        Ok(config)
    }

    #[instrument(skip(self, values), fields(keys = ?values.keys().collect::<Vec<_>>()))]
    async fn set_configs(
        &self,
        values: &BTreeMap<String, ConfigValue>,
    ) -> std::result::Result<BTreeMap<String, ConfigValue>, ConfigStoreError> {
        if values.is_empty() {
            return Ok(BTreeMap::new());
        }
        let assignments = set_arguments(values)?;
        let command = format!("{} config:set {}", self.tool(), assignments.join(" "));
        self.admin.run_command(&command, true).await?;
        Ok(values.clone())
    }
}

/// Quoted `KEY=VALUE` words for `config:set`
pub(crate) fn set_arguments(
    values: &BTreeMap<String, ConfigValue>,
) -> std::result::Result<Vec<String>, ConfigStoreError> {
    values
        .iter()
        .map(|(key, value)| {
            if key.is_empty() || key.contains('=') || key.chars().any(char::is_whitespace) {
                return Err(ConfigStoreError::InvalidValue {
                    key: key.clone(),
                    message: "key cannot be empty or contain '=' or whitespace".to_string(),
                });
            }
            let rendered = value.to_string();
            if rendered.contains('\n') {
                return Err(ConfigStoreError::InvalidValue {
                    key: key.clone(),
                    message: "value cannot span several lines".to_string(),
                });
            }
            Ok(quote(&format!("{}={}", key, rendered)))
        })
        .collect()
}

/// Parses the `KEY: value` document printed by `config:get`
pub(crate) fn parse_config_output(
    output: &str,
) -> std::result::Result<BTreeMap<String, ConfigValue>, ConfigStoreError> {
    if output.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let document: BTreeMap<String, serde_yaml::Value> =
        serde_yaml::from_str(output).map_err(|e| ConfigStoreError::Parse(e.to_string()))?;
    document
        .into_iter()
        .map(|(key, value)| Ok((key, yaml_to_config_value(value)?)))
        .collect()
}

fn yaml_to_config_value(value: serde_yaml::Value) -> std::result::Result<ConfigValue, ConfigStoreError> {
    Ok(match value {
        serde_yaml::Value::Null => ConfigValue::Text(String::new()),
        serde_yaml::Value::Bool(b) => ConfigValue::Bool(b),
        serde_yaml::Value::Number(n) => match n.as_i64() {
            Some(i) => ConfigValue::Integer(i),
            None => ConfigValue::Float(
                n.as_f64()
                    .ok_or_else(|| ConfigStoreError::Parse(format!("unsupported number {}", n)))?,
            ),
        },
        serde_yaml::Value::String(s) => ConfigValue::Text(s),
        // lists and maps are kept in their YAML form
        other => ConfigValue::Text(
            serde_yaml::to_string(&other)
                .map_err(|e| ConfigStoreError::Parse(e.to_string()))?
                .trim_end()
                .to_string(),
        ),
    })
}

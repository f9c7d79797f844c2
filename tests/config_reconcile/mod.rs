use std::collections::BTreeMap;
use std::sync::Arc;

use tamr_toolbox::ChangeKind;
use tamr_toolbox::ConfigReconciler;
use tamr_toolbox::ConfigValue;
use tamr_toolbox::ReconcileError;

use crate::common::InMemoryConfigStore;

/// Driver memory is derived from the executor count: 2G per executor, at most 4 counted
fn spark_store(instances: i64) -> InMemoryConfigStore {
    InMemoryConfigStore::new(&[
        ("TAMR_JOB_SPARK_EXECUTOR_INSTANCES", ConfigValue::Integer(instances)),
        (
            "TAMR_JOB_SPARK_DRIVER_MEMORY",
            ConfigValue::Text(format!("{}G", instances * 2)),
        ),
        ("TAMR_UNIFY_PORT", ConfigValue::Integer(9100)),
    ])
    .with_formula(|entries| match entries.get("TAMR_JOB_SPARK_EXECUTOR_INSTANCES") {
        Some(ConfigValue::Integer(n)) => Some((
            "TAMR_JOB_SPARK_DRIVER_MEMORY".to_string(),
            ConfigValue::Text(format!("{}G", (*n).min(4) * 2)),
        )),
        _ => None,
    })
}

fn request(key: &str, value: ConfigValue) -> BTreeMap<String, ConfigValue> {
    BTreeMap::from([(key.to_string(), value)])
}

#[tokio::test]
async fn test_reconcile_reports_formula_derived_keys() {
    let reconciler = ConfigReconciler::new(Arc::new(spark_store(2)));

    let changes = reconciler
        .reconcile(&request("TAMR_JOB_SPARK_EXECUTOR_INSTANCES", ConfigValue::Integer(3)))
        .await
        .unwrap();

    assert_eq!(changes.len(), 2);
    assert_eq!(
        changes.get("TAMR_JOB_SPARK_DRIVER_MEMORY"),
        Some(&ConfigValue::Text("6G".to_string()))
    );
    assert_eq!(
        changes.change("TAMR_JOB_SPARK_DRIVER_MEMORY").map(|c| c.kind),
        Some(ChangeKind::Indirect)
    );
    assert!(!changes.contains_key("TAMR_UNIFY_PORT"));
}

#[tokio::test]
async fn test_reconcile_omits_derived_key_when_formula_result_is_unchanged() {
    // capped at 4 executors: 4 -> 6 keeps the driver at 8G
    let reconciler = ConfigReconciler::new(Arc::new(spark_store(4)));

    let changes = reconciler
        .reconcile(&request("TAMR_JOB_SPARK_EXECUTOR_INSTANCES", ConfigValue::Integer(6)))
        .await
        .unwrap();

    assert_eq!(changes.direct_keys(), vec!["TAMR_JOB_SPARK_EXECUTOR_INSTANCES"]);
    assert!(changes.indirect_keys().is_empty());
}

#[tokio::test]
async fn test_reconcile_rejects_unknown_keys_before_applying() {
    let store = Arc::new(spark_store(2));
    let reconciler = ConfigReconciler::new(store.clone());

    let result = reconciler
        .reconcile(&request("TAMR_NOT_A_SETTING", ConfigValue::Integer(1)))
        .await;

    assert!(matches!(result, Err(ReconcileError::UnknownConfigKey(keys)) if keys == vec!["TAMR_NOT_A_SETTING"]));
    assert_eq!(store.writes(), 0);
}

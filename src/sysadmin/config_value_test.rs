use std::collections::BTreeMap;
use std::collections::BTreeSet;

use regex::Regex;

use super::*;

fn sample() -> RemoteConfig {
    let entries: BTreeMap<String, ConfigValue> = [
        ("TAMR_JOB_SPARK_EXECUTOR_MEMORY", ConfigValue::from("5G")),
        ("TAMR_JOB_SPARK_EXECUTOR_INSTANCES", ConfigValue::Integer(4)),
        ("TAMR_UNIFY_PORT", ConfigValue::Integer(9100)),
        ("TAMR_ES_SHARD_RATIO", ConfigValue::from(0.5)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    let user_defined = BTreeSet::from(["TAMR_JOB_SPARK_EXECUTOR_MEMORY".to_string()]);
    RemoteConfig::new(entries, user_defined)
}

#[test]
fn display_should_render_admin_tool_values() {
    assert_eq!(ConfigValue::Integer(4).to_string(), "4");
    assert_eq!(ConfigValue::from(0.5).to_string(), "0.5");
    assert_eq!(ConfigValue::from(true).to_string(), "true");
    assert_eq!(ConfigValue::from("5G").to_string(), "5G");
}

#[test]
fn whole_floats_should_keep_their_decimal_point() {
    assert_eq!(ConfigValue::Float(1.0).to_string(), "1.0");
    assert_eq!(ConfigValue::parse_cli(&ConfigValue::Float(1.0).to_string()), ConfigValue::Float(1.0));
    assert_eq!(ConfigValue::Float(-2.0).to_string(), "-2.0");
}

#[test]
fn renders_as_should_compare_admin_tool_renderings() {
    assert!(ConfigValue::from("5").renders_as(&ConfigValue::Integer(5)));
    assert!(ConfigValue::from("true").renders_as(&ConfigValue::Bool(true)));
    assert!(!ConfigValue::Float(5.0).renders_as(&ConfigValue::Integer(5)));
}

#[test]
fn parse_cli_should_infer_the_type() {
    assert_eq!(ConfigValue::parse_cli("12"), ConfigValue::Integer(12));
    assert_eq!(ConfigValue::parse_cli("1.5"), ConfigValue::Float(1.5));
    assert_eq!(ConfigValue::parse_cli("false"), ConfigValue::Bool(false));
    assert_eq!(ConfigValue::parse_cli("5G"), ConfigValue::Text("5G".to_string()));
    assert_eq!(ConfigValue::parse_cli("nan"), ConfigValue::Text("nan".to_string()));
}

#[test]
fn untagged_serde_should_keep_the_scalar_type() {
    let parsed: BTreeMap<String, ConfigValue> =
        serde_json::from_str(r#"{"a": 1, "b": 1.5, "c": "x", "d": true}"#).unwrap();

    assert_eq!(parsed["a"], ConfigValue::Integer(1));
    assert_eq!(parsed["b"], ConfigValue::Float(1.5));
    assert_eq!(parsed["c"], ConfigValue::Text("x".to_string()));
    assert_eq!(parsed["d"], ConfigValue::Bool(true));
}

#[test]
fn filter_by_names_should_keep_only_those_keys() {
    let config = sample().filter(&ConfigQuery::names(["TAMR_UNIFY_PORT", "MISSING"]));

    assert_eq!(config.len(), 1);
    assert_eq!(config.get("TAMR_UNIFY_PORT"), Some(&ConfigValue::Integer(9100)));
}

#[test]
fn filter_by_regex_should_match_keys() {
    let query = ConfigQuery::all().with_regex(Regex::new("^TAMR_JOB_SPARK_").unwrap());

    let config = sample().filter(&query);

    assert_eq!(
        config.entries().keys().collect::<Vec<_>>(),
        vec!["TAMR_JOB_SPARK_EXECUTOR_INSTANCES", "TAMR_JOB_SPARK_EXECUTOR_MEMORY"]
    );
}

#[test]
fn user_defined_only_should_drop_defaults() {
    let config = sample().user_defined_only();

    assert_eq!(config.len(), 1);
    assert!(config.is_user_defined("TAMR_JOB_SPARK_EXECUTOR_MEMORY"));
}

#[test]
fn filters_should_combine() {
    let query = ConfigQuery::names(["TAMR_UNIFY_PORT"]).with_user_defined_only(true);

    assert!(sample().filter(&query).is_empty());
}

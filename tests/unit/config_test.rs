//! Tests for configuration validation

use std::collections::HashMap;
use std::time::Duration;

use churn::config::{default_delete_candidates, ChurnConfig, DEFAULT_LABEL_SELECTOR};
use churn::core::ResourceTypeId;

#[test]
fn test_defaults() {
    let config = ChurnConfig::default();
    assert_eq!(config.default_interval(), Duration::from_secs(60));
    assert_eq!(config.min_interval(), Duration::from_secs(1));
    assert_eq!(config.default_limit, 1);
    assert_eq!(config.label_selector, DEFAULT_LABEL_SELECTOR);
    assert!(config.seed.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_default_candidates() {
    let candidates = default_delete_candidates();
    assert_eq!(
        candidates,
        vec![
            ResourceTypeId::new("projectcontour.io", "v1", "httpproxies"),
            ResourceTypeId::new("extensions", "v1beta1", "ingresses"),
            ResourceTypeId::new("", "v1", "services"),
            ResourceTypeId::new("", "v1", "pods"),
        ]
    );
}

#[test]
fn test_invalid_min_interval() {
    let config = ChurnConfig {
        min_interval_ms: 0,
        ..ChurnConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_default_interval_below_minimum() {
    let config = ChurnConfig {
        default_interval_ms: 1_000,
        min_interval_ms: 5_000,
        ..ChurnConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_duplicate_default_resources() {
    let pods = ResourceTypeId::new("", "v1", "pods");
    let config = ChurnConfig {
        default_resources: vec![pods.clone(), pods],
        ..ChurnConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_selector() {
    let config = ChurnConfig {
        label_selector: "no-equals-sign".to_string(),
        ..ChurnConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_from_json() {
    let json = r#"{
        "default_interval_ms": 30000,
        "default_limit": 4,
        "label_selector": "team=chaos",
        "default_resources": [
            { "version": "v1", "resource": "pods" },
            { "group": "apps", "version": "v1", "resource": "deployments" }
        ],
        "seed": 42
    }"#;

    let config = ChurnConfig::from_json_str(json).unwrap();
    assert_eq!(config.default_interval(), Duration::from_secs(30));
    assert_eq!(config.default_limit, 4);
    assert_eq!(config.min_interval(), Duration::from_secs(1));
    assert_eq!(config.default_resources[1].group, "apps");
    assert_eq!(config.seed, Some(42));
}

#[test]
fn test_from_json_rejects_garbage() {
    assert!(ChurnConfig::from_json_str("{ not json").is_err());
}

#[test]
fn test_from_lookup_overrides() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("CHURN_SELECTOR", "owner=test"),
        ("CHURN_SEED", "9"),
        ("CHURN_DEFAULT_INTERVAL", "2m"),
        ("CHURN_DEFAULT_LIMIT", "3"),
    ]);
    let config = ChurnConfig::from_lookup(|key| env.get(key).map(|v| (*v).to_string())).unwrap();
    assert_eq!(config.label_selector, "owner=test");
    assert_eq!(config.seed, Some(9));
    assert_eq!(config.default_interval(), Duration::from_secs(120));
    assert_eq!(config.default_limit, 3);
}

#[test]
fn test_from_lookup_rejects_bad_values() {
    assert!(ChurnConfig::from_lookup(|key| (key == "CHURN_SEED").then(|| "x".to_string())).is_err());
    assert!(ChurnConfig::from_lookup(|key| {
        (key == "CHURN_DEFAULT_INTERVAL").then(|| "later".to_string())
    })
    .is_err());
}

#[test]
fn test_from_lookup_empty_is_default() {
    assert_eq!(ChurnConfig::from_lookup(|_| None).unwrap(), ChurnConfig::default());
}

#[test]
fn test_from_lookup_keeps_sub_second_interval() {
    let config = ChurnConfig::from_lookup(|key| {
        (key == "CHURN_DEFAULT_INTERVAL").then(|| "1500ms".to_string())
    })
    .unwrap();
    assert_eq!(config.default_interval(), Duration::from_millis(1_500));
    assert_eq!(config.default_interval_ms, 1_500);
}

#[test]
fn test_from_lookup_rejects_sub_millisecond_interval() {
    assert!(ChurnConfig::from_lookup(|key| {
        (key == "CHURN_DEFAULT_INTERVAL").then(|| "2s 500us".to_string())
    })
    .is_err());
}

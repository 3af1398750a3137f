//! Tests for policy specification parsing

use churn::core::{ChurnError, PolicySpec};

#[test]
fn test_operation_is_text_before_first_colon() {
    for input in [
        "delete:pods",
        "delete:pods,services,limit=3",
        "delete:interval=10s",
        "scale:deployments,replicas=0",
        "delete:a:b",
    ] {
        let spec = PolicySpec::parse(input).unwrap();
        let expected = input.split(':').next().unwrap();
        assert_eq!(spec.operation, expected, "input {input}");
    }
}

#[test]
fn test_parameters_are_exactly_the_key_value_tokens() {
    let spec = PolicySpec::parse("delete:pods,interval=5s,services,limit=2").unwrap();
    let params: Vec<(&str, &str)> = spec
        .parameters
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    assert_eq!(params, vec![("interval", "5s"), ("limit", "2")]);
    assert_eq!(spec.resource_names, vec!["pods", "services"]);
}

#[test]
fn test_reserialized_spec_parses_to_same_structure() {
    let spec = PolicySpec::parse("delete:pods,limit=2,services,interval=1m").unwrap();
    let again = PolicySpec::parse(&spec.to_string()).unwrap();
    assert_eq!(spec, again);
}

#[test]
fn test_empty_input_fails() {
    assert!(matches!(PolicySpec::parse(""), Err(ChurnError::Parse(_))));
    assert!(matches!("".parse::<PolicySpec>(), Err(ChurnError::Parse(_))));
}

#[test]
fn test_operation_only() {
    let spec: PolicySpec = "delete".parse().unwrap();
    assert_eq!(spec.operation, "delete");
    assert!(spec.resource_names.is_empty());
    assert!(spec.parameters.is_empty());
}

#[test]
fn test_empty_value_is_still_a_parameter() {
    let spec = PolicySpec::parse("delete:limit=").unwrap();
    assert_eq!(spec.parameters["limit"], "");
    assert!(spec.resource_names.is_empty());
}

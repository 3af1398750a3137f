//! Tests for error types

use churn::core::ChurnError;

#[test]
fn test_parse_error() {
    let err = ChurnError::Parse("empty policy specification".to_string());
    assert_eq!(format!("{}", err), "parse error: empty policy specification");
}

#[test]
fn test_resolution_error() {
    let err = ChurnError::Resolution("unknown resource: widgets".to_string());
    assert_eq!(format!("{}", err), "resolution error: unknown resource: widgets");
}

#[test]
fn test_config_error() {
    let err = ChurnError::Config("invalid parameter name: foo".to_string());
    assert_eq!(format!("{}", err), "config error: invalid parameter name: foo");
}

#[test]
fn test_runtime_error() {
    let err = ChurnError::Runtime("connection refused".to_string());
    assert_eq!(format!("{}", err), "runtime error: connection refused");
    assert!(!err.is_startup());
}

#[test]
fn test_converts_into_anyhow() {
    let err: anyhow::Error = ChurnError::Config("bad".to_string()).into();
    assert!(err.downcast_ref::<ChurnError>().is_some());
}
